// Foreign binary inputs: datasets and word lists saved by other tools.

pub mod dta;
pub mod pickle;
