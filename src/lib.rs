// callscore: offline lexicon scoring and metadata tooling for earnings-call
// transcripts.
//
// This is the library root. Each module corresponds to one transformation
// step of the research workflow; they share nothing but the sheet types and
// hand data to each other through files.

pub mod config;
pub mod exposure;
pub mod formats;
pub mod lexicon;
pub mod metadata;
pub mod names;
pub mod output;
pub mod pipeline;
pub mod sector;
pub mod sentiment;
pub mod sheet;
pub mod status;
pub mod text;
