// Corpus pipelines: commands that walk a whole transcript directory.

pub mod exposure;
pub mod sentiment;
