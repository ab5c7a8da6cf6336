// Pipeline processing: normalization, merging, link synthesis and scoring

pub mod normalize;
pub mod merge;
pub mod enrich;
pub mod score;
