pub mod relevance;
pub mod vocab;
