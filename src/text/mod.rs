pub mod matching;
pub mod normalize;
pub mod relevance;
pub mod similarity;
