pub mod keywords;
pub mod thresholds;
