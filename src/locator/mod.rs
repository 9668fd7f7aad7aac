pub mod locator_model;
pub mod revalidate;
pub mod strategy;
pub mod synthesize;
