pub mod mock;
pub mod ollama;
pub mod oracle;

pub use mock::MockOracle;
pub use ollama::OllamaOracle;
pub use oracle::Oracle;
