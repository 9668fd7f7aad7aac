pub mod browser;
pub mod cli;
pub mod config;
pub mod diff;
pub mod dom;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod locator;
pub mod navigation;
pub mod oracle;
pub mod profile;
pub mod resolve;
pub mod text;
pub mod trace;

pub use error::{FormError, FormResult};
