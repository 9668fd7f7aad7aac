pub mod document;
pub mod xpath;

pub use document::{Document, NodeId};
