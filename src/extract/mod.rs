pub mod buttons;
pub mod classify;
pub mod context;
pub mod fields;
pub mod labels;
pub mod links;
pub mod page_model;
pub mod parser;
