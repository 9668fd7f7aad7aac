pub mod dates;
pub mod decision;
pub mod engine;
pub mod interact;
pub mod lists;
pub mod multiselect;
pub mod question;
pub mod ranking;
pub mod resolver;
pub mod rules;
pub mod text_rules;
pub mod upload;

pub use decision::{ClickOutcome, Decision, FieldOutcome, Prompt};
pub use engine::AnswerEngine;
pub use interact::Interactor;
pub use resolver::FieldResolver;
