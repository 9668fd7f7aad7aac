pub mod action_graph;
pub mod actions;
pub mod auth;
pub mod navigator;
pub mod state;
pub mod verify;

pub use action_graph::ActionGraph;
pub use auth::{AuthPlan, AuthType, plan_auth};
pub use navigator::{Navigator, RunLimits, RunReport};
pub use state::{NavigationState, PageFacts, StateTracker};
pub use verify::{FileVerifier, NoVerifier, Verifier};
