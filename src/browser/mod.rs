pub mod browser;
pub mod session;
pub mod snapshot;
pub mod stability;

pub use browser::{Browser, ElementState};
pub use session::{BrowserSession, SessionOptions};
pub use snapshot::{BrowserAction, Reaction, SnapshotBrowser};
pub use stability::StabilityOpts;
