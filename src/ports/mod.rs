//! Port traits defining external boundaries.
//!
//! The player depends on a mock server it does not implement; the
//! capability it needs is described here.

pub mod mock_server;

pub use mock_server::{Matcher, MockServer, Rule};
