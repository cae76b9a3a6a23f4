//! Test support utilities for inspector integration tests
//!
//! - TestPage: a session over a fixture document with named nodes
//! - Assertions: custom test assertions

mod assertions;
mod test_page;

pub use assertions::*;
pub use test_page::{init_tracing, TestPage};
