//! Integration tests for the StyleKit inspector
//!
//! - `identity`: paths, resolution, refresh after tree changes
//! - `editing`: style edits, history, selection behavior
//! - `persistence`: export, import and saved sessions

mod editing;
mod identity;
mod persistence;
