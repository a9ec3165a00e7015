//! Data Transfer Objects - For API boundaries
//!
//! Quest files and client action payloads are decoded here so handlers work
//! with typed values only.

pub mod actions;
pub mod quest_definition;

pub use actions::*;
pub use quest_definition::*;
