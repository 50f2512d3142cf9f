//! HTTP handlers for the shell probes and entity reads.

pub mod common;
pub mod entity;
pub use common::*;
pub use entity::*;
