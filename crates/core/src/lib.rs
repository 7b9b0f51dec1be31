//! Domain types shared by the orchestrator and the worker services.
//!
//! Has no dependency on any other workspace crate.

pub mod envelope;
pub mod error;
pub mod image;
pub mod task;
pub mod types;
