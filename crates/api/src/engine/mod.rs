//! Task execution engine.
//!
//! Contains the background dispatcher that polls the task store for
//! undispatched work and hands it to the owning worker service.

pub mod dispatcher;
