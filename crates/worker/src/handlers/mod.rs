//! Request handlers.

pub mod actions;
