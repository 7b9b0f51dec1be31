//! Request handlers.
//!
//! Handlers delegate to the shared [`TaskStore`](imgflow_store::TaskStore)
//! and map errors via [`AppError`](crate::error::AppError).

pub mod actions;
