//! Image transformation worker library.
//!
//! One worker serves one transformation family. Exposes the building blocks
//! so integration tests and the binary entrypoint can both access them.

pub mod callback;
pub mod config;
pub mod error;
pub mod handlers;
pub mod processor;
pub mod router;
pub mod routes;
pub mod state;
