//! HTTP surface: the middleware chain, the dispatcher and the local filesystem engine.

pub mod app;
pub mod engine;
pub mod error;
pub mod gate;
pub mod middleware;
