//! Request authorization and routing core.
//!
//! ## Module Organization
//!
//! - `auth`: access rules, principals, credential verification and authorization
//! - `cors`: cross-origin policy and header negotiation
//! - `engine`: protocol engine seam, lock namespaces and the per-principal multiplexer
//! - `gate`: the materialized configuration and the shared request gate

pub mod auth;
pub mod cors;
pub mod engine;
pub mod error;
pub mod gate;
