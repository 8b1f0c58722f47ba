//! HTTP boundary for the authorization engine: login, credential
//! verification and per-route permission guards.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
