//! Beacon - Static File Server
//!
//! Core library: request handling, file serving and connection dispatch.

pub mod config;
pub mod http;
pub mod server;
