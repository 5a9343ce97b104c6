//! # Taskboard API Server Library
//!
//! This library provides the HTTP and WebSocket surface of the Taskboard
//! project-management server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Bearer authentication and security headers
//! - `routes`: REST route handlers
//! - `ws`: WebSocket connections, rooms and heartbeat
//! - `relay`: Redis pub/sub fan-out between server processes

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod relay;
pub mod routes;
pub mod ws;
