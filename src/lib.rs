//! LinkVault - A URL shortener with anonymous sessions
//!
//! This library provides the core functionality for the LinkVault service:
//! a storage contract with three backends, JWT-based anonymous identity,
//! and the HTTP/RPC adapters built on top of them.
//!
//! # Architecture
//! - `storage`: Storage contract, batch reconciliation and backends
//! - `auth`: Anonymous identity (JWT issue/verify, sign-in, auth-only)
//! - `services`: Link business logic shared by the transports
//! - `api`: HTTP services, identity middleware and the RPC interceptor
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
