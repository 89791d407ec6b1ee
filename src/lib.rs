//! Framelinker - analytics proxy for Farcaster frames
//!
//! Frame authors register a frame URL and get an alias link back. Clients
//! load the frame through the proxy, every button action is relayed to the
//! origin, and each validated click is reported to the author's PostHog
//! project in the background.
//!
//! # Architecture
//! - `frame`: card model, HTML codec and action payloads
//! - `storage`: KV store, session store and migrations
//! - `clients`: origin, hub and PostHog HTTP clients
//! - `services`: alias registry, link rewriting, action proxy, tracking
//! - `api`: HTTP handlers and middleware
//! - `config`: configuration management
//! - `runtime`: application lifecycle and execution modes
//! - `system`: logging

pub mod api;
pub mod clients;
pub mod config;
pub mod errors;
pub mod frame;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
