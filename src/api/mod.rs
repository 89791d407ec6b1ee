//! HTTP surface
//!
//! - `POST /register`: create a root alias for a frame URL
//! - `GET|POST /a`: the proxy itself (also `/a/`)
//! - `GET /health`: store checks and tracking counters

pub mod middleware;
pub mod services;
