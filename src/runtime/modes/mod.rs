//! Mode routing
//!
//! - Server mode (HTTP server, the default)
//! - CLI mode (one-shot commands such as `register`)

pub mod cli;
pub mod server;

pub use cli::{run_config_generate, run_register};
pub use server::run_server;
