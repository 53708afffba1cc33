/// Core Server Framework Module
///
/// - registry.rs: tool registry, descriptors and the `tool!` macro
/// - protocol.rs: MCP JSON-RPC dispatcher
/// - server.rs: HTTP and STDIO transports
/// - config.rs: environment configuration
/// - logging.rs: tracing setup
/// - error.rs: error types

pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod registry;
pub mod server;
