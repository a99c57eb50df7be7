//! HTTP API layer: server, shared state, wire types and the SSE log stream.

pub mod logs;
pub mod server;
pub mod state;
pub mod types;

pub use server::start_server;
