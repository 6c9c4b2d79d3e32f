// MCP (Model Context Protocol) server for license checks.
// Transport-independent dispatch lives in `server`; `stdio` and the
// HTTP crate are thin framings around it.

pub mod protocol;
pub mod server;
pub mod stdio;
pub mod tools;

pub use server::McpServer;
