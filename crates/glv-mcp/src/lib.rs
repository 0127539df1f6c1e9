//! GLV MCP server — image reading, vision Q&A, and document extraction tools for agents.

pub mod config;
pub mod protocol;
pub mod repl;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::{ConfigOverrides, ServerContext};
pub use protocol::ProtocolHandler;
pub use transport::StdioTransport;
