//! MCP data types used by the server.

pub mod capabilities;
pub mod error;
pub mod message;
pub mod tool;

pub use capabilities::*;
pub use error::*;
pub use message::*;
pub use tool::*;
