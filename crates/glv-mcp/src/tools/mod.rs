//! MCP tool implementations.

pub mod process_file;
pub mod read_image;
pub mod registry;
pub mod vision_query;

pub use registry::ToolRegistry;
