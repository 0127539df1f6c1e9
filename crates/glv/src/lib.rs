//! GLV: image loading and normalization plus remote vision and file-extraction adapters.

pub mod config;
pub mod files;
pub mod loader;
pub mod normalize;
pub mod read;
pub mod types;
pub mod vision;

pub use config::ApiConfig;
pub use files::{check_file, FileClient};
pub use loader::ImageLoader;
pub use normalize::normalize;
pub use types::*;
pub use vision::VisionClient;
