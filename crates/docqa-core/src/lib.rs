#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod text;
pub mod traits;
pub mod types;

pub use chunker::Chunker;
pub use config::{Config, Settings};
pub use error::{Error, Result};
pub use loader::TextLoader;
