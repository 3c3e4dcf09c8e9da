pub mod api;
pub mod config;
pub mod constants;

pub use api::*;
pub use config::*;
