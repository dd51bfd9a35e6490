//! TCP listener and connection supervision

pub mod config;
pub mod listener;


pub use config::ServerConfig;
pub use listener::HttpServer;
