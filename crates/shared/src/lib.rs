pub mod analyzer;
pub mod config;
mod config_env;
pub mod export;
pub mod flows;
pub mod markdown;
pub mod models;
pub mod request_state;
pub mod session;
