pub mod api;
pub mod browser;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod providers;
pub mod resolver;
pub mod utils;
