pub mod cache;
pub mod cli;
pub mod engine;
pub mod error;
pub mod github;
pub mod models;
pub mod pool;
pub mod server;
pub mod service;
pub mod types;
