pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod http_server;
pub mod models;
pub mod schema;

pub use config::Config;
pub use database::DatabaseManager;
pub use error::Error;
pub use http_server::HttpServer;
