pub mod catalog;
pub mod config;
pub mod database;
pub mod dataset_schema;
pub mod domain;
pub mod error;
pub mod http_server;
pub mod integration;
pub mod metadata_tracker;
pub mod models;
pub mod permissions;
pub mod registry;
pub mod schema;
pub mod storage;

pub use error::RegistryError;
pub use http_server::HttpServer;
pub use permissions::Actor;
pub use registry::DatasetRegistry;
