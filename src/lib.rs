pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::storage::LocalStorage;
pub use crate::config::{toml_config::TomlConfig, CliConfig};
pub use crate::core::{
    collector::ApiCollector,
    etl::{reproject, run_collection, EtlEngine},
    projection::Projector,
};
pub use crate::utils::error::{CollectorError, Result};
