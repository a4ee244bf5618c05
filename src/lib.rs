pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::config::{local_storage::LocalStorage, toml_config::TomlConfig};
pub use crate::core::{
    etl::EtlEngine,
    join::join,
    pipeline::JoinPipeline,
    render::{render, Container, NodeKind, VisualNode},
};
pub use crate::domain::model::{Annotation, ChildRecord, NestedEntity, ParentRecord};
pub use crate::utils::error::{EtlError, Result};
