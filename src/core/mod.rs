pub mod etl;
pub mod join;
pub mod pipeline;
pub mod render;

pub use crate::domain::model::{Dataset, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
