use crate::domain::model::{Dataset, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn parents_source(&self) -> &str;
    fn children_source(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];

    /// Base file name for outputs, without extension.
    fn output_stem(&self) -> &str {
        "nested"
    }

    /// Source field name -> record field name, applied before typed parsing.
    fn parent_field_mapping(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    fn child_field_mapping(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    fn max_parents(&self) -> Option<usize> {
        None
    }

    fn max_children(&self) -> Option<usize> {
        None
    }

    fn request_headers(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    fn timeout_seconds(&self) -> Option<u64> {
        None
    }

    /// Zip file name when outputs are bundled; `None` writes loose files.
    fn bundle_filename(&self) -> Option<&str> {
        None
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Dataset>;
    async fn transform(&self, data: Dataset) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
