use crate::core::Pipeline;
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting ETL process...");

        // Extract
        let dataset = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} parents and {} children",
            dataset.parents.len(),
            dataset.children.len()
        );

        // Transform
        let result = self.pipeline.transform(dataset).await?;
        tracing::info!(
            "Joined {} entities ({} annotations, {} orphans dropped)",
            result.entities.len(),
            result.stats.matched,
            result.stats.orphans
        );

        // Load
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }
}
