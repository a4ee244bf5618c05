pub mod local_storage;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;

#[cfg(feature = "cli")]
mod cli_config {
    use crate::core::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{
        validate_formats, validate_non_empty_string, validate_path, validate_source, Validate,
    };
    use clap::Parser;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    const DEFAULT_FOREIGN_KEY: &str = "parentId";

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "nest-etl")]
    #[command(about = "Join parent and child records into a nested list and render it")]
    pub struct CliConfig {
        /// Parent records: http(s) URL, .json or .csv file
        #[arg(long)]
        pub parents: String,

        /// Child records: http(s) URL, .json or .csv file
        #[arg(long)]
        pub children: String,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        /// Output formats: html, json, tree
        #[arg(long, value_delimiter = ',', default_value = "html")]
        pub formats: Vec<String>,

        /// Base name for output files
        #[arg(long, default_value = "nested")]
        pub name: String,

        /// Field on child records that holds the parent id
        #[arg(long, default_value = DEFAULT_FOREIGN_KEY)]
        pub foreign_key: String,

        /// Write all outputs into a single zip archive
        #[arg(long)]
        pub bundle: bool,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON")]
        pub json_logs: bool,

        #[arg(skip)]
        #[serde(skip)]
        bundle_filename: Option<String>,
    }

    impl CliConfig {
        /// Resolves derived settings after parsing.
        pub fn finalize(mut self) -> Self {
            self.bundle_filename = self.bundle.then(|| format!("{}.zip", self.name));
            self
        }
    }

    impl ConfigProvider for CliConfig {
        fn parents_source(&self) -> &str {
            &self.parents
        }

        fn children_source(&self) -> &str {
            &self.children
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn output_formats(&self) -> &[String] {
            &self.formats
        }

        fn output_stem(&self) -> &str {
            &self.name
        }

        fn child_field_mapping(&self) -> HashMap<String, String> {
            let mut mapping = HashMap::new();
            if self.foreign_key != DEFAULT_FOREIGN_KEY {
                mapping.insert(self.foreign_key.clone(), DEFAULT_FOREIGN_KEY.to_string());
            }
            mapping
        }

        fn bundle_filename(&self) -> Option<&str> {
            self.bundle_filename.as_deref()
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_source("parents", &self.parents)?;
            validate_source("children", &self.children)?;
            validate_path("output_path", &self.output_path)?;
            validate_formats("formats", &self.formats)?;
            validate_non_empty_string("name", &self.name)?;
            validate_non_empty_string("foreign_key", &self.foreign_key)
        }
    }

}
