use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_formats, validate_non_empty_string, validate_non_zero_seconds, validate_path,
    validate_positive_number, validate_source, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    pub extract: Option<ExtractConfig>,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub parents: String,
    pub children: String,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub parent_field_mapping: Option<HashMap<String, String>>,
    pub child_field_mapping: Option<HashMap<String, String>>,
    pub max_parents: Option<usize>,
    pub max_children: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub filename: Option<String>,
    pub bundle: Option<BundleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    pub enabled: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex")
    })
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_TOKEN})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    fn extract(&self) -> ExtractConfig {
        self.extract.clone().unwrap_or_default()
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validate_source("source.parents", &self.source.parents)?;
        validate_source("source.children", &self.source.children)?;
        validate_path("load.output_path", &self.load.output_path)?;
        validate_formats("load.output_formats", &self.load.output_formats)?;

        if let Some(timeout) = self.source.timeout_seconds {
            validate_non_zero_seconds("source.timeout_seconds", timeout)?;
        }

        let extract = self.extract();
        if let Some(max) = extract.max_parents {
            validate_positive_number("extract.max_parents", max, 1)?;
        }
        if let Some(max) = extract.max_children {
            validate_positive_number("extract.max_children", max, 1)?;
        }

        if let Some(bundle) = &self.load.bundle {
            if bundle.enabled && !bundle.filename.ends_with(".zip") {
                return Err(EtlError::InvalidConfigValueError {
                    field: "load.bundle.filename".to_string(),
                    value: bundle.filename.clone(),
                    reason: "Bundle filename must end with .zip".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn parents_source(&self) -> &str {
        &self.source.parents
    }

    fn children_source(&self) -> &str {
        &self.source.children
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn output_stem(&self) -> &str {
        self.load.filename.as_deref().unwrap_or("nested")
    }

    fn parent_field_mapping(&self) -> HashMap<String, String> {
        self.extract().parent_field_mapping.unwrap_or_default()
    }

    fn child_field_mapping(&self) -> HashMap<String, String> {
        self.extract().child_field_mapping.unwrap_or_default()
    }

    fn max_parents(&self) -> Option<usize> {
        self.extract.as_ref().and_then(|e| e.max_parents)
    }

    fn max_children(&self) -> Option<usize> {
        self.extract.as_ref().and_then(|e| e.max_children)
    }

    fn request_headers(&self) -> HashMap<String, String> {
        self.source.headers.clone().unwrap_or_default()
    }

    fn timeout_seconds(&self) -> Option<u64> {
        self.source.timeout_seconds
    }

    fn bundle_filename(&self) -> Option<&str> {
        self.load
            .bundle
            .as_ref()
            .filter(|b| b.enabled)
            .map(|b| b.filename.as_str())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
