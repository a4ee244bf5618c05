use crate::core::join::join_with_stats;
use crate::core::render::{render, VisualNode};
use crate::core::{ConfigProvider, Dataset, Pipeline, Storage, TransformResult};
use crate::domain::model::{ChildRecord, ParentRecord};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::is_remote_source;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

const PARENT_INTEGER_FIELDS: [&str; 1] = ["id"];
const CHILD_INTEGER_FIELDS: [&str; 1] = ["parentId"];

/// Reads parent and child sources, nests them, and writes the rendered tree.
pub struct JoinPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> JoinPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            client: Client::new(),
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    async fn fetch_remote(&self, source_name: &str, url: &str) -> Result<Value> {
        let mut request = self.client.get(url);

        for (key, value) in self.config.request_headers() {
            request = request.header(key, value);
        }

        if let Some(timeout) = self.config.timeout_seconds() {
            request = request.timeout(std::time::Duration::from_secs(timeout));
        }

        tracing::debug!("Making API request to: {}", url);
        let response = request.send().await?;
        tracing::debug!("API response status: {}", response.status());

        if !response.status().is_success() {
            return Err(EtlError::SourceError {
                source_name: source_name.to_string(),
                message: format!("{} returned HTTP {}", url, response.status()),
            });
        }

        Ok(response.json().await?)
    }

    async fn read_local(&self, source_name: &str, path: &str) -> Result<Vec<Value>> {
        let bytes = self.storage.read_file(path).await?;
        tracing::debug!("Read {} bytes from {}", bytes.len(), path);

        if path.ends_with(".csv") {
            return csv_rows(&bytes);
        }

        let json: Value = serde_json::from_slice(&bytes)?;
        json_rows(source_name, json)
    }

    async fn load_rows(&self, source_name: &str, source: &str) -> Result<Vec<Value>> {
        if is_remote_source(source) {
            let json = self.fetch_remote(source_name, source).await?;
            json_rows(source_name, json)
        } else {
            self.read_local(source_name, source).await
        }
    }
}

/// 將 JSON 回應攤平成物件列表，單一物件視為只有一筆
fn json_rows(source_name: &str, json: Value) -> Result<Vec<Value>> {
    match json {
        Value::Array(items) => Ok(items),
        obj @ Value::Object(_) => Ok(vec![obj]),
        other => Err(EtlError::SourceError {
            source_name: source_name.to_string(),
            message: format!("expected a JSON array of objects, got {}", kind_name(&other)),
        }),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn csv_rows(bytes: &[u8]) -> Result<Vec<Value>> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let obj: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect();
        rows.push(Value::Object(obj));
    }
    Ok(rows)
}

fn coerce_scalar(key: &str, value: Value, integer_fields: &[&str]) -> Value {
    if integer_fields.contains(&key) {
        match value {
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or(Value::String(s)),
            other => other,
        }
    } else {
        match value {
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            other => other,
        }
    }
}

/// Renames source fields and coerces scalars so the row fits the typed record:
/// integer fields accept numeric strings, every other scalar becomes text.
/// A mapped field replaces any field already carrying the target name.
fn normalize_row(
    row: Value,
    mapping: &HashMap<String, String>,
    integer_fields: &[&str],
) -> Value {
    let obj = match row {
        Value::Object(obj) => obj,
        other => return other,
    };

    let mut normalized = Map::with_capacity(obj.len());
    let mut renamed = Vec::new();
    for (key, value) in obj {
        match mapping.get(&key) {
            Some(target) => renamed.push((target.clone(), value)),
            None => {
                let value = coerce_scalar(&key, value, integer_fields);
                normalized.insert(key, value);
            }
        }
    }

    for (key, value) in renamed {
        let value = coerce_scalar(&key, value, integer_fields);
        normalized.insert(key, value);
    }
    Value::Object(normalized)
}

fn parse_records<T: DeserializeOwned>(
    source_name: &str,
    rows: Vec<Value>,
    mapping: &HashMap<String, String>,
    integer_fields: &[&str],
    limit: Option<usize>,
) -> Result<Vec<T>> {
    let limit = limit.unwrap_or(usize::MAX);

    rows.into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, row)| {
            serde_json::from_value(normalize_row(row, mapping, integer_fields)).map_err(|e| {
                EtlError::SourceError {
                    source_name: source_name.to_string(),
                    message: format!("record {}: {}", index, e),
                }
            })
        })
        .collect()
}

fn html_page(fragment: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Nested view</title></head>\n<body>\n<div id=\"root\">{}</div>\n</body>\n</html>\n",
        fragment
    )
}

fn output_file_path(output_path: &str, filename: &str) -> String {
    format!("{}/{}", output_path.trim_end_matches('/'), filename)
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for JoinPipeline<S, C> {
    async fn extract(&self) -> Result<Dataset> {
        tracing::info!(
            "Extracting parents from {} and children from {}",
            self.config.parents_source(),
            self.config.children_source()
        );

        let parent_rows = self.load_rows("parents", self.config.parents_source()).await?;
        let parents: Vec<ParentRecord> = parse_records(
            "parents",
            parent_rows,
            &self.config.parent_field_mapping(),
            &PARENT_INTEGER_FIELDS,
            self.config.max_parents(),
        )?;

        let child_rows = self.load_rows("children", self.config.children_source()).await?;
        let children: Vec<ChildRecord> = parse_records(
            "children",
            child_rows,
            &self.config.child_field_mapping(),
            &CHILD_INTEGER_FIELDS,
            self.config.max_children(),
        )?;

        tracing::debug!(
            "Extracted {} parents and {} children",
            parents.len(),
            children.len()
        );

        Ok(Dataset { parents, children })
    }

    async fn transform(&self, data: Dataset) -> Result<TransformResult> {
        let (entities, stats) = join_with_stats(&data.parents, &data.children);

        if stats.orphans > 0 {
            tracing::warn!(
                "Dropped {} child records with no matching parent",
                stats.orphans
            );
        }

        let mut document = VisualNode::document();
        render(&mut document, &entities);

        let html_output = document.to_html();
        let tree_output = document.to_tree().to_string();

        Ok(TransformResult {
            entities,
            document,
            html_output,
            tree_output,
            stats,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let stem = self.config.output_stem();
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();
        let mut seen = HashSet::new();

        for format in self.config.output_formats() {
            // 重複的格式只輸出一次
            if !seen.insert(format.as_str()) {
                continue;
            }

            match format.as_str() {
                "html" => files.push((
                    format!("{}.html", stem),
                    html_page(&result.html_output).into_bytes(),
                )),
                "json" => {
                    let summary = serde_json::json!({
                        "generated_at": chrono::Utc::now().to_rfc3339(),
                        "stats": result.stats,
                        "entities": result.entities,
                    });
                    files.push((
                        format!("{}.json", stem),
                        serde_json::to_string_pretty(&summary)?.into_bytes(),
                    ));
                }
                "tree" => files.push((format!("{}.txt", stem), result.tree_output.clone().into_bytes())),
                other => {
                    return Err(EtlError::InvalidConfigValueError {
                        field: "output_formats".to_string(),
                        value: other.to_string(),
                        reason: "Unsupported format".to_string(),
                    })
                }
            }
        }

        if files.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "output_formats".to_string(),
            });
        }

        let output_path = self.config.output_path();

        if let Some(bundle) = self.config.bundle_filename() {
            tracing::debug!("Creating ZIP file with {} files", files.len());

            // 建立 ZIP 並取回底層 Vec<u8>
            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, data) in &files {
                    zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
                    zip.write_all(data)?;
                }
                zip.finish()?.into_inner()
            };

            let bundle_path = output_file_path(output_path, bundle);
            tracing::debug!("Writing ZIP file ({} bytes) to {}", zip_data.len(), bundle_path);
            self.storage.write_file(&bundle_path, &zip_data).await?;
            return Ok(bundle_path);
        }

        let mut written = Vec::with_capacity(files.len());
        for (name, data) in &files {
            let path = output_file_path(output_path, name);
            self.storage.write_file(&path, data).await?;
            tracing::debug!("Wrote {} ({} bytes)", path, data.len());
            written.push(path);
        }

        // 第一個格式視為主要輸出
        Ok(written.swap_remove(0))
    }
}
