use serde::{Deserialize, Serialize};

use crate::core::render::VisualNode;

/// Flat parent row as supplied by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRecord {
    pub id: i64,
    pub title: String,
}

/// Flat child row; `parent_id` points at `ParentRecord::id` and may dangle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRecord {
    #[serde(rename = "parentId")]
    pub parent_id: i64,
    pub author: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub author: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedEntity {
    pub id: i64,
    pub title: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub parents: Vec<ParentRecord>,
    pub children: Vec<ChildRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    pub parents: usize,
    pub children: usize,
    pub matched: usize,
    pub orphans: usize,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub entities: Vec<NestedEntity>,
    pub document: VisualNode,
    pub html_output: String,
    pub tree_output: String,
    pub stats: JoinStats,
}
