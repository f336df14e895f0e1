//! Ticket records as returned by the vector index.
//!
//! Index payloads come in two shapes: flat (`key`, `title`, `description`,
//! ... at the top level) and LangChain-style (`page_content` holding
//! `"Title: ...\n\nDescription: ..."` plus a `metadata` object). Both project
//! onto the same `Ticket`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Index point identifier: an unsigned integer or a UUID string.
///
/// Integers order numerically and sort before strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{n}"),
            PointId::Uuid(s) => f.write_str(s),
        }
    }
}

impl From<u64> for PointId {
    fn from(value: u64) -> Self {
        PointId::Num(value)
    }
}

impl From<&str> for PointId {
    fn from(value: &str) -> Self {
        PointId::Uuid(value.to_string())
    }
}

/// Raw search hit: id, similarity score and stored payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payload: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Read-only projection of an indexed issue-tracker ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Index point id
    pub id: PointId,

    /// Similarity score, higher is more relevant
    pub score: f32,

    /// Tracker key (e.g. "HBASE-001")
    pub key: String,

    pub title: String,

    pub description: String,

    pub project: String,

    pub priority: String,

    /// Issue type (Bug, Task, ...)
    #[serde(rename = "type")]
    pub issue_type: String,

    /// Original payload, kept for the raw-payload endpoints
    #[serde(skip)]
    pub payload: Map<String, Value>,
}

impl Ticket {
    /// Project a search hit onto a ticket. Missing fields become empty strings.
    pub fn from_point(point: ScoredPoint) -> Self {
        let payload = point.payload;
        let (content_title, content_description) = payload
            .get("page_content")
            .and_then(Value::as_str)
            .map(split_page_content)
            .unwrap_or_default();

        let title = field(&payload, "title")
            .filter(|t| !t.is_empty())
            .unwrap_or(content_title);
        let description = field(&payload, "description")
            .filter(|d| !d.is_empty())
            .unwrap_or(content_description);

        Self {
            id: point.id,
            score: point.score.clamp(0.0, 1.0),
            key: field(&payload, "key").unwrap_or_default(),
            title,
            description,
            project: field(&payload, "project").unwrap_or_default(),
            priority: field(&payload, "priority").unwrap_or_default(),
            issue_type: field(&payload, "type").unwrap_or_default(),
            payload,
        }
    }

    /// Ranking order: descending score, ties by ascending id.
    pub fn rank_cmp(&self, other: &Ticket) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Look a field up at the top level, then under `metadata`.
fn field(payload: &Map<String, Value>, name: &str) -> Option<String> {
    payload
        .get(name)
        .or_else(|| payload.get("metadata").and_then(|m| m.get(name)))
        .and_then(scalar_to_string)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Split `"Title: ...\n\nDescription: ..."` into its two parts.
fn split_page_content(content: &str) -> (String, String) {
    let content = content.trim();
    let (head, tail) = match content.find("Description:") {
        Some(idx) => (&content[..idx], &content[idx + "Description:".len()..]),
        None => (content, ""),
    };
    let title = head.trim().strip_prefix("Title:").unwrap_or(head).trim();
    (title.to_string(), tail.trim().to_string())
}
