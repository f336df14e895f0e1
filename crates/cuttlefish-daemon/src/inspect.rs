//! Read-only look at the Qdrant collection behind the service.
//!
//! Prints the collection summary, a sample of stored points and an inventory
//! of the payload fields they carry, so a mis-ingested corpus (no title or
//! description, unexpected nesting) shows up before the service serves it.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::info;

use cuttlefish_providers::{CollectionInfo, QdrantConfig, QdrantIndex, StoredPoint};
use cuttlefish_types::{ScoredPoint, Settings, Ticket};

/// Payload fields the ticket projection can draw content from.
pub const CONTENT_FIELDS: [&str; 5] = ["content", "title", "description", "page_content", "text"];

const PREVIEW_CHARS: usize = 100;

/// Layout of a stored payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PayloadShape {
    /// Ticket fields at the top level
    Flat,
    /// `page_content` text plus a `metadata` object
    PageContent,
    /// Null or empty payload
    Empty,
}

impl PayloadShape {
    pub fn of(payload: Option<&Map<String, Value>>) -> Self {
        match payload {
            None => PayloadShape::Empty,
            Some(p) if p.is_empty() => PayloadShape::Empty,
            Some(p) if p.contains_key("page_content") => PayloadShape::PageContent,
            Some(_) => PayloadShape::Flat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadShape::Flat => "flat",
            PayloadShape::PageContent => "page_content",
            PayloadShape::Empty => "empty",
        }
    }
}

/// Payload fields seen across a sample of points.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FieldInventory {
    /// Field path (`metadata.key` for nested fields) -> points carrying it
    pub fields: BTreeMap<String, usize>,

    /// Points per payload shape
    pub shapes: BTreeMap<PayloadShape, usize>,

    pub points: usize,
}

impl FieldInventory {
    pub fn from_points(points: &[StoredPoint]) -> Self {
        let mut inventory = Self {
            points: points.len(),
            ..Default::default()
        };

        for point in points {
            let payload = point.payload.as_ref();
            *inventory.shapes.entry(PayloadShape::of(payload)).or_default() += 1;

            let Some(payload) = payload else {
                continue;
            };
            for (key, value) in payload {
                *inventory.fields.entry(key.clone()).or_default() += 1;
                if let Some(nested) = value.as_object() {
                    for inner in nested.keys() {
                        *inventory.fields.entry(format!("{key}.{inner}")).or_default() += 1;
                    }
                }
            }
        }
        inventory
    }

    /// Content fields present at the top level or under `metadata`.
    pub fn content_fields(&self) -> Vec<&'static str> {
        CONTENT_FIELDS
            .into_iter()
            .filter(|f| {
                self.fields.contains_key(*f) || self.fields.contains_key(&format!("metadata.{f}"))
            })
            .collect()
    }
}

/// Everything `inspect` gathered.
#[derive(Debug, Clone)]
pub struct InspectReport {
    pub collection: CollectionInfo,
    pub points: Vec<StoredPoint>,
    pub inventory: FieldInventory,
}

fn preview(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text
    }
}

/// Gather and print the collection summary, sampled points and inventory.
pub async fn inspect(index: &QdrantIndex, limit: usize) -> Result<InspectReport> {
    let collection = index
        .collection_info()
        .await
        .with_context(|| format!("Failed to read collection {}", index.collection()))?;

    println!("Collection: {}", collection.name);
    println!("  Status:          {}", collection.status);
    match collection.points_count {
        Some(count) => println!("  Points:          {count}"),
        None => println!("  Points:          unknown"),
    }
    match (collection.vector_size, &collection.distance) {
        (Some(size), Some(distance)) => println!("  Vectors:         {size} dims, {distance}"),
        (Some(size), None) => println!("  Vectors:         {size} dims"),
        _ => println!("  Vectors:         named or unknown"),
    }

    let points = index
        .sample_points(limit)
        .await
        .context("Failed to sample points")?;
    info!(sampled = points.len(), limit, "Sampled collection");

    println!();
    println!("Sampled {} point(s)", points.len());
    for (i, point) in points.iter().enumerate() {
        let payload = point.payload.clone().unwrap_or_default();
        let shape = PayloadShape::of(point.payload.as_ref());
        println!();
        println!("Point {} (id {}, {} payload)", i + 1, point.id, shape.as_str());
        for (key, value) in &payload {
            println!("    {key}: {}", preview(value));
        }

        let ticket = Ticket::from_point(ScoredPoint {
            id: point.id.clone(),
            score: 0.0,
            payload,
        });
        println!(
            "  Projects to: key={:?} title={:?} project={:?}",
            ticket.key, ticket.title, ticket.project
        );
    }

    let inventory = FieldInventory::from_points(&points);
    println!();
    println!("Payload fields ({} unique)", inventory.fields.len());
    for (field, count) in &inventory.fields {
        println!("    {field}: {count}/{}", inventory.points);
    }
    for (shape, count) in &inventory.shapes {
        println!("  {} payloads: {count}", shape.as_str());
    }

    let content = inventory.content_fields();
    if content.is_empty() && inventory.points > 0 {
        println!("  No content fields found; tickets will project with empty title and description");
    } else {
        println!("  Content fields: {}", content.join(", "));
    }

    Ok(InspectReport {
        collection,
        points,
        inventory,
    })
}

/// Load configuration and inspect the configured collection.
pub async fn run_inspect(config_path: Option<&str>, limit: usize) -> Result<()> {
    let settings = Settings::load(config_path).context("Failed to load configuration")?;
    let index = QdrantIndex::new(QdrantConfig::from_settings(&settings))
        .context("Failed to create Qdrant client")?;
    inspect(&index, limit.max(1)).await.map(|_| ())
}
