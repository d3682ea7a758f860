/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Element envelope for timestamped graph data.
//!
//! Core structures:
//! - [`GraphElement`]: tagged node/edge variant matching the upstream record
//!   shape `{ id, type, sourceId?, targetId?, timestamp?, properties }`
//! - [`TimeMs`]: epoch-millisecond timestamp with saturating arithmetic
//! - [`PropValue`]: closed value variant for schema-less property bags
//!
//! Upstream data arrives as loosely-shaped JSON; [`parse_elements`] is the
//! boundary that turns it into typed records, dropping what does not fit.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;
use serde::{Deserialize, Serialize};

/// Element identity as assigned by the upstream data source.
pub type ElementId = String;

/// Epoch-millisecond timestamp.
///
/// All window and bounds arithmetic saturates instead of wrapping so hostile
/// upstream values cannot panic the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimeMs(pub u64);

impl TimeMs {
    pub const ZERO: TimeMs = TimeMs(0);

    /// Current wall-clock time in epoch milliseconds.
    pub fn now() -> Self {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        TimeMs(ms)
    }

    pub fn saturating_add(self, ms: u64) -> Self {
        TimeMs(self.0.saturating_add(ms))
    }

    pub fn saturating_sub(self, ms: u64) -> Self {
        TimeMs(self.0.saturating_sub(ms))
    }

    /// Signed shift, saturating at both ends of the u64 range.
    pub fn offset(self, delta_ms: i64) -> Self {
        if delta_ms >= 0 {
            self.saturating_add(delta_ms as u64)
        } else {
            self.saturating_sub(delta_ms.unsigned_abs())
        }
    }

    /// Milliseconds from `earlier` to `self`, zero when `earlier` is later.
    pub fn since(self, earlier: TimeMs) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::fmt::Display for TimeMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Dataset-wide timestamp range, `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBounds {
    pub min: TimeMs,
    pub max: TimeMs,
}

impl TimeBounds {
    /// Ordered constructor; reversed inputs are swapped rather than rejected.
    pub fn new(min: TimeMs, max: TimeMs) -> Self {
        if max < min {
            TimeBounds { min: max, max: min }
        } else {
            TimeBounds { min, max }
        }
    }

    pub fn span_ms(&self) -> u64 {
        self.max.0 - self.min.0
    }

    pub fn contains(&self, ts: TimeMs) -> bool {
        self.min <= ts && ts <= self.max
    }

    pub fn clamp(&self, ts: TimeMs) -> TimeMs {
        ts.max(self.min).min(self.max)
    }
}

/// Closed value variant for property bags.
///
/// Untagged so ordinary JSON (`null`, booleans, numbers, strings, arrays,
/// objects) round-trips without markup. Integral numbers bind to `Int`
/// before `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<PropValue>),
    Map(BTreeMap<String, PropValue>),
}

/// Opaque per-element property bag. Ordered map so iteration and serialized
/// output are deterministic.
pub type PropertyBag = BTreeMap<String, PropValue>;

/// Optional geographic coordinate carried by some nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: ElementId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<TimeMs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoPoint>,
    #[serde(default)]
    pub properties: PropertyBag,
}

impl NodeRecord {
    /// Minimal record for tests and synthetic data.
    pub fn new(id: impl Into<ElementId>) -> Self {
        NodeRecord {
            id: id.into(),
            label: String::new(),
            category: String::new(),
            timestamp: None,
            geo: None,
            properties: PropertyBag::new(),
        }
    }

    pub fn with_timestamp(mut self, ts: u64) -> Self {
        self.timestamp = Some(TimeMs(ts));
        self
    }

    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub id: ElementId,
    pub source_id: ElementId,
    pub target_id: ElementId,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<TimeMs>,
    #[serde(default)]
    pub properties: PropertyBag,
}

impl EdgeRecord {
    pub fn new(
        id: impl Into<ElementId>,
        source: impl Into<ElementId>,
        target: impl Into<ElementId>,
    ) -> Self {
        EdgeRecord {
            id: id.into(),
            source_id: source.into(),
            target_id: target.into(),
            category: String::new(),
            timestamp: None,
            properties: PropertyBag::new(),
        }
    }

    pub fn with_timestamp(mut self, ts: u64) -> Self {
        self.timestamp = Some(TimeMs(ts));
        self
    }

    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty() && !self.source_id.is_empty() && !self.target_id.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Node,
    Edge,
}

/// A single dataset element, discriminated by the upstream `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraphElement {
    Node(NodeRecord),
    Edge(EdgeRecord),
}

impl GraphElement {
    pub fn id(&self) -> &ElementId {
        match self {
            GraphElement::Node(n) => &n.id,
            GraphElement::Edge(e) => &e.id,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            GraphElement::Node(_) => ElementKind::Node,
            GraphElement::Edge(_) => ElementKind::Edge,
        }
    }

    pub fn timestamp(&self) -> Option<TimeMs> {
        match self {
            GraphElement::Node(n) => n.timestamp,
            GraphElement::Edge(e) => e.timestamp,
        }
    }

    pub fn as_node(&self) -> Option<&NodeRecord> {
        match self {
            GraphElement::Node(n) => Some(n),
            GraphElement::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&EdgeRecord> {
        match self {
            GraphElement::Node(_) => None,
            GraphElement::Edge(e) => Some(e),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        match self {
            GraphElement::Node(n) => n.is_well_formed(),
            GraphElement::Edge(e) => e.is_well_formed(),
        }
    }
}

/// Parse loosely-shaped upstream JSON into typed elements.
///
/// Records that fail to deserialize (missing `type` discriminant, wrong field
/// shapes) are skipped and counted rather than failing the batch. Returns the
/// surviving elements and the dropped count.
pub fn parse_elements(values: Vec<serde_json::Value>) -> (Vec<GraphElement>, usize) {
    let mut parsed = Vec::with_capacity(values.len());
    let mut dropped = 0usize;
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<GraphElement>(value) {
            Ok(element) => parsed.push(element),
            Err(e) => {
                warn!("Skipping malformed element at index {index}: {e}");
                dropped += 1;
            },
        }
    }
    (parsed, dropped)
}
