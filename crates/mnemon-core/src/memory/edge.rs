//! Typed edges - the four-graph model
//!
//! Edges are directed, weighted links between insights. A given ordered pair
//! carries at most one edge per type; bidirectional links are stored as two
//! directed rows. Metadata is a tagged variant per edge type and flattens to
//! a generic JSON map at the storage boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// EDGE TYPE
// ============================================================================

/// The four edge layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Same-source backbone and 24-hour proximity links
    Temporal,
    /// Shared-entity co-occurrence links
    Entity,
    /// Detected or declared cause/effect links
    Causal,
    /// Embedding- or token-similarity links
    Semantic,
}

impl EdgeType {
    /// All variants, in declaration order
    pub const ALL: [EdgeType; 4] = [
        EdgeType::Temporal,
        EdgeType::Entity,
        EdgeType::Causal,
        EdgeType::Semantic,
    ];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Temporal => "temporal",
            EdgeType::Entity => "entity",
            EdgeType::Causal => "causal",
            EdgeType::Semantic => "semantic",
        }
    }

    /// Parse from string name; `None` for unknown values
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "temporal" => Some(EdgeType::Temporal),
            "entity" => Some(EdgeType::Entity),
            "causal" => Some(EdgeType::Causal),
            "semantic" => Some(EdgeType::Semantic),
            _ => None,
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// METADATA SUB-TYPES
// ============================================================================

/// Temporal edge flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalSubType {
    /// Link to the most recent insight from the same source
    Backbone,
    /// Link to an insight created within the proximity window
    Proximity,
}

impl TemporalSubType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TemporalSubType::Backbone => "backbone",
            TemporalSubType::Proximity => "proximity",
        }
    }
}

/// Causal edge flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CausalLink {
    /// One insight caused the other
    Causes,
    /// One insight makes the other possible
    Enables,
    /// One insight rules the other out
    Prevents,
}

impl CausalLink {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CausalLink::Causes => "causes",
            CausalLink::Enables => "enables",
            CausalLink::Prevents => "prevents",
        }
    }
}

// ============================================================================
// EDGE METADATA
// ============================================================================

/// Per-type edge metadata, flattened to a JSON map on disk
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeMetadata {
    /// `{sub_type, hours_diff}`
    Temporal {
        sub_type: TemporalSubType,
        hours_diff: f64,
    },
    /// `{entity}`
    Entity { entity: String },
    /// `{sub_type, reason}`
    Causal { sub_type: CausalLink, reason: String },
    /// `{cosine}`
    Semantic { cosine: f64 },
    /// Caller-provided map from an explicit `link`
    Other(Map<String, Value>),
}

impl EdgeMetadata {
    /// Flatten to the generic map stored in the `metadata` column
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            EdgeMetadata::Temporal {
                sub_type,
                hours_diff,
            } => {
                map.insert("sub_type".into(), Value::String(sub_type.as_str().into()));
                map.insert("hours_diff".into(), Value::String(hours_diff.to_string()));
            }
            EdgeMetadata::Entity { entity } => {
                map.insert("entity".into(), Value::String(entity.clone()));
            }
            EdgeMetadata::Causal { sub_type, reason } => {
                map.insert("sub_type".into(), Value::String(sub_type.as_str().into()));
                map.insert("reason".into(), Value::String(reason.clone()));
            }
            EdgeMetadata::Semantic { cosine } => {
                map.insert(
                    "cosine".into(),
                    serde_json::Number::from_f64(*cosine)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                );
            }
            EdgeMetadata::Other(map_in) => return map_in.clone(),
        }
        map
    }

    /// Serialize to the JSON text stored on disk
    pub fn to_json(&self) -> String {
        Value::Object(self.to_map()).to_string()
    }
}

// ============================================================================
// EDGE
// ============================================================================

/// A directed, weighted, typed link between two insights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Origin insight id
    pub source_id: String,
    /// Destination insight id
    pub target_id: String,
    /// Which of the four layers this edge belongs to
    pub edge_type: EdgeType,
    /// Link strength in [0.0, 1.0]
    pub weight: f64,
    /// Per-type metadata as the generic on-disk map
    pub metadata: Map<String, Value>,
    /// When the edge was created
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_type_roundtrip() {
        for edge_type in EdgeType::ALL {
            assert_eq!(EdgeType::parse(edge_type.as_str()), Some(edge_type));
        }
        assert_eq!(EdgeType::parse("social"), None);
    }

    #[test]
    fn temporal_metadata_flattens_with_float_string() {
        let meta = EdgeMetadata::Temporal {
            sub_type: TemporalSubType::Proximity,
            hours_diff: 0.5,
        };
        let map = meta.to_map();
        assert_eq!(map["sub_type"], "proximity");
        assert_eq!(map["hours_diff"], "0.5");
    }

    #[test]
    fn causal_metadata_carries_reason() {
        let meta = EdgeMetadata::Causal {
            sub_type: CausalLink::Causes,
            reason: "because".into(),
        };
        let map = meta.to_map();
        assert_eq!(map["sub_type"], "causes");
        assert_eq!(map["reason"], "because");
    }

    #[test]
    fn other_metadata_passes_through() {
        let mut inner = Map::new();
        inner.insert("note".into(), Value::String("manual".into()));
        let meta = EdgeMetadata::Other(inner.clone());
        assert_eq!(meta.to_map(), inner);
    }
}
