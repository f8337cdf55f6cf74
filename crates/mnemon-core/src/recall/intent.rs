//! Intent Detection
//!
//! Coarse query classification steering edge-type and rerank weights.
//! Regex families are matched in order (WHY, WHEN, ENTITY); the first match
//! wins and anything else is GENERAL. Triggers are bilingual (English and
//! Chinese).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// INTENT
// ============================================================================

/// Query intent classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Cause-seeking queries
    Why,
    /// Time-anchored queries
    When,
    /// Definition / about-a-thing queries
    Entity,
    /// Everything else
    #[default]
    General,
}

impl Intent {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Why => "why",
            Intent::When => "when",
            Intent::Entity => "entity",
            Intent::General => "general",
        }
    }

    /// Parse a caller override; `None` for unknown values
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "why" => Some(Intent::Why),
            "when" => Some(Intent::When),
            "entity" => Some(Intent::Entity),
            "general" => Some(Intent::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// TRIGGERS
// ============================================================================

static WHY_TRIGGERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(why|reason|reasons|because|cause|caused|causes|motivation)\b|为什么|原因|理由")
        .unwrap()
});

static WHEN_TRIGGERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(when|time|timeline|before|after|history)\b|什么时候|何时|时间").unwrap()
});

static ENTITY_TRIGGERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(what is|what's|who is|who's|tell me about)\b|是什么|谁是|关于").unwrap()
});

/// Detect the intent of a query; first matching family wins
pub fn detect(query: &str) -> Intent {
    if WHY_TRIGGERS.is_match(query) {
        Intent::Why
    } else if WHEN_TRIGGERS.is_match(query) {
        Intent::When
    } else if ENTITY_TRIGGERS.is_match(query) {
        Intent::Entity
    } else {
        Intent::General
    }
}

// ============================================================================
// TESTS
// ============================================================================
