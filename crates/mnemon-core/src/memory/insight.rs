//! Insight - the fundamental unit of memory
//!
//! Each insight is roughly one sentence of agent-authored text plus its
//! metadata: category, importance, tags, an entity set, access bookkeeping,
//! and the derived effective importance used for pruning decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{MAX_CONTENT_LEN, MAX_IMPORTANCE, MAX_TAGS, MIN_IMPORTANCE};
use crate::embeddings::Embedding;
use crate::error::{Result, StoreError};
use crate::graph::EdgeCounts;
use crate::surface::{CausalCandidate, SemanticCandidate};

// ============================================================================
// CATEGORY
// ============================================================================

/// Categories of insights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// A stated user preference
    Preference,
    /// A decision that was made
    Decision,
    /// A discrete fact
    Fact,
    /// A derived observation
    Insight,
    /// Background or situational context
    Context,
    /// Anything else
    #[default]
    General,
}

impl Category {
    /// All variants, in declaration order
    pub const ALL: [Category; 6] = [
        Category::Preference,
        Category::Decision,
        Category::Fact,
        Category::Insight,
        Category::Context,
        Category::General,
    ];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Preference => "preference",
            Category::Decision => "decision",
            Category::Fact => "fact",
            Category::Insight => "insight",
            Category::Context => "context",
            Category::General => "general",
        }
    }

    /// Parse from string name; `None` for unknown values
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "preference" => Some(Category::Preference),
            "decision" => Some(Category::Decision),
            "fact" => Some(Category::Fact),
            "insight" => Some(Category::Insight),
            "context" => Some(Category::Context),
            "general" => Some(Category::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// SOURCE
// ============================================================================

/// Who authored an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The human user
    #[default]
    User,
    /// The host agent itself
    Agent,
    /// An external system
    External,
}

impl Source {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::User => "user",
            Source::Agent => "agent",
            Source::External => "external",
        }
    }

    /// Parse from string name; `None` for unknown values
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Source::User),
            "agent" => Some(Source::Agent),
            "external" => Some(Source::External),
            _ => None,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// INSIGHT
// ============================================================================

/// An insight in the memory graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// The insight text
    pub content: String,
    /// Category of the insight
    pub category: Category,
    /// Caller-assigned importance, 1 (low) to 5 (critical)
    pub importance: i32,
    /// Tags for categorization
    pub tags: Vec<String>,
    /// Entity set: caller-provided merged with extracted
    pub entities: Vec<String>,
    /// Who authored the insight
    pub source: Source,
    /// Semantic embedding; absent when the provider was unavailable
    #[serde(skip)]
    pub embedding: Option<Embedding>,
    /// Times this insight was retrieved or boosted
    pub access_count: i64,
    /// When the insight was last returned by recall
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// Derived pruning score, recomputed on every relevant mutation
    pub effective_importance: f64,
    /// When the insight was created
    pub created_at: DateTime<Utc>,
    /// When the insight was last modified
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker; `None` means active
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Insight {
    /// Active means not soft-deleted
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

// ============================================================================
// WRITE PIPELINE INPUT / OUTCOME
// ============================================================================

/// Input for the write pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RememberInput {
    /// The content to remember
    pub content: String,
    /// Category of the insight
    #[serde(default)]
    pub category: Category,
    /// Importance, 1 to 5
    pub importance: i32,
    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,
    /// Caller-provided entities, merged with extracted ones
    #[serde(default)]
    pub entities: Vec<String>,
    /// Who authored the insight
    #[serde(default)]
    pub source: Source,
    /// Bypass the deduplication diff entirely
    #[serde(default)]
    pub no_diff: bool,
}

impl Default for RememberInput {
    fn default() -> Self {
        Self {
            content: String::new(),
            category: Category::General,
            importance: 3,
            tags: vec![],
            entities: vec![],
            source: Source::User,
            no_diff: false,
        }
    }
}

impl RememberInput {
    /// Check caller-controlled limits before any state change
    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(StoreError::InvalidInput("content must not be empty".into()));
        }
        if self.content.chars().count() > MAX_CONTENT_LEN {
            return Err(StoreError::InvalidInput(format!(
                "content exceeds {} characters",
                MAX_CONTENT_LEN
            )));
        }
        if !(MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&self.importance) {
            return Err(StoreError::InvalidInput(format!(
                "importance must be between {} and {}",
                MIN_IMPORTANCE, MAX_IMPORTANCE
            )));
        }
        if self.tags.len() > MAX_TAGS {
            return Err(StoreError::InvalidInput(format!(
                "at most {} tags allowed",
                MAX_TAGS
            )));
        }
        Ok(())
    }
}

/// What the diff decided to do with the new insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Normal insert
    Added,
    /// The closest prior insight was soft-deleted and superseded
    Replaced,
    /// Near-duplicate of an existing insight; nothing was inserted
    Skipped,
}

impl Action {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Added => "added",
            Action::Replaced => "replaced",
            Action::Skipped => "skipped",
        }
    }
}

/// Result of one write-pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RememberOutcome {
    /// Id of the inserted insight (or of the duplicate when skipped)
    pub id: String,
    /// What the diff decided
    pub action: Action,
    /// Id of the superseded insight, when replaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_id: Option<String>,
    /// Edge rows created per type
    pub edges_created: EdgeCounts,
    /// Advisory near-matches below the auto-link bar
    pub semantic_candidates: Vec<SemanticCandidate>,
    /// Advisory causal-link suggestions within two hops
    pub causal_candidates: Vec<CausalCandidate>,
    /// Advisory content warnings; never fatal
    pub quality_warnings: Vec<String>,
    /// Whether an embedding was stored for the insight
    pub embedded: bool,
    /// Effective importance immediately after the write
    pub effective_importance: f64,
    /// Insights auto-pruned inside this write
    pub auto_pruned: usize,
}

// ============================================================================
// TESTS
// ============================================================================
