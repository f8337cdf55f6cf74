//! Mnemon CLI
//!
//! Symbolic command surface for the memory engine. Every mutating command
//! prints a single JSON object on stdout; query commands print a JSON
//! object with `meta` + `results` or a JSON array. Logs go to stderr so
//! stdout stays machine-readable.

mod store_dir;
mod viz;

use clap::{Parser, Subcommand};
use serde_json::json;

use mnemon_core::{
    Category, EdgeType, Intent, RecallInput, RememberInput, Source, Store, StoreError,
};

/// Mnemon - persistent memory store for LLM-driven agents
#[derive(Parser)]
#[command(name = "mnemon")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Persistent graph memory for LLM-driven agents")]
#[command(
    long_about = "Mnemon ingests agent insights, indexes them in a four-layer typed graph \
(temporal, entity, causal, semantic), retrieves them with intent-adaptive ranking, and \
ages them out through effective-importance decay."
)]
struct Cli {
    /// Store to operate on (falls back to MNEMON_STORE, the active file,
    /// then "default")
    #[arg(long, global = true)]
    store: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an insight through the write pipeline
    Remember {
        /// The insight text
        content: String,
        /// Category: preference, decision, fact, insight, context, general
        #[arg(long, default_value = "general")]
        category: String,
        /// Importance, 1 (low) to 5 (critical)
        #[arg(long, default_value_t = 3)]
        importance: i32,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Comma-separated entities, merged with extracted ones
        #[arg(long)]
        entities: Option<String>,
        /// Source: user, agent, external
        #[arg(long, default_value = "user")]
        source: String,
        /// Skip the deduplication diff
        #[arg(long)]
        no_diff: bool,
    },

    /// Smart recall with intent-adaptive ranking
    Recall {
        /// Search query
        query: String,
        /// Maximum results
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Intent override: why, when, entity, general
        #[arg(long)]
        intent: Option<String>,
        /// Restrict to one category
        #[arg(long)]
        category: Option<String>,
        /// Restrict to one source
        #[arg(long)]
        source: Option<String>,
        /// Skip graph traversal
        #[arg(long)]
        basic: bool,
    },

    /// Basic keyword search (no graph pipeline, no access bookkeeping)
    Search {
        /// Search query
        query: String,
        /// Maximum results
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Restrict to one category
        #[arg(long)]
        category: Option<String>,
        /// Restrict to one source
        #[arg(long)]
        source: Option<String>,
    },

    /// Create one directed edge between two insights
    Link {
        /// Origin insight id
        source_id: String,
        /// Destination insight id
        target_id: String,
        /// Edge type: temporal, entity, causal, semantic
        #[arg(long = "type", default_value = "semantic")]
        edge_type: String,
        /// Edge weight in [0.0, 1.0]
        #[arg(long, default_value_t = 1.0)]
        weight: f64,
        /// Extra metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Breadth-first neighborhood of an insight
    Related {
        /// Start insight id
        id: String,
        /// Restrict to one edge type
        #[arg(long = "type")]
        edge_type: Option<String>,
        /// Maximum hops
        #[arg(long, default_value_t = 1)]
        depth: usize,
    },

    /// Soft-delete an insight and cascade its edges
    Forget {
        /// Insight id
        id: String,
    },

    /// Review, protect, or inspect low-importance insights
    Gc {
        /// EI threshold for review
        #[arg(long, default_value_t = 0.5)]
        threshold: f64,
        /// Boost an insight past the immunity threshold
        #[arg(long)]
        keep: Option<String>,
        /// List prune candidates (read-only)
        #[arg(long)]
        review: bool,
        /// Maximum candidates listed
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Aggregate store counters
    Status,

    /// Recent operations, newest first
    Log {
        /// Maximum entries
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Embedding maintenance
    Embed {
        /// Probe the provider and report coverage
        #[arg(long)]
        status: bool,
        /// Backfill embeddings for insights missing one
        #[arg(long)]
        all: bool,
        /// Embed a single insight
        id: Option<String>,
    },

    /// Manage named stores
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },

    /// Render the graph
    Viz {
        /// Output format: dot or html
        #[arg(long, default_value = "dot")]
        format: String,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// List store names
    List,
    /// Create a new store
    Create { name: String },
    /// Make a store the active one
    Set { name: String },
    /// Remove a store (refuses the active one)
    Remove { name: String },
}

// ============================================================================
// ARGUMENT PARSING HELPERS
// ============================================================================

fn parse_category(s: &str) -> Result<Category, StoreError> {
    Category::parse(s).ok_or_else(|| StoreError::InvalidInput(format!("unknown category: {s:?}")))
}

fn parse_source(s: &str) -> Result<Source, StoreError> {
    Source::parse(s).ok_or_else(|| StoreError::InvalidInput(format!("unknown source: {s:?}")))
}

fn parse_edge_type(s: &str) -> Result<EdgeType, StoreError> {
    EdgeType::parse(s).ok_or_else(|| StoreError::InvalidInput(format!("unknown edge type: {s:?}")))
}

fn parse_intent(s: &str) -> Result<Intent, StoreError> {
    Intent::parse(s).ok_or_else(|| StoreError::InvalidInput(format!("unknown intent: {s:?}")))
}

fn split_csv(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// MAIN
// ============================================================================

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("MNEMON_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        let (kind, message) = match err.downcast_ref::<StoreError>() {
            Some(store_err) => (store_err.kind(), store_err.to_string()),
            None => ("error", err.to_string()),
        };
        println!(
            "{}",
            json!({"error": {"kind": kind, "message": message}})
        );
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // store management happens below the engine; handle it before opening
    if let Commands::Store { action } = &cli.command {
        let root = store_dir::data_root();
        return match action {
            StoreAction::List => {
                let stores = store_dir::list_stores(&root)?;
                let active = store_dir::active_store(&root);
                print_json(&json!({"stores": stores, "active": active}))
            }
            StoreAction::Create { name } => {
                store_dir::create_store(&root, name)?;
                print_json(&json!({"created": name}))
            }
            StoreAction::Set { name } => {
                store_dir::set_active(&root, name)?;
                print_json(&json!({"active": name}))
            }
            StoreAction::Remove { name } => {
                store_dir::remove_store(&root, name)?;
                print_json(&json!({"removed": name}))
            }
        };
    }

    let db_path = store_dir::resolve_db_path(cli.store.as_deref())?;
    let store = Store::open(db_path)?;

    match cli.command {
        Commands::Remember {
            content,
            category,
            importance,
            tags,
            entities,
            source,
            no_diff,
        } => {
            let input = RememberInput {
                content,
                category: parse_category(&category)?,
                importance,
                tags: split_csv(tags),
                entities: split_csv(entities),
                source: parse_source(&source)?,
                no_diff,
            };
            let outcome = store.remember(input)?;
            print_json(&outcome)
        }

        Commands::Recall {
            query,
            limit,
            intent,
            category,
            source,
            basic,
        } => {
            let input = RecallInput {
                query,
                limit,
                intent: intent.as_deref().map(parse_intent).transpose()?,
                category: category.as_deref().map(parse_category).transpose()?,
                source: source.as_deref().map(parse_source).transpose()?,
                basic,
            };
            let response = store.recall(input)?;
            print_json(&response)
        }

        Commands::Search {
            query,
            limit,
            category,
            source,
        } => {
            let hits = store.search(
                &query,
                limit,
                category.as_deref().map(parse_category).transpose()?,
                source.as_deref().map(parse_source).transpose()?,
            )?;
            print_json(&hits)
        }

        Commands::Link {
            source_id,
            target_id,
            edge_type,
            weight,
            metadata,
        } => {
            let metadata = metadata
                .as_deref()
                .map(|raw| {
                    serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw)
                        .map_err(|e| StoreError::InvalidInput(format!("bad metadata JSON: {e}")))
                })
                .transpose()?;
            let outcome = store.link(
                &source_id,
                &target_id,
                parse_edge_type(&edge_type)?,
                weight,
                metadata,
            )?;
            print_json(&outcome)
        }

        Commands::Related {
            id,
            edge_type,
            depth,
        } => {
            let related = store.related(
                &id,
                edge_type.as_deref().map(parse_edge_type).transpose()?,
                depth,
            )?;
            print_json(&related)
        }

        Commands::Forget { id } => {
            let outcome = store.forget(&id)?;
            print_json(&outcome)
        }

        Commands::Gc {
            threshold,
            keep,
            review,
            limit,
        } => {
            if let Some(id) = keep {
                let outcome = store.boost(&id)?;
                return print_json(&outcome);
            }
            // without --keep, gc is a read-only review (also the default)
            let _ = review;
            let candidates = store.gc_review(threshold, limit)?;
            print_json(&json!({
                "threshold": threshold,
                "candidates": candidates,
            }))
        }

        Commands::Status => {
            let status = store.status()?;
            print_json(&status)
        }

        Commands::Log { limit } => {
            let entries = store.oplog(limit)?;
            print_json(&entries)
        }

        Commands::Embed { status, all, id } => {
            if status {
                let store_status = store.status()?;
                return print_json(&json!({
                    "ollama_available": store_status.ollama_available,
                    "endpoint": store_status.embed_endpoint,
                    "model": store_status.embed_model,
                    "active_insights": store_status.active_insights,
                    "with_embedding": store_status.with_embedding,
                }));
            }
            if all {
                let backfill = store.embed_missing(usize::MAX >> 1)?;
                return print_json(&backfill);
            }
            match id {
                Some(id) => {
                    let embedded = store.embed_one(&id)?;
                    print_json(&json!({"id": id, "embedded": embedded}))
                }
                None => Err(StoreError::InvalidInput(
                    "embed needs --status, --all, or an insight id".into(),
                )
                .into()),
            }
        }

        Commands::Viz { format } => {
            let insights = store.all_active()?;
            let edges = store.all_edges()?;
            match format.as_str() {
                "dot" => {
                    println!("{}", viz::render_dot(&insights, &edges));
                    Ok(())
                }
                "html" => {
                    println!("{}", viz::render_html(&insights, &edges));
                    Ok(())
                }
                other => {
                    Err(StoreError::InvalidInput(format!("unknown viz format: {other:?}")).into())
                }
            }
        }

        Commands::Store { .. } => unreachable!("handled before the store opens"),
    }
}
