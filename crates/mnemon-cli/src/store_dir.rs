//! Store directory layout and multiplexing
//!
//! The data root holds one directory per named store plus an `active` file:
//!
//! ```text
//! <data_root>/active                  - plain text, active store name
//! <data_root>/data/<store>/mnemon.db  - one durable store per name
//! ```
//!
//! Resolution priority for the store name: `--store` flag, `MNEMON_STORE`,
//! the active file, then the literal "default". The core receives a
//! resolved database path and knows nothing about multiplexing.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

/// Environment variable overriding the data root
pub const DATA_DIR_ENV: &str = "MNEMON_DATA_DIR";

/// Environment variable overriding the active store
pub const STORE_ENV: &str = "MNEMON_STORE";

const ACTIVE_FILE: &str = "active";
const DEFAULT_STORE: &str = "default";
const DB_FILE: &str = "mnemon.db";

/// Base directory for all stores
pub fn data_root() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".mnemon"))
        .unwrap_or_else(|| PathBuf::from(".mnemon"))
}

fn valid_store_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

/// Resolve the store name: flag, env, active file, "default"
pub fn resolve_store_name(flag: Option<&str>, root: &Path) -> String {
    if let Some(name) = flag {
        return name.to_string();
    }
    if let Ok(name) = std::env::var(STORE_ENV) {
        if !name.is_empty() {
            return name;
        }
    }
    if let Ok(name) = fs::read_to_string(root.join(ACTIVE_FILE)) {
        let name = name.trim().to_string();
        if !name.is_empty() {
            return name;
        }
    }
    DEFAULT_STORE.to_string()
}

/// Database path for one named store
pub fn store_db_path(root: &Path, name: &str) -> PathBuf {
    root.join("data").join(name).join(DB_FILE)
}

/// One-time move of a legacy flat-layout database into the named layout
pub fn migrate_legacy_layout(root: &Path) -> anyhow::Result<()> {
    let legacy = root.join(DB_FILE);
    let target = store_db_path(root, DEFAULT_STORE);
    if legacy.exists() && !target.exists() {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&legacy, &target)
            .with_context(|| format!("moving {} to {}", legacy.display(), target.display()))?;
        tracing::info!(from = %legacy.display(), to = %target.display(), "migrated legacy store layout");
    }
    Ok(())
}

/// Resolve the database path for this invocation, applying the legacy
/// migration first
pub fn resolve_db_path(flag: Option<&str>) -> anyhow::Result<PathBuf> {
    let root = data_root();
    let name = resolve_store_name(flag, &root);
    if !valid_store_name(&name) {
        bail!("invalid store name: {name:?}");
    }
    migrate_legacy_layout(&root)?;
    Ok(store_db_path(&root, &name))
}

// ============================================================================
// STORE MANAGEMENT
// ============================================================================

/// Names of all stores under the data root
pub fn list_stores(root: &Path) -> anyhow::Result<Vec<String>> {
    let data = root.join("data");
    if !data.exists() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = fs::read_dir(&data)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}

/// Create a new named store (directory only; the DB appears on first open)
pub fn create_store(root: &Path, name: &str) -> anyhow::Result<()> {
    if !valid_store_name(name) {
        bail!("invalid store name: {name:?}");
    }
    let dir = root.join("data").join(name);
    if dir.exists() {
        bail!("store {name:?} already exists");
    }
    fs::create_dir_all(&dir)?;
    Ok(())
}

/// Point the active file at a named store
pub fn set_active(root: &Path, name: &str) -> anyhow::Result<()> {
    if !valid_store_name(name) {
        bail!("invalid store name: {name:?}");
    }
    if !root.join("data").join(name).exists() {
        bail!("store {name:?} does not exist");
    }
    fs::create_dir_all(root)?;
    fs::write(root.join(ACTIVE_FILE), format!("{name}\n"))?;
    Ok(())
}

/// The currently active store name
pub fn active_store(root: &Path) -> String {
    resolve_store_name(None, root)
}

/// Remove a named store; refuses to remove the active one
pub fn remove_store(root: &Path, name: &str) -> anyhow::Result<()> {
    if !valid_store_name(name) {
        bail!("invalid store name: {name:?}");
    }
    if active_store(root) == name {
        bail!("cannot remove the active store {name:?}");
    }
    let dir = root.join("data").join(name);
    if !dir.exists() {
        bail!("store {name:?} does not exist");
    }
    fs::remove_dir_all(&dir)?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn resolution_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        // no flag, no active file (env intentionally ignored: the test
        // passes an explicit flag for the env-sensitive branches)
        assert_eq!(resolve_store_name(Some("work"), dir.path()), "work");
        let resolved = resolve_store_name(None, dir.path());
        // either the env leaks in from the harness or we land on default
        assert!(!resolved.is_empty());
    }

    #[test]
    fn active_file_drives_resolution() {
        let dir = TempDir::new().unwrap();
        create_store(dir.path(), "research").unwrap();
        set_active(dir.path(), "research").unwrap();
        if std::env::var(STORE_ENV).is_err() {
            assert_eq!(resolve_store_name(None, dir.path()), "research");
        }
        // flag always wins
        assert_eq!(resolve_store_name(Some("flag"), dir.path()), "flag");
    }

    #[test]
    fn legacy_database_moves_once() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("mnemon.db"), b"legacy-bytes").unwrap();

        migrate_legacy_layout(dir.path()).unwrap();

        let target = store_db_path(dir.path(), "default");
        assert!(target.exists());
        assert!(!dir.path().join("mnemon.db").exists());
        assert_eq!(std::fs::read(target).unwrap(), b"legacy-bytes");
    }

    #[test]
    fn legacy_migration_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let target = store_db_path(dir.path(), "default");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"current").unwrap();
        std::fs::write(dir.path().join("mnemon.db"), b"legacy").unwrap();

        migrate_legacy_layout(dir.path()).unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"current");
        // legacy file stays put rather than clobbering the target
        assert!(dir.path().join("mnemon.db").exists());
    }

    #[test]
    fn store_management_roundtrip() {
        let dir = TempDir::new().unwrap();
        create_store(dir.path(), "alpha").unwrap();
        create_store(dir.path(), "beta").unwrap();
        assert_eq!(list_stores(dir.path()).unwrap(), vec!["alpha", "beta"]);

        set_active(dir.path(), "alpha").unwrap();
        assert!(remove_store(dir.path(), "alpha").is_err());
        remove_store(dir.path(), "beta").unwrap();
        assert_eq!(list_stores(dir.path()).unwrap(), vec!["alpha"]);
    }

    #[test]
    fn hostile_store_names_are_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(create_store(dir.path(), "../escape").is_err());
        assert!(create_store(dir.path(), "").is_err());
        assert!(create_store(dir.path(), "with/slash").is_err());
    }
}
