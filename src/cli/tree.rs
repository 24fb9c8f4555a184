//! Tree subcommand: print the task forest in the terminal.
//!
//! Fold state lives in a file-backed collapse cache under the user's data
//! directory, so `--fold`/`--unfold` choices persist between runs.

use crate::collapse::{CollapseCache, FileStore, MemoryStore, PreferenceStore};
use crate::db::Database;
use crate::format::{OutputFormat, format_forest_json, format_forest_text};
use crate::hierarchy::build_forest;
use crate::types::TaskId;
use anyhow::Result;
use clap::Args;
use std::io::Write;
use tracing::warn;

/// Arguments for the tree subcommand
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Show every subtree regardless of saved fold state
    #[arg(short, long)]
    pub all: bool,

    /// Remember these parent tasks as collapsed
    #[arg(long, value_name = "ID", value_delimiter = ',')]
    pub fold: Vec<TaskId>,

    /// Remember these parent tasks as expanded
    #[arg(long, value_name = "ID", value_delimiter = ',')]
    pub unfold: Vec<TaskId>,
}

/// Run the tree command, writing to `out`.
pub fn run<W: Write>(db: &Database, args: &TreeArgs, collapsed_by_default: bool, out: &mut W) -> Result<()> {
    match FileStore::in_data_dir() {
        Some(store) => run_with_store(db, args, store, collapsed_by_default, out),
        None => {
            warn!("No data directory available; fold state will not be saved");
            run_with_store(db, args, MemoryStore::new(), collapsed_by_default, out)
        }
    }
}

/// Run the tree command against an explicit preference store.
pub fn run_with_store<S: PreferenceStore, W: Write>(
    db: &Database,
    args: &TreeArgs,
    store: S,
    collapsed_by_default: bool,
    out: &mut W,
) -> Result<()> {
    let mut collapse = CollapseCache::load(store)?.with_default(collapsed_by_default);
    for &id in &args.fold {
        collapse.set_state(id, true)?;
    }
    for &id in &args.unfold {
        collapse.set_state(id, false)?;
    }

    let forest = build_forest(db.get_all_tasks()?);
    let rendered = match args.format {
        OutputFormat::Text => format_forest_text(&forest, &collapse, args.all),
        OutputFormat::Json => format_forest_json(&forest)? + "\n",
    };
    out.write_all(rendered.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> TreeArgs {
        TreeArgs {
            format: OutputFormat::Text,
            all: false,
            fold: Vec::new(),
            unfold: Vec::new(),
        }
    }

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        let root = db.create_task("Buy groceries", None).unwrap();
        db.create_task("Milk", Some(root.id)).unwrap();
        db
    }

    #[test]
    fn unfold_persists_in_file_store() {
        let db = seeded_db();
        let dir = tempfile::tempdir().unwrap();

        let mut first = args();
        first.unfold = vec![1];
        let mut out = Vec::new();
        run_with_store(&db, &first, FileStore::new(dir.path()), true, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("  [ ] Milk (#2)"));

        // A later run without flags keeps the saved state.
        let mut out = Vec::new();
        run_with_store(&db, &args(), FileStore::new(dir.path()), true, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Milk"));
    }

    #[test]
    fn default_run_folds_parents() {
        let db = seeded_db();
        let mut out = Vec::new();
        run_with_store(&db, &args(), MemoryStore::new(), true, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[ ] Buy groceries (#1) (+1 hidden)\n"
        );
    }

    #[test]
    fn json_output() {
        let db = seeded_db();
        let mut tree_args = args();
        tree_args.format = OutputFormat::Json;
        let mut out = Vec::new();
        run_with_store(&db, &tree_args, MemoryStore::new(), true, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["children"][0]["text"], "Milk");
    }
}
