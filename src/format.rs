//! Terminal output formatting for the task forest.

use crate::collapse::{CollapseCache, PreferenceStore};
use crate::types::{Forest, Task, TaskNode};
use anyhow::Result;
use serde_json::to_string as json;

/// Output format for the `tree` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Indented checklist
    #[default]
    Text,
    /// Nested JSON
    Json,
}

/// Format the forest as an indented checklist.
///
/// Subtrees the cache marks as collapsed are folded into a
/// `(+N hidden)` marker unless `expand_all` is set.
pub fn format_forest_text<S: PreferenceStore>(
    forest: &Forest,
    collapse: &CollapseCache<S>,
    expand_all: bool,
) -> String {
    if forest.is_empty() {
        return "No tasks yet!\n".to_string();
    }

    let mut out = String::new();
    let mut stack: Vec<(usize, &TaskNode)> = forest.iter().rev().map(|n| (0, n)).collect();

    while let Some((depth, node)) = stack.pop() {
        let task = &node.task;
        out.push_str(&"  ".repeat(depth));
        out.push_str(if task.completed { "[x] " } else { "[ ] " });
        out.push_str(&task.text);
        out.push_str(&format!(" (#{})", task.id));

        if node.has_children() {
            if !expand_all && collapse.is_collapsed(node.id()) {
                out.push_str(&format!(" (+{} hidden)", node.descendant_count()));
            } else {
                stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
            }
        }
        out.push('\n');
    }

    out
}

enum Frame<'a> {
    /// Emit a task object, followed by a comma unless it is the last sibling.
    Open(&'a TaskNode, bool),
    /// Close the children array and the object that owns it.
    Close(bool),
}

fn push_fields(out: &mut String, task: &Task) -> Result<()> {
    let fields = [
        ("id", json(&task.id)?),
        ("text", json(&task.text)?),
        ("completed", json(&task.completed)?),
        ("parent_id", json(&task.parent_id)?),
        ("created_at", json(&task.created_at)?),
        ("updated_at", json(&task.updated_at)?),
    ];
    for (name, value) in fields {
        out.push_str(&format!("\"{}\":{},", name, value));
    }
    Ok(())
}

/// Format the forest as compact nested JSON.
///
/// Each task object carries its fields plus a `children` array. Written
/// from an explicit stack, so output size and stack use stay linear in the
/// number of tasks however deep the nesting goes.
pub fn format_forest_json(forest: &Forest) -> Result<String> {
    let mut out = String::from("[");
    let mut stack: Vec<Frame> = forest
        .iter()
        .enumerate()
        .rev()
        .map(|(i, node)| Frame::Open(node, i + 1 == forest.len()))
        .collect();

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Open(node, last) => {
                out.push('{');
                push_fields(&mut out, &node.task)?;
                out.push_str("\"children\":[");
                stack.push(Frame::Close(last));
                let count = node.children.len();
                stack.extend(
                    node.children
                        .iter()
                        .enumerate()
                        .rev()
                        .map(|(i, child)| Frame::Open(child, i + 1 == count)),
                );
            }
            Frame::Close(last) => {
                out.push_str(if last { "]}" } else { "]}," });
            }
        }
    }

    out.push(']');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collapse::MemoryStore;
    use crate::hierarchy::build_forest;
    use crate::types::Task;

    fn task(id: i64, parent_id: Option<i64>, text: &str, completed: bool) -> Task {
        Task {
            id,
            text: text.to_string(),
            completed,
            parent_id,
            created_at: id,
            updated_at: id,
        }
    }

    fn groceries() -> Forest {
        build_forest(vec![
            task(1, None, "Buy groceries", false),
            task(2, Some(1), "Milk", true),
            task(3, Some(1), "Eggs", false),
        ])
    }

    #[test]
    fn collapsed_by_default_folds_children() {
        let cache = CollapseCache::load(MemoryStore::new()).unwrap();
        let out = format_forest_text(&groceries(), &cache, false);
        assert_eq!(out, "[ ] Buy groceries (#1) (+2 hidden)\n");
    }

    #[test]
    fn expanded_parent_shows_children() {
        let mut cache = CollapseCache::load(MemoryStore::new()).unwrap();
        cache.set_state(1, false).unwrap();
        let out = format_forest_text(&groceries(), &cache, false);
        assert_eq!(
            out,
            "[ ] Buy groceries (#1)\n  [x] Milk (#2)\n  [ ] Eggs (#3)\n"
        );
    }

    #[test]
    fn expand_all_ignores_cache() {
        let cache = CollapseCache::load(MemoryStore::new()).unwrap();
        let out = format_forest_text(&groceries(), &cache, true);
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn empty_forest() {
        let cache = CollapseCache::load(MemoryStore::new()).unwrap();
        assert_eq!(format_forest_text(&Vec::new(), &cache, false), "No tasks yet!\n");
    }

    #[test]
    fn json_nests_children() {
        let json = format_forest_json(&groceries()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["text"], "Buy groceries");
        assert_eq!(value[0]["children"][1]["text"], "Eggs");
        assert_eq!(value[0]["children"][0]["completed"], true);
        assert_eq!(value[0]["children"][0]["parent_id"], 1);
        assert_eq!(value[0]["parent_id"], serde_json::Value::Null);
    }

    #[test]
    fn json_exact_layout() {
        let forest = build_forest(vec![task(1, None, "A", false), task(2, Some(1), "B", true)]);
        assert_eq!(
            format_forest_json(&forest).unwrap(),
            concat!(
                r#"[{"id":1,"text":"A","completed":false,"parent_id":null,"created_at":1,"updated_at":1,"children":["#,
                r#"{"id":2,"text":"B","completed":true,"parent_id":1,"created_at":2,"updated_at":2,"children":[]}]}]"#
            )
        );
    }

    #[test]
    fn json_escapes_text_and_handles_empty_forest() {
        assert_eq!(format_forest_json(&Vec::new()).unwrap(), "[]");

        let forest = build_forest(vec![task(1, None, "say \"hi\"\n", false)]);
        let value: serde_json::Value =
            serde_json::from_str(&format_forest_json(&forest).unwrap()).unwrap();
        assert_eq!(value[0]["text"], "say \"hi\"\n");
        assert_eq!(value[0]["children"], serde_json::json!([]));
    }

    #[test]
    fn json_for_very_deep_chain_stays_on_a_small_stack() {
        const DEPTH: i64 = 20_000;

        let handle = std::thread::Builder::new()
            .stack_size(1024 * 1024)
            .spawn(|| {
                let tasks = (1..=DEPTH)
                    .map(|id| task(id, if id == 1 { None } else { Some(id - 1) }, "step", false))
                    .collect();
                let forest = build_forest(tasks);
                format_forest_json(&forest).unwrap()
            })
            .unwrap();
        let json = handle.join().unwrap();

        assert_eq!(json.matches("\"id\":").count(), DEPTH as usize);
        assert_eq!(json.matches("\"children\":[]").count(), 1);
        assert!(json.starts_with(r#"[{"id":1,"#));
        assert!(json.ends_with(&format!("{}]", "]}".repeat(DEPTH as usize))));
    }
}
