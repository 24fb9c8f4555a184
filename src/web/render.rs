//! HTML rendering for the task forest.
//!
//! Rendering walks the forest with an explicit stack of open/close frames,
//! so arbitrarily deep hierarchies never grow the call stack.

use super::flash::Flash;
use super::templates;
use crate::collapse::{CollapseCache, PreferenceStore};
use crate::config::UiConfig;
use crate::types::{Forest, TaskNode, TaskStats};

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// "1 subtask" / "3 subtasks".
fn subtask_label(count: usize) -> String {
    if count == 1 {
        "1 subtask".to_string()
    } else {
        format!("{} subtasks", count)
    }
}

enum Frame<'a> {
    Open(&'a TaskNode),
    Close,
}

/// Render the whole forest as nested `todo-item` blocks.
pub fn render_forest<S: PreferenceStore>(forest: &Forest, collapse: &CollapseCache<S>) -> String {
    if forest.is_empty() {
        return r#"<div class="empty-state text-center text-muted py-5">
            <i class="bi bi-check2-square display-4"></i>
            <p class="mt-3 mb-0">No tasks yet! Add one above to get started.</p>
        </div>"#
            .to_string();
    }

    let mut html = String::from(r#"<div class="todo-list">"#);
    let mut stack: Vec<Frame> = forest.iter().rev().map(Frame::Open).collect();

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Close => html.push_str("</div>"),
            Frame::Open(node) => {
                html.push_str(&render_task(node, collapse));
                if node.has_children() {
                    let collapsed = collapse.is_collapsed(node.id());
                    html.push_str(&format!(
                        r#"<div class="children{}" id="children-{}" data-parent-id="{}">"#,
                        if collapsed { " collapsed" } else { "" },
                        node.id(),
                        node.id()
                    ));
                    stack.push(Frame::Close);
                    stack.extend(node.children.iter().rev().map(Frame::Open));
                }
            }
        }
    }

    html.push_str("</div>");
    html
}

/// Render a single task row (without its children).
fn render_task<S: PreferenceStore>(node: &TaskNode, collapse: &CollapseCache<S>) -> String {
    let task = &node.task;
    let id = task.id;
    let text = html_escape(&task.text);

    let mut classes = vec!["todo-item"];
    classes.push(if task.is_root() { "parent-todo" } else { "nested-todo" });
    if task.completed {
        classes.push("completed");
    }

    let row_class = if task.is_root() {
        "d-flex align-items-center gap-2"
    } else {
        "d-flex align-items-center gap-2 ps-5"
    };

    let indicator = if task.is_root() {
        ""
    } else {
        r#"<div class="nested-indicator"></div>"#
    };

    let (collapse_button, badge, cascade_link) = if node.has_children() {
        let collapsed = collapse.is_collapsed(id);
        (
            format!(
                r#"<button type="button" class="collapse-toggle btn btn-sm btn-link p-0" data-parent-id="{id}" aria-controls="children-{id}" aria-expanded="{expanded}" title="Collapse/expand subtasks"><i class="bi {icon}"></i></button>"#,
                expanded = !collapsed,
                icon = if collapsed { "bi-chevron-right" } else { "bi-chevron-down" },
            ),
            format!(
                r#"<span class="badge bg-secondary">{}</span>"#,
                subtask_label(node.children.len())
            ),
            format!(
                r#"<a href="/toggle_with_children/{id}" class="btn btn-sm btn-outline-success" title="Toggle with all subtasks"><i class="bi bi-check2-all"></i></a>"#
            ),
        )
    } else {
        (String::new(), String::new(), String::new())
    };

    let text_class = if task.completed {
        "task-text flex-grow-1 text-decoration-line-through text-muted"
    } else {
        "task-text flex-grow-1"
    };

    format!(
        r#"<div class="{classes}" data-id="{id}">
  <div class="{row_class}">
    {indicator}{collapse_button}
    <input type="checkbox" class="form-check-input task-checkbox" data-href="/toggle/{id}" aria-label="Toggle completion"{checked}>
    <span class="{text_class}">{text}</span>
    <form class="edit-form d-none flex-grow-1" method="post" action="/edit/{id}">
      <div class="input-group input-group-sm">
        <input type="text" name="task" class="form-control" value="{text}" required>
        <button type="submit" class="btn btn-primary">Save</button>
        <button type="button" class="btn btn-outline-secondary edit-cancel">Cancel</button>
      </div>
    </form>
    {badge}
    <div class="task-actions btn-group">
      <button type="button" class="add-subtask-btn btn btn-sm btn-outline-primary" data-parent-id="{id}" title="Add subtask"><i class="bi bi-plus"></i></button>
      {cascade_link}
      <button type="button" class="edit-btn btn btn-sm btn-outline-secondary" title="Edit"><i class="bi bi-pencil"></i></button>
      <a href="/delete/{id}" class="delete-link btn btn-sm btn-outline-danger" title="Delete"><i class="bi bi-trash"></i></a>
    </div>
  </div>
  <form class="subtask-form d-none mt-2 ps-5" method="post" action="/add">
    <input type="hidden" name="parent_id" value="{id}">
    <div class="input-group input-group-sm">
      <input type="text" name="task" class="form-control" placeholder="New subtask..." required>
      <button type="submit" class="btn btn-primary"><i class="bi bi-plus-lg"></i></button>
    </div>
  </form>
</div>"#,
        classes = classes.join(" "),
        checked = if task.completed { " checked" } else { "" },
    )
}

/// Render the flash alert, or nothing.
pub fn render_flash(flash: Option<&Flash>) -> String {
    match flash {
        None => String::new(),
        Some(flash) => format!(
            r#"<div class="alert alert-{} alert-dismissible fade show" role="alert">{}<button type="button" class="btn-close" data-bs-dismiss="alert" aria-label="Close"></button></div>"#,
            flash.kind.alert_class(),
            html_escape(&flash.text)
        ),
    }
}

fn render_stats(stats: TaskStats) -> String {
    format!(
        r#"<span class="badge bg-primary">{} pending</span> <span class="badge bg-success">{} done</span>"#,
        stats.pending(),
        stats.completed
    )
}

/// Substitute `{{name}}` placeholders in one left-to-right pass.
///
/// Inserted values are never rescanned, so user text that happens to look
/// like a placeholder comes out verbatim. Unknown placeholders are kept.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

/// Fill the index page template.
pub fn render_index<S: PreferenceStore>(
    ui: &UiConfig,
    forest: &Forest,
    stats: TaskStats,
    collapse: &CollapseCache<S>,
    flash: Option<&Flash>,
) -> String {
    fill_template(
        templates::INDEX_TEMPLATE,
        &[
            ("title", html_escape(&ui.title).as_str()),
            ("collapsed_default", ui.collapsed_by_default.to_string().as_str()),
            ("flash", render_flash(flash).as_str()),
            ("stats", render_stats(stats).as_str()),
            ("tasks", render_forest(forest, collapse).as_str()),
        ],
    )
}

/// Fill the about page template.
pub fn render_about(ui: &UiConfig) -> String {
    fill_template(
        templates::ABOUT_TEMPLATE,
        &[
            ("title", html_escape(&ui.title).as_str()),
            ("version", env!("CARGO_PKG_VERSION")),
        ],
    )
}

/// Fill the not-found page template.
pub fn render_not_found(ui: &UiConfig, message: &str) -> String {
    fill_template(
        templates::NOT_FOUND_TEMPLATE,
        &[
            ("title", html_escape(&ui.title).as_str()),
            ("message", html_escape(message).as_str()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collapse::MemoryStore;
    use crate::hierarchy::build_forest;
    use crate::types::Task;

    fn task(id: i64, parent_id: Option<i64>, text: &str) -> Task {
        Task {
            id,
            text: text.to_string(),
            completed: false,
            parent_id,
            created_at: id,
            updated_at: id,
        }
    }

    fn cache() -> CollapseCache<MemoryStore> {
        CollapseCache::load(MemoryStore::new()).unwrap()
    }

    #[test]
    fn escapes_html() {
        assert_eq!(html_escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn empty_forest_shows_empty_state() {
        assert!(render_forest(&Vec::new(), &cache()).contains("No tasks yet!"));
    }

    #[test]
    fn parent_gets_badge_toggle_and_collapsed_children() {
        let forest = build_forest(vec![task(1, None, "Parent"), task(2, Some(1), "Child")]);
        let html = render_forest(&forest, &cache());

        assert!(html.contains("todo-item parent-todo"));
        assert!(html.contains("todo-item nested-todo"));
        assert!(html.contains("1 subtask<"));
        assert!(html.contains("collapse-toggle"));
        assert!(html.contains("nested-indicator"));
        assert!(html.contains("ps-5"));
        assert!(html.contains(r#"class="children collapsed" id="children-1""#));
        assert!(html.contains("/toggle_with_children/1"));
    }

    #[test]
    fn expanded_state_is_applied() {
        let forest = build_forest(vec![task(1, None, "Parent"), task(2, Some(1), "Child")]);
        let mut collapse = cache();
        collapse.set_state(1, false).unwrap();

        let html = render_forest(&forest, &collapse);
        assert!(html.contains(r#"class="children" id="children-1""#));
        assert!(html.contains(r#"aria-expanded="true""#));
    }

    #[test]
    fn children_are_nested_inside_parent_container() {
        let forest = build_forest(vec![
            task(1, None, "A"),
            task(2, Some(1), "B"),
            task(3, None, "C"),
        ]);
        let html = render_forest(&forest, &cache());

        let open = html.find("children-1").unwrap();
        let child = html.find(">B<").unwrap();
        let sibling = html.find(">C<").unwrap();
        assert!(open < child && child < sibling);
        assert_eq!(html.matches("<div").count(), html.matches("</div>").count());
    }

    #[test]
    fn completed_task_is_checked_and_struck_through() {
        let mut done = task(1, None, "Done");
        done.completed = true;
        let html = render_forest(&build_forest(vec![done]), &cache());

        assert!(html.contains("todo-item parent-todo completed"));
        assert!(html.contains(" checked>"));
        assert!(html.contains("text-decoration-line-through"));
    }

    #[test]
    fn task_text_is_escaped() {
        let html = render_forest(&build_forest(vec![task(1, None, "<script>")]), &cache());
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn flash_uses_bootstrap_alert_classes() {
        let html = render_flash(Some(&Flash::error("Please enter a task!")));
        assert!(html.contains("alert-danger"));
        assert!(html.contains("btn-close"));
        assert_eq!(render_flash(None), "");
    }

    #[test]
    fn subtask_labels() {
        assert_eq!(subtask_label(1), "1 subtask");
        assert_eq!(subtask_label(2), "2 subtasks");
    }

    #[test]
    fn fill_template_does_not_rescan_inserted_values() {
        let out = fill_template(
            "<p>{{flash}}</p><ul>{{tasks}}</ul>{{unknown}}",
            &[("flash", "{{tasks}}"), ("tasks", "<li>secret</li>")],
        );
        assert_eq!(out, "<p>{{tasks}}</p><ul><li>secret</li></ul>{{unknown}}");
    }

    #[test]
    fn fill_template_keeps_unterminated_braces() {
        assert_eq!(fill_template("a {{b", &[("b", "x")]), "a {{b");
    }

    #[test]
    fn placeholder_in_flash_text_is_not_expanded() {
        let forest = build_forest(vec![task(1, None, "Private task")]);
        let flash = Flash::info("{{tasks}} {{stats}}");
        let html = render_index(
            &UiConfig::default(),
            &forest,
            TaskStats { total: 1, completed: 0 },
            &cache(),
            Some(&flash),
        );

        let alert = html
            .split(r#"role="alert">"#)
            .nth(1)
            .and_then(|rest| rest.split("<button").next())
            .unwrap();
        assert_eq!(alert, "{{tasks}} {{stats}}");
        assert!(html.contains("Private task"));
    }
}
