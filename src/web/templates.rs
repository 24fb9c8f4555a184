//! HTML templates and static assets.
//!
//! Embedded at compile time using `include_str!`; placeholders of the form
//! `{{name}}` are filled in by the render module.

/// The task list page.
pub const INDEX_TEMPLATE: &str = include_str!("templates/index.html");

/// The about page.
pub const ABOUT_TEMPLATE: &str = include_str!("templates/about.html");

/// Shown for unknown routes and missing tasks.
pub const NOT_FOUND_TEMPLATE: &str = include_str!("templates/not_found.html");

/// Custom styles layered over Bootstrap.
pub const STYLE_CSS: &str = include_str!("static/style.css");

/// Client-side interactivity: inline edit, collapse state, shortcuts.
pub const APP_JS: &str = include_str!("static/app.js");
