//! Page templates embedded in the binary.

use super::{Result, TemplateContext, TemplateEngine, Value};

const LAYOUT: &str = "layout";

/// Built-in page templates, by name.
const PAGES: &[(&str, &str)] = &[
    (LAYOUT, include_str!("../../templates/layout.html")),
    ("register", include_str!("../../templates/register.html")),
    ("login", include_str!("../../templates/login.html")),
    ("index", include_str!("../../templates/index.html")),
    ("entries", include_str!("../../templates/entries.html")),
    ("feeds", include_str!("../../templates/feeds.html")),
    ("error", include_str!("../../templates/error.html")),
];

/// Renders pages inside the shared layout.
#[derive(Debug)]
pub struct PageRenderer {
    engine: TemplateEngine,
}

impl PageRenderer {
    /// Parse every built-in page.
    pub fn new() -> Result<Self> {
        let mut engine = TemplateEngine::new();
        for (name, content) in PAGES {
            engine.load(*name, content)?;
        }
        Ok(Self { engine })
    }

    /// Render `page` with `context`, then wrap it in the layout.
    ///
    /// The layout sees the same context plus `title` and the rendered
    /// page as `body`.
    pub fn render(&self, page: &str, title: &str, context: &TemplateContext) -> Result<String> {
        let body = self.engine.render(page, context)?;

        let mut layout_context = context.clone();
        layout_context.set("title", title);
        layout_context.set("body", Value::String(body));
        self.engine.render(LAYOUT, &layout_context)
    }
}
