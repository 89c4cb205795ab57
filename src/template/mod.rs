//! HTML templates for the web pages.
//!
//! The syntax is a small Handlebars subset:
//!
//! - `{{entry.title}}` inserts a value, HTML-escaped
//! - `{{{body}}}` inserts a value as is
//! - `{{#if flag}}...{{else}}...{{/if}}` and `{{#unless flag}}...{{/unless}}`
//! - `{{#each entries as e}}...{{/each}}` binds each list item to `e`
//!
//! Missing values render as nothing and are falsy.
//!
//! ```
//! use mureader::template::{TemplateContext, TemplateEngine};
//!
//! let mut engine = TemplateEngine::new();
//! engine.load("greeting", "<p>Hello, {{name}}!</p>").unwrap();
//!
//! let mut context = TemplateContext::new();
//! context.set("name", "<World>");
//!
//! let html = engine.render("greeting", &context).unwrap();
//! assert_eq!(html, "<p>Hello, &lt;World&gt;!</p>");
//! ```

mod pages;
mod parser;
mod renderer;

use std::borrow::Cow;
use std::collections::HashMap;

use thiserror::Error;

pub use pages::PageRenderer;

use parser::Node;
use renderer::Renderer;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template syntax error: {0}")]
    Parse(String),

    #[error("Template render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, TemplateError>;

/// Escape text for element content or a double-quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Data handed to a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(i64),
    Bool(bool),
    List(Vec<Value>),
    Object(HashMap<String, Value>),
    Null,
}

impl Value {
    /// Text inserted for this value. Only scalars produce output.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::String(s) => Cow::Borrowed(s),
            Value::Number(n) => Cow::Owned(n.to_string()),
            Value::Bool(true) => Cow::Borrowed("true"),
            Value::Bool(false) => Cow::Borrowed("false"),
            Value::List(_) | Value::Object(_) | Value::Null => Cow::Borrowed(""),
        }
    }

    /// Empty strings, zero, `false`, empty collections and null are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0,
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
            Value::Object(fields) => !fields.is_empty(),
            Value::Null => false,
        }
    }

    /// Follow `a.b.c` through nested objects.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |value, key| match value {
            Value::Object(fields) => fields.get(key),
            _ => None,
        })
    }

    pub fn object<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Named values available to a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    variables: HashMap<String, Value>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Look up `name` or a dotted path such as `entry.url`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        match path.split_once('.') {
            Some((root, rest)) => self.variables.get(root)?.get_path(rest),
            None => self.variables.get(path),
        }
    }
}

/// Parsed templates by name.
#[derive(Debug, Default)]
pub struct TemplateEngine {
    templates: HashMap<String, Vec<Node>>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` and store it under `name`.
    pub fn load(&mut self, name: impl Into<String>, source: &str) -> Result<()> {
        let nodes = parser::parse(source)?;
        self.templates.insert(name.into(), nodes);
        Ok(())
    }

    pub fn render(&self, name: &str, context: &TemplateContext) -> Result<String> {
        let nodes = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        Renderer::new(context).render(nodes)
    }
}
