//! Walks a node tree and writes HTML.

use super::parser::Node;
use super::{escape_html, Result, TemplateContext, TemplateError, Value};

/// Renders nodes against a context.
///
/// `#each` aliases live on a stack that shadows the context, so loops
/// never copy the context.
pub struct Renderer<'a> {
    context: &'a TemplateContext,
    aliases: Vec<(&'a str, &'a Value)>,
    output: String,
}

impl<'a> Renderer<'a> {
    pub fn new(context: &'a TemplateContext) -> Self {
        Self {
            context,
            aliases: Vec::new(),
            output: String::new(),
        }
    }

    pub fn render(mut self, nodes: &'a [Node]) -> Result<String> {
        self.write_nodes(nodes)?;
        Ok(self.output)
    }

    fn write_nodes(&mut self, nodes: &'a [Node]) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => self.output.push_str(text),
                Node::Var { path, escape } => {
                    if let Some(value) = self.lookup(path) {
                        let text = value.as_text();
                        if *escape {
                            self.output.push_str(&escape_html(&text));
                        } else {
                            self.output.push_str(&text);
                        }
                    }
                }
                Node::If {
                    path,
                    then,
                    otherwise,
                } => {
                    if self.lookup(path).is_some_and(Value::is_truthy) {
                        self.write_nodes(then)?;
                    } else {
                        self.write_nodes(otherwise)?;
                    }
                }
                Node::Each { path, alias, body } => self.write_each(path, alias, body)?,
            }
        }
        Ok(())
    }

    fn write_each(&mut self, path: &str, alias: &'a str, body: &'a [Node]) -> Result<()> {
        let items = match self.lookup(path) {
            Some(Value::List(items)) => items,
            Some(Value::Null) | None => return Ok(()),
            Some(_) => return Err(TemplateError::Render(format!("'{path}' is not a list"))),
        };

        for item in items {
            self.aliases.push((alias, item));
            let written = self.write_nodes(body);
            self.aliases.pop();
            written?;
        }
        Ok(())
    }

    /// Resolve a path against the innermost matching alias, then the context.
    fn lookup(&self, path: &str) -> Option<&'a Value> {
        let (root, rest) = match path.split_once('.') {
            Some((root, rest)) => (root, Some(rest)),
            None => (path, None),
        };

        let alias = self
            .aliases
            .iter()
            .rev()
            .find(|(name, _)| *name == root)
            .map(|&(_, value)| value);

        match (alias, rest) {
            (Some(value), Some(rest)) => value.get_path(rest),
            (Some(value), None) => Some(value),
            (None, _) => self.context.get(path),
        }
    }
}
