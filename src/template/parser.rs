//! Turns template source into a node tree.

use super::{Result, TemplateError};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),

    /// `{{path}}` when `escape` is set, `{{{path}}}` otherwise.
    Var { path: String, escape: bool },

    /// `#if` keeps its branches in order; `#unless` is stored with them
    /// swapped.
    If {
        path: String,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },

    /// `{{#each path as alias}}`
    Each {
        path: String,
        alias: String,
        body: Vec<Node>,
    },
}

/// Parse a whole template.
pub fn parse(source: &str) -> Result<Vec<Node>> {
    let mut parser = Parser { rest: source };
    let (nodes, end) = parser.nodes()?;
    match end {
        End::Eof => Ok(nodes),
        End::Else => Err(syntax("else outside of a block")),
        End::Close(name) => Err(syntax(format!("unexpected /{name}"))),
    }
}

fn syntax(message: impl Into<String>) -> TemplateError {
    TemplateError::Parse(message.into())
}

enum Tag<'a> {
    Var(&'a str),
    Raw(&'a str),
    Open(&'a str, &'a str),
    Else,
    Close(&'a str),
}

/// What stopped a run of nodes.
enum End<'a> {
    Eof,
    Else,
    Close(&'a str),
}

struct Parser<'a> {
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn nodes(&mut self) -> Result<(Vec<Node>, End<'a>)> {
        let mut nodes = Vec::new();
        loop {
            let Some(start) = self.rest.find("{{") else {
                push_text(&mut nodes, self.rest);
                self.rest = "";
                return Ok((nodes, End::Eof));
            };
            push_text(&mut nodes, &self.rest[..start]);
            self.rest = &self.rest[start..];

            match self.tag()? {
                Tag::Var(path) => nodes.push(Node::Var {
                    path: path.to_string(),
                    escape: true,
                }),
                Tag::Raw(path) => nodes.push(Node::Var {
                    path: path.to_string(),
                    escape: false,
                }),
                Tag::Open(name, args) => nodes.push(self.block(name, args)?),
                Tag::Else => return Ok((nodes, End::Else)),
                Tag::Close(name) => return Ok((nodes, End::Close(name))),
            }
        }
    }

    /// Consume the tag at the start of `rest`.
    fn tag(&mut self) -> Result<Tag<'a>> {
        let rest = self.rest;
        let raw = rest.starts_with("{{{");
        let (open, close) = if raw { (3, "}}}") } else { (2, "}}") };

        let Some(len) = rest[open..].find(close) else {
            let preview: String = rest.chars().take(20).collect();
            return Err(syntax(format!("unterminated tag '{preview}'")));
        };
        let inner = rest[open..open + len].trim();
        self.rest = &rest[open + len + close.len()..];

        if raw {
            return Ok(Tag::Raw(variable(inner)?));
        }
        if let Some(block) = inner.strip_prefix('#') {
            let (name, args) = block.split_once(char::is_whitespace).unwrap_or((block, ""));
            return Ok(Tag::Open(name, args.trim()));
        }
        if let Some(name) = inner.strip_prefix('/') {
            return Ok(Tag::Close(name.trim()));
        }
        if inner == "else" {
            return Ok(Tag::Else);
        }
        Ok(Tag::Var(variable(inner)?))
    }

    fn block(&mut self, name: &'a str, args: &'a str) -> Result<Node> {
        match name {
            "if" | "unless" => {
                let path = variable(args)?.to_string();
                let (first, end) = self.nodes()?;
                let second = match end {
                    End::Else => {
                        let (nodes, end) = self.nodes()?;
                        closes(name, end)?;
                        nodes
                    }
                    end => {
                        closes(name, end)?;
                        Vec::new()
                    }
                };
                let (then, otherwise) = if name == "if" {
                    (first, second)
                } else {
                    (second, first)
                };
                Ok(Node::If {
                    path,
                    then,
                    otherwise,
                })
            }
            "each" => {
                let words: Vec<&str> = args.split_whitespace().collect();
                let [list, "as", alias] = words.as_slice() else {
                    return Err(syntax(format!("expected '#each list as item', got '#each {args}'")));
                };
                let path = variable(list)?.to_string();
                let alias = variable(alias)?.to_string();
                let (body, end) = self.nodes()?;
                closes(name, end)?;
                Ok(Node::Each { path, alias, body })
            }
            _ => Err(syntax(format!("unknown block #{name}"))),
        }
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

/// Check that a run of nodes inside block `name` ended with its closing tag.
fn closes(name: &str, end: End<'_>) -> Result<()> {
    match end {
        End::Close(found) if found == name => Ok(()),
        End::Close(found) => Err(syntax(format!("#{name} closed by /{found}"))),
        End::Else => Err(syntax(format!("second else in #{name}"))),
        End::Eof => Err(syntax(format!("unclosed #{name}"))),
    }
}

/// Variable names are dotted paths of word characters.
fn variable(name: &str) -> Result<&str> {
    let valid = !name.is_empty()
        && name
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_'));
    if valid {
        Ok(name)
    } else {
        Err(syntax(format!("invalid variable name '{name}'")))
    }
}
