//! Parse tree → command descriptor.
//!
//! Pure syntax translation: quoted strings are unescaped, numbers typed,
//! delta markers kept as values. Nothing here knows what a command means.

use std::fmt;

use super::grammar::{Arg, Node, ParseTree};

/// A typed argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Int(i64),
    List(Vec<Value>),
    Add(Box<Value>),
    Sub(Box<Value>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Scalar rendered as text; lists and deltas have no text form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Int(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Add(inner) => write!(f, "+{inner}"),
            Self::Sub(inner) => write!(f, "-{inner}"),
        }
    }
}

/// One argument in command order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Free(Value),
    Named(String, Vec<Value>),
}

/// Command name plus its arguments, in the order they were typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: String,
    pub args: Vec<Argument>,
}

impl CommandDescriptor {
    pub fn free(&self) -> impl Iterator<Item = &Value> {
        self.args.iter().filter_map(|arg| match arg {
            Argument::Free(value) => Some(value),
            Argument::Named(..) => None,
        })
    }

    /// Named arguments with repeated keys concatenated, in first-seen order.
    pub fn named(&self) -> Vec<(String, Vec<Value>)> {
        let mut named: Vec<(String, Vec<Value>)> = Vec::new();
        for arg in &self.args {
            let Argument::Named(key, values) = arg else {
                continue;
            };
            match named.iter_mut().find(|(k, _)| k == key) {
                Some((_, existing)) => existing.extend(values.iter().cloned()),
                None => named.push((key.clone(), values.clone())),
            }
        }
        named
    }
}

pub fn normalize(tree: &ParseTree<'_>) -> CommandDescriptor {
    CommandDescriptor {
        name: tree.name.to_string(),
        args: tree
            .body
            .iter()
            .map(|arg| match arg {
                Arg::Item(node) => Argument::Free(value(node)),
                Arg::Binding(key, nodes) => {
                    Argument::Named(key.to_string(), nodes.iter().map(value).collect())
                }
            })
            .collect(),
    }
}

fn value(node: &Node<'_>) -> Value {
    match node {
        Node::Word(word) => Value::Text(word.to_string()),
        Node::Quoted(raw) => Value::Text(unescape(raw)),
        // Digit runs too long for i64 stay text
        Node::Number(digits) => digits
            .parse()
            .map_or_else(|_| Value::Text(digits.to_string()), Value::Int),
        Node::List(items) => Value::List(items.iter().map(value).collect()),
        Node::Add(inner) => Value::Add(Box::new(value(inner))),
        Node::Sub(inner) => Value::Sub(Box::new(value(inner))),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}
