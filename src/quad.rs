//! Quads, quad patterns and index key layouts

use crate::value::{Value, ValueError, ValueResult, TAG_NONE};
use serde::Serialize;
use std::fmt;

/// A (subject, predicate, object, label) statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Quad {
    pub subject: Value,
    pub predicate: Value,
    pub object: Value,
    /// Named sub-graph (None = default graph)
    pub label: Option<Value>,
}

impl Quad {
    /// Create a new quad
    pub fn new(subject: Value, predicate: Value, object: Value, label: Option<Value>) -> Self {
        Self {
            subject,
            predicate,
            object,
            label,
        }
    }

    /// Build a quad from anything convertible into values.
    ///
    /// Plain strings become string literals, so node positions usually get an
    /// explicit [`Value::iri`]. The label is a string literal; an empty label
    /// means the default graph.
    pub fn make(
        subject: impl Into<Value>,
        predicate: impl Into<Value>,
        object: impl Into<Value>,
        label: &str,
    ) -> Self {
        let label = (!label.is_empty()).then(|| Value::string(label));
        Self::new(subject.into(), predicate.into(), object.into(), label)
    }

    /// Build a quad where every position, label included, is a named node
    pub fn raw(subject: &str, predicate: &str, object: &str, label: &str) -> Self {
        let label = (!label.is_empty()).then(|| Value::iri(label));
        Self::new(
            Value::iri(subject),
            Value::iri(predicate),
            Value::iri(object),
            label,
        )
    }

    /// True when subject, predicate and object are all non-empty
    pub fn is_complete(&self) -> bool {
        !is_empty_node(&self.subject) && !is_empty_node(&self.predicate) && !is_empty_node(&self.object)
    }
}

fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Iri(s) | Value::BlankNode(s) => s.is_empty(),
        Value::Literal(_) => false,
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{} {} {} {} .", self.subject, self.predicate, self.object, label)
        } else {
            write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
        }
    }
}

/// Quad pattern for lookups (None = any)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuadPattern {
    pub subject: Option<Value>,
    pub predicate: Option<Value>,
    pub object: Option<Value>,
    /// Label (None = any, Some(None) = default graph)
    pub label: Option<Option<Value>>,
}

impl QuadPattern {
    /// Pattern matching every quad
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_subject(mut self, subject: Value) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_predicate(mut self, predicate: Value) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_object(mut self, object: Value) -> Self {
        self.object = Some(object);
        self
    }

    pub fn with_label(mut self, label: Option<Value>) -> Self {
        self.label = Some(label);
        self
    }

    /// Check if a quad matches this pattern
    pub fn matches(&self, quad: &Quad) -> bool {
        if let Some(ref s) = self.subject {
            if s != &quad.subject {
                return false;
            }
        }
        if let Some(ref p) = self.predicate {
            if p != &quad.predicate {
                return false;
            }
        }
        if let Some(ref o) = self.object {
            if o != &quad.object {
                return false;
            }
        }
        if let Some(ref l) = self.label {
            if l != &quad.label {
                return false;
            }
        }
        true
    }
}

/// Position of a term inside a quad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Subject,
    Predicate,
    Object,
    Label,
}

/// Sorted index permutations maintained by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Subject-Predicate-Object-Label
    Spol,
    /// Predicate-Object-Subject-Label
    Posl,
    /// Object-Subject-Predicate-Label
    Ospl,
    /// Label-Subject-Predicate-Object
    Lspo,
}

impl IndexKind {
    pub const ALL: [IndexKind; 4] = [IndexKind::Spol, IndexKind::Posl, IndexKind::Ospl, IndexKind::Lspo];

    /// Column family / keyspace name
    pub fn name(&self) -> &'static str {
        match self {
            IndexKind::Spol => "spol",
            IndexKind::Posl => "posl",
            IndexKind::Ospl => "ospl",
            IndexKind::Lspo => "lspo",
        }
    }

    fn slots(&self) -> [Slot; 4] {
        use Slot::*;
        match self {
            IndexKind::Spol => [Subject, Predicate, Object, Label],
            IndexKind::Posl => [Predicate, Object, Subject, Label],
            IndexKind::Ospl => [Object, Subject, Predicate, Label],
            IndexKind::Lspo => [Label, Subject, Predicate, Object],
        }
    }

    /// Encode the index key of a quad
    pub fn key(&self, quad: &Quad) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        for slot in self.slots() {
            match slot {
                Slot::Subject => quad.subject.encode_into(&mut buf),
                Slot::Predicate => quad.predicate.encode_into(&mut buf),
                Slot::Object => quad.object.encode_into(&mut buf),
                Slot::Label => encode_label(quad.label.as_ref(), &mut buf),
            }
        }
        buf
    }

    /// Decode an index key back into its quad
    pub fn decode(&self, key: &[u8]) -> ValueResult<Quad> {
        let mut rest = key;
        let mut subject = None;
        let mut predicate = None;
        let mut object = None;
        let mut label = None;
        for slot in self.slots() {
            let used = match slot {
                Slot::Label => {
                    let (value, used) = decode_label(rest)?;
                    label = value;
                    used
                }
                term => {
                    let (value, used) = Value::decode_prefix(rest)?;
                    match term {
                        Slot::Subject => subject = Some(value),
                        Slot::Predicate => predicate = Some(value),
                        _ => object = Some(value),
                    }
                    used
                }
            };
            rest = &rest[used..];
        }
        if !rest.is_empty() {
            return Err(ValueError::InvalidEncoding(format!(
                "{} trailing bytes in {} key",
                rest.len(),
                self.name()
            )));
        }
        match (subject, predicate, object) {
            (Some(s), Some(p), Some(o)) => Ok(Quad::new(s, p, o, label)),
            _ => Err(ValueError::InvalidEncoding(format!("incomplete {} key", self.name()))),
        }
    }

    /// Number of leading slots of this index bound by the pattern
    fn bound_prefix_len(&self, pattern: &QuadPattern) -> usize {
        self.slots()
            .iter()
            .take_while(|slot| match slot {
                Slot::Subject => pattern.subject.is_some(),
                Slot::Predicate => pattern.predicate.is_some(),
                Slot::Object => pattern.object.is_some(),
                Slot::Label => pattern.label.is_some(),
            })
            .count()
    }

    /// Pick the index with the longest bound prefix for a pattern and build
    /// the scan prefix for it.
    pub fn plan(pattern: &QuadPattern) -> (IndexKind, Vec<u8>) {
        let index = IndexKind::ALL
            .into_iter()
            .max_by_key(|index| (index.bound_prefix_len(pattern), std::cmp::Reverse(*index as u8)))
            .unwrap_or(IndexKind::Spol);
        let mut prefix = Vec::new();
        for slot in index.slots().into_iter().take(index.bound_prefix_len(pattern)) {
            match slot {
                Slot::Subject => pattern.subject.as_ref().map(|v| v.encode_into(&mut prefix)),
                Slot::Predicate => pattern.predicate.as_ref().map(|v| v.encode_into(&mut prefix)),
                Slot::Object => pattern.object.as_ref().map(|v| v.encode_into(&mut prefix)),
                Slot::Label => pattern.label.as_ref().map(|l| encode_label(l.as_ref(), &mut prefix)),
            };
        }
        (index, prefix)
    }
}

fn encode_label(label: Option<&Value>, buf: &mut Vec<u8>) {
    match label {
        Some(value) => value.encode_into(buf),
        None => buf.push(TAG_NONE),
    }
}

fn decode_label(bytes: &[u8]) -> ValueResult<(Option<Value>, usize)> {
    match bytes.first() {
        Some(&TAG_NONE) => Ok((None, 1)),
        _ => Value::decode_prefix(bytes).map(|(v, used)| (Some(v), used)),
    }
}
