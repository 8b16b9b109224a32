//! Path expressions
//!
//! A [`Path`] is an immutable chain of traversal steps hanging off a set of
//! seed nodes. Every chaining call returns a new path sharing its
//! predecessor, so one prefix can be extended along several branches:
//!
//! ```rust
//! use quadpath::{QuadStore, Quad, Value, start_path};
//!
//! let store = QuadStore::memory(true, true).unwrap();
//! store.add_quad(Quad::make(Value::iri("c1"), Value::iri("bought"), Value::iri("p1"), "sales")).unwrap();
//!
//! let customer = start_path(&store, [Value::iri("c1")]);
//! let products = customer.out([Value::iri("bought")]);
//! let tagged = products.tag("product");
//!
//! assert_eq!(products.count().unwrap(), 1);
//! tagged.each_binding_row(|row| {
//!     assert_eq!(row.get("product"), Some(&Value::iri("p1")));
//! }).unwrap();
//! ```

use crate::eval::{self, BindingRow, EvalOptions, PathResult, RowSequence};
use crate::store::QuadStore;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Direction of a traversal step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Subject to object
    Out,
    /// Object to subject
    In,
}

/// One step of a path expression
#[derive(Debug, Clone)]
pub enum Step {
    /// Seed nodes
    Start(Vec<Value>),
    /// Follow edges, optionally tagging the traversed predicate
    Traverse {
        direction: Direction,
        /// Empty = any predicate
        predicates: Vec<Value>,
        tags: Vec<String>,
    },
    /// Bind the current node
    Tag(String),
    /// Bind the object of (node, predicate, _, _) if there is one
    Save { predicate: Value, tag: String },
    /// Drop nodes reachable through another path over the store `store_id`
    Except { path: Arc<PathNode>, store_id: Uuid },
    /// Keep the first pair seen for each node
    Unique,
    /// Keep nodes with a (node, predicate, object, _) quad
    Has { predicate: Value, object: Value },
}

/// A step linked to its predecessor
#[derive(Debug)]
pub struct PathNode {
    pub(crate) step: Step,
    pub(crate) prev: Option<Arc<PathNode>>,
}

impl PathNode {
    /// Steps from the start to this node, in evaluation order
    pub(crate) fn steps(self: &Arc<Self>) -> Vec<&Step> {
        let mut steps = Vec::new();
        let mut cursor: Option<&PathNode> = Some(self.as_ref());
        while let Some(node) = cursor {
            steps.push(&node.step);
            cursor = node.prev.as_deref();
        }
        steps.reverse();
        steps
    }
}

/// Immutable path expression bound to the store it traverses
#[derive(Clone)]
pub struct Path<'s> {
    store: &'s QuadStore,
    node: Arc<PathNode>,
}

/// Start a path from the given seed nodes
pub fn start_path<'s>(store: &'s QuadStore, seeds: impl IntoIterator<Item = Value>) -> Path<'s> {
    Path::start(store, seeds)
}

/// Drive a path to completion, calling `f` with every binding row
pub fn each_binding_row<F>(path: &Path<'_>, f: F) -> PathResult<()>
where
    F: FnMut(&BindingRow),
{
    path.each_binding_row(f)
}

impl<'s> Path<'s> {
    /// Start a path from the given seed nodes
    pub fn start(store: &'s QuadStore, seeds: impl IntoIterator<Item = Value>) -> Self {
        let seeds = store.fixed(seeds).into_values();
        Self {
            store,
            node: Arc::new(PathNode {
                step: Step::Start(seeds),
                prev: None,
            }),
        }
    }

    fn then(&self, step: Step) -> Self {
        Self {
            store: self.store,
            node: Arc::new(PathNode {
                step,
                prev: Some(Arc::clone(&self.node)),
            }),
        }
    }

    fn traverse(&self, direction: Direction, tags: Vec<String>, predicates: Vec<Value>) -> Self {
        let mut unique_predicates: Vec<Value> = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            if !unique_predicates.contains(&predicate) {
                unique_predicates.push(predicate);
            }
        }
        self.then(Step::Traverse {
            direction,
            predicates: unique_predicates,
            tags,
        })
    }

    /// Follow outgoing edges with any of the predicates (any predicate if none)
    pub fn out(&self, predicates: impl IntoIterator<Item = Value>) -> Self {
        self.traverse(Direction::Out, Vec::new(), predicates.into_iter().collect())
    }

    /// Follow incoming edges with any of the predicates (any predicate if none)
    pub fn r#in(&self, predicates: impl IntoIterator<Item = Value>) -> Self {
        self.traverse(Direction::In, Vec::new(), predicates.into_iter().collect())
    }

    /// Like [`Path::out`], also binding the traversed predicate under each tag
    pub fn out_with_tags<T: Into<String>>(
        &self,
        tags: impl IntoIterator<Item = T>,
        predicates: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.traverse(
            Direction::Out,
            tags.into_iter().map(Into::into).collect(),
            predicates.into_iter().collect(),
        )
    }

    /// Like [`Path::r#in`], also binding the traversed predicate under each tag
    pub fn in_with_tags<T: Into<String>>(
        &self,
        tags: impl IntoIterator<Item = T>,
        predicates: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.traverse(
            Direction::In,
            tags.into_iter().map(Into::into).collect(),
            predicates.into_iter().collect(),
        )
    }

    /// Bind the current node under `name`
    pub fn tag(&self, name: impl Into<String>) -> Self {
        self.then(Step::Tag(name.into()))
    }

    /// Bind the object of (node, predicate, _, _) under `name`, leaving the
    /// current node unchanged. Rows without such a quad omit `name`.
    pub fn save(&self, predicate: Value, name: impl Into<String>) -> Self {
        self.then(Step::Save {
            predicate,
            tag: name.into(),
        })
    }

    /// Drop nodes that `other`, evaluated from its own seeds, reaches.
    ///
    /// `other` must traverse the same store (or a clone of its handle);
    /// otherwise evaluation fails with
    /// [`StoreMismatch`](crate::eval::PathError::StoreMismatch).
    pub fn except(&self, other: &Path<'_>) -> Self {
        self.then(Step::Except {
            path: Arc::clone(&other.node),
            store_id: other.store.id(),
        })
    }

    /// Keep only the first pair for every distinct node
    pub fn unique(&self) -> Self {
        self.then(Step::Unique)
    }

    /// Keep nodes N with a quad (N, predicate, object, _)
    pub fn has(&self, predicate: Value, object: Value) -> Self {
        self.then(Step::Has { predicate, object })
    }

    /// Store this path traverses
    pub fn store(&self) -> &'s QuadStore {
        self.store
    }

    /// Steps in evaluation order
    pub fn steps(&self) -> Vec<&Step> {
        self.node.steps()
    }

    pub(crate) fn root(&self) -> &Arc<PathNode> {
        &self.node
    }

    /// Evaluate without a budget
    pub fn evaluate(&self) -> PathResult<RowSequence<'s>> {
        self.evaluate_with(EvalOptions::default())
    }

    /// Evaluate with the given budget
    pub fn evaluate_with(&self, options: EvalOptions) -> PathResult<RowSequence<'s>> {
        eval::evaluate_with(self, options)
    }

    /// Drive the evaluation to completion, calling `f` with every row.
    ///
    /// Without a budget the only errors are store failures, unknown start
    /// nodes and `except` operands built on another store.
    pub fn each_binding_row<F>(&self, mut f: F) -> PathResult<()>
    where
        F: FnMut(&BindingRow),
    {
        for row in self.evaluate()? {
            f(&row?);
        }
        Ok(())
    }

    /// Nodes of the final frontier, in evaluation order
    pub fn nodes(&self) -> PathResult<Vec<Value>> {
        self.evaluate()?.into_nodes()
    }

    /// Number of pairs in the final frontier
    pub fn count(&self) -> PathResult<usize> {
        Ok(self.nodes()?.len())
    }
}

impl fmt::Debug for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Path").field("steps", &self.steps()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_is_persistent() {
        let store = QuadStore::memory(true, true).unwrap();
        let base = start_path(&store, [Value::iri("c1")]);
        let products = base.out([Value::iri("bought")]);
        let groups = products.out([Value::iri("in_group")]).unique();
        let tagged = products.tag("product");

        assert_eq!(base.steps().len(), 1);
        assert_eq!(products.steps().len(), 2);
        assert_eq!(groups.steps().len(), 4);
        assert_eq!(tagged.steps().len(), 3);
        assert!(matches!(tagged.steps()[2], Step::Tag(name) if name == "product"));
    }

    #[test]
    fn test_duplicate_predicates_collapse() {
        let store = QuadStore::memory(true, true).unwrap();
        let path = start_path(&store, [Value::iri("a")])
            .out([Value::iri("knows"), Value::iri("knows")]);
        match path.steps()[1] {
            Step::Traverse { predicates, .. } => assert_eq!(predicates.len(), 1),
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_with_tags_records_tag_names() {
        let store = QuadStore::memory(true, true).unwrap();
        let path = start_path(&store, [Value::iri("a")]).in_with_tags(["predicate"], []);
        match path.steps()[1] {
            Step::Traverse { direction, predicates, tags } => {
                assert_eq!(*direction, Direction::In);
                assert!(predicates.is_empty());
                assert_eq!(tags, &vec!["predicate".to_string()]);
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_except_records_operand_store() {
        let store = QuadStore::memory(true, true).unwrap();
        let other_store = QuadStore::memory(true, true).unwrap();
        let base = start_path(&store, [Value::iri("a")]);
        let path = base
            .except(&start_path(&store.clone(), [Value::iri("b")]))
            .except(&start_path(&other_store, [Value::iri("c")]));
        let ids: Vec<Uuid> = path
            .steps()
            .into_iter()
            .filter_map(|step| match step {
                Step::Except { store_id, .. } => Some(*store_id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![store.id(), other_store.id()]);
    }
}
