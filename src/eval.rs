//! Path evaluation (Volcano iterator model)
//!
//! A path is compiled into a chain of pull operators, one per step. The
//! caller drives the chain through [`RowSequence`]; each pull walks back to
//! the seed scan only as far as needed to produce the next frontier pair.
//! Every operator preserves the order of its input, so the rows come out in
//! the same order a breadth-first, step-at-a-time expansion would list them.

use crate::path::{Direction, Path, PathNode, Step};
use crate::quad::QuadPattern;
use crate::store::{QuadIter, QuadStore, StoreError};
use crate::value::Value;
use rustc_hash::FxHashSet;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Path evaluation errors
#[derive(Error, Debug)]
pub enum PathError {
    /// Seed node absent and missing references are not ignored
    #[error("Unknown start node: {0}")]
    UnknownStartNode(String),

    /// Budget ran out; rows already produced are a partial result
    #[error("Evaluation budget exceeded after {rows} rows and {steps} steps")]
    EvaluationBudgetExceeded { rows: usize, steps: usize },

    /// An `except` operand was built on a different store
    #[error("Path over store {found} used in an evaluation over store {expected}")]
    StoreMismatch { expected: Uuid, found: Uuid },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type PathResult<T> = Result<T, PathError>;

/// Evaluation budget. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalOptions {
    /// Maximum number of rows returned
    pub max_rows: Option<usize>,
    /// Maximum number of frontier pairs produced by seed scans and traversals
    pub max_steps: Option<usize>,
}

impl EvalOptions {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

type Bindings = Arc<BTreeMap<String, Value>>;

/// One solution: tag names bound to values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingRow {
    bindings: Bindings,
}

impl BindingRow {
    pub fn get(&self, tag: &str) -> Option<&Value> {
        self.bindings.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.bindings.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings in tag name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.bindings.as_ref().clone()
    }
}

impl Serialize for BindingRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.bindings.iter())
    }
}

impl fmt::Display for BindingRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (tag, value)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", tag, value)?;
        }
        write!(f, "}}")
    }
}

/// A frontier pair
#[derive(Debug, Clone)]
struct Pair {
    node: Value,
    bindings: Bindings,
}

impl Pair {
    /// Bind a tag; rows sharing the map get their own copy first
    fn bind(&mut self, tag: &str, value: Value) {
        Arc::make_mut(&mut self.bindings).insert(tag.to_string(), value);
    }
}

/// Per-evaluation state threaded through the operators
struct EvalContext<'s> {
    store: &'s QuadStore,
    options: EvalOptions,
    steps: usize,
    rows: usize,
}

impl<'s> EvalContext<'s> {
    fn exceeded(&self) -> PathError {
        PathError::EvaluationBudgetExceeded {
            rows: self.rows,
            steps: self.steps,
        }
    }

    /// Account for one produced frontier pair
    fn step(&mut self) -> PathResult<()> {
        if let Some(max) = self.options.max_steps {
            if self.steps >= max {
                return Err(self.exceeded());
            }
        }
        self.steps += 1;
        Ok(())
    }
}

/// Pull operator: every step of a path compiles to one
trait PathOperator<'s> {
    /// Next frontier pair, or None when exhausted
    fn next(&mut self, ctx: &mut EvalContext<'s>) -> PathResult<Option<Pair>>;
}

type OperatorBox<'s> = Box<dyn PathOperator<'s> + 's>;

/// Seed nodes
struct SeedScan {
    seeds: Vec<Value>,
    current: usize,
}

impl<'s> PathOperator<'s> for SeedScan {
    fn next(&mut self, ctx: &mut EvalContext<'s>) -> PathResult<Option<Pair>> {
        let Some(seed) = self.seeds.get(self.current) else {
            return Ok(None);
        };
        ctx.step()?;
        self.current += 1;
        Ok(Some(Pair {
            node: seed.clone(),
            bindings: Bindings::default(),
        }))
    }
}

/// Out / In: one pair per matching edge. Edges are pulled from the index
/// scan one at a time, one scan per predicate.
struct TraverseOperator<'s> {
    input: OperatorBox<'s>,
    direction: Direction,
    predicates: Vec<Value>,
    tags: Vec<String>,
    current: Option<Pair>,
    edges: Option<QuadIter<'s>>,
    /// Scans opened so far for the current pair
    scans: usize,
}

impl<'s> TraverseOperator<'s> {
    fn new(input: OperatorBox<'s>, direction: Direction, predicates: Vec<Value>, tags: Vec<String>) -> Self {
        Self {
            input,
            direction,
            predicates,
            tags,
            current: None,
            edges: None,
            scans: 0,
        }
    }

    /// Next edge scan for `node`, or None once every predicate was scanned
    fn open_scan(&mut self, node: &Value, store: &'s QuadStore) -> PathResult<Option<QuadIter<'s>>> {
        let base = match self.direction {
            Direction::Out => QuadPattern::any().with_subject(node.clone()),
            Direction::In => QuadPattern::any().with_object(node.clone()),
        };
        let pattern = if self.predicates.is_empty() {
            if self.scans > 0 {
                return Ok(None);
            }
            base
        } else {
            match self.predicates.get(self.scans) {
                Some(predicate) => base.with_predicate(predicate.clone()),
                None => return Ok(None),
            }
        };
        self.scans += 1;
        Ok(Some(store.quads_matching(&pattern)?))
    }
}

impl<'s> PathOperator<'s> for TraverseOperator<'s> {
    fn next(&mut self, ctx: &mut EvalContext<'s>) -> PathResult<Option<Pair>> {
        loop {
            if let Some(edges) = self.edges.as_mut() {
                if let Some(edge) = edges.next() {
                    let edge = edge?;
                    ctx.step()?;
                    let Some(current) = self.current.as_ref() else {
                        continue;
                    };
                    let neighbor = match self.direction {
                        Direction::Out => edge.object,
                        Direction::In => edge.subject,
                    };
                    let mut pair = Pair {
                        node: neighbor,
                        bindings: Arc::clone(&current.bindings),
                    };
                    for tag in &self.tags {
                        pair.bind(tag, edge.predicate.clone());
                    }
                    trace!("{:?} {} -> {}", self.direction, current.node, pair.node);
                    return Ok(Some(pair));
                }
                self.edges = None;
            }

            if let Some(node) = self.current.as_ref().map(|pair| pair.node.clone()) {
                match self.open_scan(&node, ctx.store)? {
                    Some(edges) => {
                        self.edges = Some(edges);
                        continue;
                    }
                    None => self.current = None,
                }
            }

            match self.input.next(ctx)? {
                Some(pair) => {
                    self.current = Some(pair);
                    self.scans = 0;
                }
                None => return Ok(None),
            }
        }
    }
}

/// Bind the current node
struct TagOperator<'s> {
    input: OperatorBox<'s>,
    tag: String,
}

impl<'s> PathOperator<'s> for TagOperator<'s> {
    fn next(&mut self, ctx: &mut EvalContext<'s>) -> PathResult<Option<Pair>> {
        let Some(mut pair) = self.input.next(ctx)? else {
            return Ok(None);
        };
        let node = pair.node.clone();
        pair.bind(&self.tag, node);
        Ok(Some(pair))
    }
}

/// Bind the first object of (node, predicate, _, _)
struct SaveOperator<'s> {
    input: OperatorBox<'s>,
    predicate: Value,
    tag: String,
}

impl<'s> PathOperator<'s> for SaveOperator<'s> {
    fn next(&mut self, ctx: &mut EvalContext<'s>) -> PathResult<Option<Pair>> {
        let Some(mut pair) = self.input.next(ctx)? else {
            return Ok(None);
        };
        let pattern = QuadPattern::any()
            .with_subject(pair.node.clone())
            .with_predicate(self.predicate.clone());
        if let Some(quad) = ctx.store.first_matching(&pattern)? {
            pair.bind(&self.tag, quad.object);
        }
        Ok(Some(pair))
    }
}

/// Drop nodes reached by another path
struct ExceptOperator<'s> {
    input: OperatorBox<'s>,
    /// Taken and drained on the first pull
    other: Option<OperatorBox<'s>>,
    excluded: FxHashSet<Value>,
}

impl<'s> PathOperator<'s> for ExceptOperator<'s> {
    fn next(&mut self, ctx: &mut EvalContext<'s>) -> PathResult<Option<Pair>> {
        if let Some(mut other) = self.other.take() {
            while let Some(pair) = other.next(ctx)? {
                self.excluded.insert(pair.node);
            }
            debug!("Except: excluding {} nodes", self.excluded.len());
        }
        while let Some(pair) = self.input.next(ctx)? {
            if !self.excluded.contains(&pair.node) {
                return Ok(Some(pair));
            }
        }
        Ok(None)
    }
}

/// First pair per node
struct UniqueOperator<'s> {
    input: OperatorBox<'s>,
    seen: FxHashSet<Value>,
}

impl<'s> PathOperator<'s> for UniqueOperator<'s> {
    fn next(&mut self, ctx: &mut EvalContext<'s>) -> PathResult<Option<Pair>> {
        while let Some(pair) = self.input.next(ctx)? {
            if self.seen.insert(pair.node.clone()) {
                return Ok(Some(pair));
            }
        }
        Ok(None)
    }
}

/// Keep nodes with (node, predicate, object, _)
struct HasOperator<'s> {
    input: OperatorBox<'s>,
    predicate: Value,
    object: Value,
}

impl<'s> PathOperator<'s> for HasOperator<'s> {
    fn next(&mut self, ctx: &mut EvalContext<'s>) -> PathResult<Option<Pair>> {
        while let Some(pair) = self.input.next(ctx)? {
            let pattern = QuadPattern::any()
                .with_subject(pair.node.clone())
                .with_predicate(self.predicate.clone())
                .with_object(self.object.clone());
            if ctx.store.first_matching(&pattern)?.is_some() {
                return Ok(Some(pair));
            }
        }
        Ok(None)
    }
}

/// Seeds present in the store. Absent seeds are dropped when missing
/// references are ignored, and rejected otherwise.
fn resolve_seeds(store: &QuadStore, seeds: &[Value]) -> PathResult<Vec<Value>> {
    let mut present = Vec::with_capacity(seeds.len());
    for seed in seeds {
        if store.node_exists(seed)? {
            present.push(seed.clone());
        } else if store.ignore_missing() {
            debug!("Skipping absent start node {}", seed);
        } else {
            return Err(PathError::UnknownStartNode(seed.to_string()));
        }
    }
    Ok(present)
}

/// Compile a path into its operator chain, checking every seed set and every
/// `except` operand's store up front
fn build_pipeline<'s>(node: &Arc<PathNode>, store: &'s QuadStore) -> PathResult<OperatorBox<'s>> {
    let mut op: OperatorBox<'s> = Box::new(SeedScan {
        seeds: Vec::new(),
        current: 0,
    });
    for step in node.steps() {
        op = match step {
            Step::Start(seeds) => Box::new(SeedScan {
                seeds: resolve_seeds(store, seeds)?,
                current: 0,
            }),
            Step::Traverse {
                direction,
                predicates,
                tags,
            } => Box::new(TraverseOperator::new(op, *direction, predicates.clone(), tags.clone())),
            Step::Tag(tag) => Box::new(TagOperator { input: op, tag: tag.clone() }),
            Step::Save { predicate, tag } => Box::new(SaveOperator {
                input: op,
                predicate: predicate.clone(),
                tag: tag.clone(),
            }),
            Step::Except { path, store_id } => {
                if *store_id != store.id() {
                    return Err(PathError::StoreMismatch {
                        expected: store.id(),
                        found: *store_id,
                    });
                }
                Box::new(ExceptOperator {
                    input: op,
                    other: Some(build_pipeline(path, store)?),
                    excluded: FxHashSet::default(),
                })
            }
            Step::Unique => Box::new(UniqueOperator {
                input: op,
                seen: FxHashSet::default(),
            }),
            Step::Has { predicate, object } => Box::new(HasOperator {
                input: op,
                predicate: predicate.clone(),
                object: object.clone(),
            }),
        };
    }
    Ok(op)
}

/// Evaluate a path without a budget
pub fn evaluate<'s>(path: &Path<'s>) -> PathResult<RowSequence<'s>> {
    evaluate_with(path, EvalOptions::default())
}

/// Evaluate a path under a budget.
///
/// Fails up front with [`PathError::UnknownStartNode`] when a seed (of the
/// path or of any `except` operand) is absent and missing references are not
/// ignored.
pub fn evaluate_with<'s>(path: &Path<'s>, options: EvalOptions) -> PathResult<RowSequence<'s>> {
    let store = path.store();
    let root = build_pipeline(path.root(), store)?;
    debug!("Evaluating path with {} steps ({:?})", path.steps().len(), options);
    Ok(RowSequence {
        root,
        ctx: EvalContext {
            store,
            options,
            steps: 0,
            rows: 0,
        },
        state: SequenceState::Running,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceState {
    Running,
    Complete,
    Truncated,
    Failed,
}

/// Lazy sequence of binding rows.
///
/// When the budget runs out the sequence yields one
/// `Err(PathError::EvaluationBudgetExceeded)` and then ends; rows produced
/// before it form a valid partial result.
pub struct RowSequence<'s> {
    root: OperatorBox<'s>,
    ctx: EvalContext<'s>,
    state: SequenceState,
}

impl<'s> RowSequence<'s> {
    fn next_pair(&mut self) -> Option<PathResult<Pair>> {
        if self.state != SequenceState::Running {
            return None;
        }
        match self.root.next(&mut self.ctx) {
            Ok(Some(pair)) => {
                if let Some(max) = self.ctx.options.max_rows {
                    if self.ctx.rows >= max {
                        return Some(Err(self.truncate()));
                    }
                }
                self.ctx.rows += 1;
                Some(Ok(pair))
            }
            Ok(None) => {
                self.state = SequenceState::Complete;
                debug!(
                    "Path evaluation complete: {} rows, {} steps",
                    self.ctx.rows, self.ctx.steps
                );
                None
            }
            Err(PathError::EvaluationBudgetExceeded { .. }) => Some(Err(self.truncate())),
            Err(e) => {
                self.state = SequenceState::Failed;
                Some(Err(e))
            }
        }
    }

    fn truncate(&mut self) -> PathError {
        self.state = SequenceState::Truncated;
        warn!(
            "Path evaluation budget exhausted after {} rows and {} steps",
            self.ctx.rows, self.ctx.steps
        );
        self.ctx.exceeded()
    }

    /// True once the sequence ended without hitting the budget or an error
    pub fn is_complete(&self) -> bool {
        self.state == SequenceState::Complete
    }

    /// True once the budget cut the sequence short
    pub fn is_truncated(&self) -> bool {
        self.state == SequenceState::Truncated
    }

    /// Rows produced so far
    pub fn rows(&self) -> usize {
        self.ctx.rows
    }

    /// Frontier pairs produced so far
    pub fn steps(&self) -> usize {
        self.ctx.steps
    }

    /// Drain the sequence, keeping the rows produced before a budget cutoff
    pub fn collect_partial(mut self) -> PathResult<PartialRows> {
        let mut rows = Vec::new();
        while let Some(row) = self.next() {
            match row {
                Ok(row) => rows.push(row),
                Err(PathError::EvaluationBudgetExceeded { .. }) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(PartialRows {
            rows,
            complete: self.is_complete(),
        })
    }

    /// Drain the sequence into the final frontier's nodes
    pub fn into_nodes(mut self) -> PathResult<Vec<Value>> {
        let mut nodes = Vec::new();
        while let Some(pair) = self.next_pair() {
            nodes.push(pair?.node);
        }
        Ok(nodes)
    }
}

impl Iterator for RowSequence<'_> {
    type Item = PathResult<BindingRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_pair()
            .map(|pair| pair.map(|pair| BindingRow { bindings: pair.bindings }))
    }
}

/// Rows of a possibly truncated evaluation
#[derive(Debug, Clone, Default, Serialize)]
pub struct PartialRows {
    pub rows: Vec<BindingRow>,
    /// False when the budget cut the evaluation short
    pub complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::start_path;
    use crate::quad::Quad;

    fn iri(s: &str) -> Value {
        Value::iri(s)
    }

    fn social() -> QuadStore {
        let store = QuadStore::memory(true, true).unwrap();
        store
            .add_quads(vec![
                Quad::raw("alice", "follows", "bob", ""),
                Quad::raw("alice", "follows", "carol", ""),
                Quad::raw("bob", "follows", "carol", ""),
                Quad::raw("carol", "follows", "dave", ""),
                Quad::raw("bob", "status", "cool", "status_graph"),
                Quad::raw("dave", "status", "cool", "status_graph"),
            ])
            .unwrap();
        store
    }

    fn nodes(path: &Path<'_>) -> Vec<Value> {
        path.nodes().unwrap()
    }

    #[test]
    fn test_out_and_in() {
        let store = social();
        let alice = start_path(&store, [iri("alice")]);
        assert_eq!(nodes(&alice.out([iri("follows")])), vec![iri("bob"), iri("carol")]);
        assert_eq!(
            nodes(&start_path(&store, [iri("carol")]).r#in([iri("follows")])),
            vec![iri("alice"), iri("bob")]
        );
        assert!(nodes(&alice.out([iri("unknown")])).is_empty());
    }

    #[test]
    fn test_fan_out_keeps_duplicates_until_unique() {
        let store = social();
        let fof = start_path(&store, [iri("alice")]).out([iri("follows")]).out([iri("follows")]);
        assert_eq!(nodes(&fof), vec![iri("carol"), iri("dave")]);

        let both = start_path(&store, [iri("alice"), iri("bob")]).out([iri("follows")]);
        assert_eq!(both.count().unwrap(), 3);
        assert_eq!(nodes(&both.unique()), vec![iri("bob"), iri("carol")]);
    }

    #[test]
    fn test_tags_survive_fan_out_independently() {
        let store = social();
        let rows: Vec<BindingRow> = start_path(&store, [iri("alice")])
            .tag("source")
            .out([iri("follows")])
            .tag("friend")
            .evaluate()
            .unwrap()
            .collect::<PathResult<_>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("friend"), Some(&iri("bob")));
        assert_eq!(rows[1].get("friend"), Some(&iri("carol")));
        assert!(rows.iter().all(|r| r.get("source") == Some(&iri("alice"))));
    }

    #[test]
    fn test_tag_reuse_last_write_wins() {
        let store = social();
        let rows: Vec<BindingRow> = start_path(&store, [iri("alice")])
            .tag("here")
            .out([iri("follows")])
            .tag("here")
            .evaluate()
            .unwrap()
            .collect::<PathResult<_>>()
            .unwrap();
        assert_eq!(rows[0].get("here"), Some(&iri("bob")));
        assert_eq!(rows[0].len(), 1);
    }

    #[test]
    fn test_out_with_tags_binds_predicate() {
        let store = social();
        let mut rows = Vec::new();
        start_path(&store, [iri("bob")])
            .out_with_tags(["via"], [])
            .each_binding_row(|row| rows.push(row.clone()))
            .unwrap();
        let via: Vec<&Value> = rows.iter().filter_map(|r| r.get("via")).collect();
        assert_eq!(via, vec![&iri("follows"), &iri("status")]);
    }

    #[test]
    fn test_save_absent_omits_tag() {
        let store = social();
        let mut rows = Vec::new();
        start_path(&store, [iri("alice")])
            .out([iri("follows")])
            .save(iri("status"), "status")
            .each_binding_row(|row| rows.push(row.clone()))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("status"), Some(&iri("cool")));
        assert!(!rows[1].contains("status"));
    }

    #[test]
    fn test_has_and_except() {
        let store = social();
        let fof = start_path(&store, [iri("alice")]).out([iri("follows")]).out([iri("follows")]);
        let direct = start_path(&store, [iri("alice")]).out([iri("follows")]);
        assert_eq!(nodes(&fof.except(&direct)), vec![iri("dave")]);
        assert_eq!(nodes(&fof.has(iri("status"), iri("cool"))), vec![iri("dave")]);
    }

    #[test]
    fn test_predicates_are_scanned_in_order() {
        let store = social();
        let path = start_path(&store, [iri("bob")]).out([iri("status"), iri("follows")]);
        assert_eq!(nodes(&path), vec![iri("cool"), iri("carol")]);
        assert_eq!(path.unique().count().unwrap(), 2);
    }

    #[test]
    fn test_except_on_another_store_is_rejected() {
        let store = QuadStore::memory(true, true).unwrap();
        store
            .add_quads(vec![Quad::raw("x", "p", "y", ""), Quad::raw("x", "p", "z", "")])
            .unwrap();
        let elsewhere = QuadStore::memory(true, true).unwrap();
        elsewhere.add_quad(Quad::raw("x", "q", "w", "")).unwrap();

        let foreign = start_path(&elsewhere, [iri("x")]).out([iri("p")]);
        let result = start_path(&store, [iri("x")]).out([iri("p")]).except(&foreign).evaluate();
        match result {
            Err(PathError::StoreMismatch { expected, found }) => {
                assert_eq!(expected, store.id());
                assert_eq!(found, elsewhere.id());
            }
            other => panic!("expected StoreMismatch, got {:?}", other.map(|_| ())),
        }

        // A clone of the same handle is the same store
        let same = store.clone();
        let local = start_path(&same, [iri("x")]).out([iri("q")]);
        let path = start_path(&store, [iri("x")]).out([iri("p")]).except(&local);
        assert_eq!(nodes(&path), vec![iri("y"), iri("z")]);
    }

    #[test]
    fn test_unknown_start_node() {
        let strict = QuadStore::memory(false, false).unwrap();
        strict.add_quad(Quad::raw("a", "b", "c", "")).unwrap();
        let result = start_path(&strict, [iri("nobody")]).out([]).evaluate();
        assert!(matches!(result, Err(PathError::UnknownStartNode(_))));

        let other = start_path(&strict, [iri("nobody")]);
        let result = start_path(&strict, [iri("a")]).out([]).except(&other).evaluate();
        assert!(matches!(result, Err(PathError::UnknownStartNode(_))));

        let lenient = social();
        let rows = start_path(&lenient, [iri("nobody")]).tag("x").evaluate().unwrap();
        assert_eq!(rows.count(), 0);
    }

    #[test]
    fn test_max_rows_truncates() {
        let store = social();
        let path = start_path(&store, [iri("alice"), iri("bob")]).out([iri("follows")]);

        let partial = path
            .evaluate_with(EvalOptions::default().with_max_rows(2))
            .unwrap()
            .collect_partial()
            .unwrap();
        assert_eq!(partial.rows.len(), 2);
        assert!(!partial.complete);

        // Exactly enough rows is not a truncation
        let partial = path
            .evaluate_with(EvalOptions::default().with_max_rows(3))
            .unwrap()
            .collect_partial()
            .unwrap();
        assert_eq!(partial.rows.len(), 3);
        assert!(partial.complete);
    }

    #[test]
    fn test_max_steps_ends_with_error() {
        let store = social();
        let path = start_path(&store, [iri("alice")]).out([iri("follows")]).out([iri("follows")]);
        let mut seq = path.evaluate_with(EvalOptions::default().with_max_steps(3)).unwrap();
        let results: Vec<PathResult<BindingRow>> = seq.by_ref().collect();
        assert!(matches!(
            results.last(),
            Some(Err(PathError::EvaluationBudgetExceeded { .. }))
        ));
        assert!(seq.is_truncated());
        assert!(seq.next().is_none());
    }

    #[test]
    fn test_evaluation_is_restartable() {
        let store = social();
        let path = start_path(&store, [iri("alice")]).out([]);
        assert_eq!(path.count().unwrap(), path.count().unwrap());
    }

    #[test]
    fn test_binding_row_serializes_as_map() {
        let store = social();
        let rows: Vec<BindingRow> = start_path(&store, [iri("alice")])
            .tag("who")
            .evaluate()
            .unwrap()
            .collect::<PathResult<_>>()
            .unwrap();
        let json = serde_json::to_string(&rows[0]).unwrap();
        assert_eq!(json, r#"{"who":"<alice>"}"#);
        assert_eq!(rows[0].to_string(), "{who: <alice>}");
    }
}
