//! Recommendation ranking
//!
//! Counts how often each product shows up in a row stream and orders the
//! products by that count. An [`Aggregator`] consumes rows exactly once;
//! [`Aggregator::finalize`] turns it into an immutable [`Ranking`].
//!
//! Ties are broken by product value ascending, so the same rows always rank
//! the same way regardless of the order they arrived in.

use crate::eval::{BindingRow, PathResult};
use crate::path::Path;
use crate::value::Value;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// One ranked product
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecommendation {
    pub product_id: Value,
    /// Display name bound in the first row seen for the product
    pub name: Option<Value>,
    pub count: usize,
}

impl fmt::Display for ProductRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}\t{}\t{}", self.count, self.product_id, name),
            None => write!(f, "{}\t{}", self.count, self.product_id),
        }
    }
}

#[derive(Debug)]
struct Entry {
    name: Option<Value>,
    count: usize,
}

/// Single-pass product counter
#[derive(Debug)]
pub struct Aggregator {
    product_tag: String,
    name_tag: String,
    entries: IndexMap<Value, Entry, FxBuildHasher>,
    rows: usize,
    skipped: usize,
}

impl Aggregator {
    pub fn new(product_tag: impl Into<String>, name_tag: impl Into<String>) -> Self {
        Self {
            product_tag: product_tag.into(),
            name_tag: name_tag.into(),
            entries: IndexMap::with_hasher(FxBuildHasher),
            rows: 0,
            skipped: 0,
        }
    }

    /// Count one row. Rows without the product tag are skipped. The name
    /// comes from the product's first row only.
    pub fn observe(&mut self, row: &BindingRow) {
        self.rows += 1;
        let Some(product) = row.get(&self.product_tag) else {
            self.skipped += 1;
            return;
        };
        let name_tag = &self.name_tag;
        let entry = self.entries.entry(product.clone()).or_insert_with(|| Entry {
            name: row.get(name_tag).cloned(),
            count: 0,
        });
        entry.count += 1;
    }

    /// No row observed yet
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Distinct products counted so far
    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    /// Sort the counted products; the aggregator is consumed
    pub fn finalize(self) -> Ranking {
        let mut items: Vec<ProductRecommendation> = self
            .entries
            .into_iter()
            .map(|(product_id, entry)| ProductRecommendation {
                product_id,
                name: entry.name,
                count: entry.count,
            })
            .collect();
        items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.product_id.cmp(&b.product_id)));
        debug!(
            "Ranked {} products from {} rows ({} without '{}')",
            items.len(),
            self.rows,
            self.skipped,
            self.product_tag
        );
        Ranking { items }
    }
}

/// Products ordered by count descending, then product ascending
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Ranking {
    items: Vec<ProductRecommendation>,
}

impl Ranking {
    pub fn results(&self) -> &[ProductRecommendation] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The `n` highest ranked products
    pub fn top(&self, n: usize) -> &[ProductRecommendation] {
        &self.items[..n.min(self.items.len())]
    }

    pub fn into_results(self) -> Vec<ProductRecommendation> {
        self.items
    }
}

impl IntoIterator for Ranking {
    type Item = ProductRecommendation;
    type IntoIter = std::vec::IntoIter<ProductRecommendation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Rank the products tagged in a row stream
pub fn rank<I>(rows: I, product_tag: &str, name_tag: &str) -> Ranking
where
    I: IntoIterator<Item = BindingRow>,
{
    let mut aggregator = Aggregator::new(product_tag, name_tag);
    for row in rows {
        aggregator.observe(&row);
    }
    aggregator.finalize()
}

/// Evaluate a path and rank the products tagged in its rows
pub fn rank_path(path: &Path<'_>, product_tag: &str, name_tag: &str) -> PathResult<Ranking> {
    let mut aggregator = Aggregator::new(product_tag, name_tag);
    path.each_binding_row(|row| aggregator.observe(row))?;
    Ok(aggregator.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::start_path;
    use crate::quad::Quad;
    use crate::store::QuadStore;

    /// Rows tagging `product` for every (product, times) pair
    fn rows_for(counts: &[(&str, usize)]) -> Vec<BindingRow> {
        let store = QuadStore::memory(true, true).unwrap();
        let mut quads = Vec::new();
        for (product, times) in counts {
            for i in 0..*times {
                quads.push(Quad::raw(&format!("buyer{}", i), "bought", product, ""));
            }
            quads.push(Quad::make(Value::iri(*product), Value::iri("name"), format!("Name of {}", product), ""));
        }
        store.add_quads(quads).unwrap();
        let seeds: Vec<Value> = counts.iter().map(|(p, _)| Value::iri(*p)).collect();
        start_path(&store, seeds)
            .tag("product")
            .save(Value::iri("name"), "name")
            .r#in([Value::iri("bought")])
            .evaluate()
            .unwrap()
            .collect::<PathResult<_>>()
            .unwrap()
    }

    #[test]
    fn test_orders_by_count_descending() {
        let ranking = rank(rows_for(&[("a", 3), ("b", 1), ("c", 2)]), "product", "name");
        let counts: Vec<usize> = ranking.results().iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![3, 2, 1]);
        assert_eq!(ranking.results()[0].product_id, Value::iri("a"));
        assert_eq!(ranking.results()[0].name, Some(Value::string("Name of a")));
    }

    #[test]
    fn test_ties_are_deterministic() {
        let first = rank(rows_for(&[("y", 2), ("x", 2)]), "product", "name");
        let second = rank(rows_for(&[("x", 2), ("y", 2)]), "product", "name");
        assert_eq!(first, second);
        assert_eq!(first.results()[0].product_id, Value::iri("x"));
        assert_eq!(first.results()[1].product_id, Value::iri("y"));
    }

    #[test]
    fn test_rows_without_product_are_skipped() {
        let mut aggregator = Aggregator::new("product", "name");
        assert!(aggregator.is_empty());
        aggregator.observe(&BindingRow::default());
        assert!(!aggregator.is_empty());
        assert_eq!(aggregator.distinct(), 0);
        assert!(aggregator.finalize().is_empty());
    }

    #[test]
    fn test_name_comes_from_first_row() {
        let store = QuadStore::memory(true, true).unwrap();
        store
            .add_quads(vec![
                Quad::raw("buyer0", "bought", "a", ""),
                Quad::make(Value::iri("a"), Value::iri("name"), "Walkman", ""),
            ])
            .unwrap();
        let buyers = start_path(&store, [Value::iri("a")]).tag("product");
        fn rows_of(path: Path<'_>) -> Vec<BindingRow> {
            path.evaluate().unwrap().collect::<PathResult<_>>().unwrap()
        }
        let unnamed = rows_of(buyers.r#in([Value::iri("bought")]));
        let named = rows_of(buyers.save(Value::iri("name"), "name").r#in([Value::iri("bought")]));

        let ranking = rank(unnamed.iter().chain(&named).cloned(), "product", "name");
        assert_eq!(ranking.results()[0].count, 2);
        assert_eq!(ranking.results()[0].name, None);

        let ranking = rank(named.iter().chain(&unnamed).cloned(), "product", "name");
        assert_eq!(ranking.results()[0].name, Some(Value::string("Walkman")));
    }

    #[test]
    fn test_top() {
        let ranking = rank(rows_for(&[("a", 1), ("b", 2)]), "product", "name");
        assert_eq!(ranking.top(1).len(), 1);
        assert_eq!(ranking.top(10).len(), 2);
    }
}
