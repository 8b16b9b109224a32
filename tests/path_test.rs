use quadpath::{
    rank_path, start_path, EvalOptions, PathError, PathResult, Quad, QuadStore, StoreConfig, Value,
};

fn iri(s: &str) -> Value {
    Value::iri(s)
}

/// cust1 bought p1 and p2, cust2 bought p2, both products in g1
fn purchase_store() -> QuadStore {
    let store = QuadStore::memory(true, true).unwrap();
    store
        .add_quads(vec![
            Quad::raw("cust1", "bought", "p1", ""),
            Quad::raw("cust1", "bought", "p2", ""),
            Quad::raw("p1", "in_group", "g1", ""),
            Quad::raw("p2", "in_group", "g1", ""),
            Quad::raw("cust2", "bought", "p2", ""),
        ])
        .unwrap();
    store
}

#[test]
fn test_co_purchases_by_other_customers() {
    let store = purchase_store();
    let me = start_path(&store, [iri("cust1")]);
    let path = me
        .out([iri("bought")])
        .out([iri("in_group")])
        .unique()
        .r#in([iri("in_group")])
        .tag("product")
        .r#in([iri("bought")])
        .except(&me)
        .tag("customer");

    let mut customers = Vec::new();
    path.each_binding_row(|row| customers.push(row.get("customer").cloned()))
        .unwrap();
    assert_eq!(customers, vec![Some(iri("cust2"))]);

    let ranking = rank_path(&path, "product", "name").unwrap();
    assert_eq!(ranking.len(), 1);
    assert_eq!(ranking.results()[0].product_id, iri("p2"));
    assert_eq!(ranking.results()[0].count, 1);
    assert!(ranking.results().iter().all(|r| r.product_id != iri("p1")));
}

#[test]
fn test_owned_products_are_excluded() {
    let store = purchase_store();
    store.add_quad(Quad::raw("p3", "in_group", "g1", "")).unwrap();
    store.add_quad(Quad::raw("cust2", "bought", "p3", "")).unwrap();

    let owned = start_path(&store, [iri("cust1")]).out([iri("bought")]);
    let path = owned
        .out([iri("in_group")])
        .unique()
        .r#in([iri("in_group")])
        .except(&owned)
        .tag("product")
        .r#in([iri("bought")]);

    let ranking = rank_path(&path, "product", "name").unwrap();
    let products: Vec<&Value> = ranking.results().iter().map(|r| &r.product_id).collect();
    assert_eq!(products, vec![&iri("p3")]);
}

#[test]
fn test_absent_start_node_policy() {
    let lenient = purchase_store();
    let rows = start_path(&lenient, [iri("ghost")])
        .out([iri("bought")])
        .evaluate()
        .unwrap();
    assert_eq!(rows.count(), 0);

    let strict = QuadStore::open(StoreConfig::memory()).unwrap();
    strict.add_quad(Quad::raw("cust1", "bought", "p1", "")).unwrap();
    match start_path(&strict, [iri("ghost")]).out([]).evaluate() {
        Err(PathError::UnknownStartNode(node)) => assert_eq!(node, "<ghost>"),
        other => panic!("expected UnknownStartNode, got {:?}", other.map(|_| ())),
    };
}

#[test]
fn test_absent_predicate_yields_no_rows() {
    let store = purchase_store();
    let count = start_path(&store, [iri("cust1")]).out([iri("reviewed")]).count().unwrap();
    assert_eq!(count, 0);
}

#[test]
fn test_branches_share_a_prefix() {
    let store = purchase_store();
    let products = start_path(&store, [iri("cust1")]).out([iri("bought")]);
    let groups = products.out([iri("in_group")]);
    let buyers = products.r#in([iri("bought")]);

    assert_eq!(products.count().unwrap(), 2);
    assert_eq!(groups.nodes().unwrap(), vec![iri("g1"), iri("g1")]);
    assert_eq!(buyers.unique().nodes().unwrap(), vec![iri("cust1"), iri("cust2")]);
    // Extending a branch left its prefix untouched
    assert_eq!(products.count().unwrap(), 2);
}

#[test]
fn test_budget_returns_marked_partial_result() {
    let store = QuadStore::memory(true, true).unwrap();
    let mut quads = Vec::new();
    for i in 0..20 {
        quads.push(Quad::raw("hub", "links", &format!("n{}", i), ""));
        quads.push(Quad::raw(&format!("n{}", i), "links", "hub", ""));
    }
    store.add_quads(quads).unwrap();

    let path = start_path(&store, [iri("hub")])
        .out([iri("links")])
        .out([iri("links")])
        .out([iri("links")]);
    assert_eq!(path.count().unwrap(), 400);

    let partial = path
        .evaluate_with(EvalOptions::default().with_max_rows(25))
        .unwrap()
        .collect_partial()
        .unwrap();
    assert_eq!(partial.rows.len(), 25);
    assert!(!partial.complete);

    let mut rows = path
        .evaluate_with(EvalOptions::default().with_max_steps(50))
        .unwrap();
    let results: Vec<PathResult<_>> = rows.by_ref().collect();
    assert!(results.iter().any(|r| r.is_ok()));
    assert!(matches!(
        results.last(),
        Some(Err(PathError::EvaluationBudgetExceeded { .. }))
    ));
    assert!(rows.is_truncated());
    assert!(rows.steps() <= 50);
}

#[test]
fn test_save_keeps_current_node() {
    let store = QuadStore::memory(true, true).unwrap();
    store
        .add_quads(vec![
            Quad::raw("c1", "bought", "p1", "sales"),
            Quad::make(iri("p1"), iri("label"), "Walkman", "catalog"),
        ])
        .unwrap();
    let path = start_path(&store, [iri("c1")])
        .out([iri("bought")])
        .save(iri("label"), "name")
        .tag("product");
    let rows: Vec<_> = path.evaluate().unwrap().collect::<PathResult<_>>().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("product"), Some(&iri("p1")));
    assert_eq!(rows[0].get("name"), Some(&Value::string("Walkman")));
}

#[test]
fn test_literals_and_labels_in_traversals() {
    let store = QuadStore::memory(false, false).unwrap();
    store
        .add_quads(vec![
            Quad::make(iri("p1"), iri("price"), 12.3f64, "catalog"),
            Quad::make(iri("p2"), iri("price"), 12.3f64, "catalog"),
            Quad::make(iri("p2"), iri("on_sale"), true, "catalog"),
        ])
        .unwrap();

    let same_price = start_path(&store, [iri("p1")])
        .out([iri("price")])
        .r#in([iri("price")])
        .nodes()
        .unwrap();
    assert_eq!(same_price, vec![iri("p1"), iri("p2")]);

    let on_sale = start_path(&store, [iri("p1"), iri("p2")])
        .has(iri("on_sale"), Value::boolean(true))
        .nodes()
        .unwrap();
    assert_eq!(on_sale, vec![iri("p2")]);
}
