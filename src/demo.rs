//! Demo datasets and the queries run against them
//!
//! Two small graphs ship with the crate: a social graph of people who know
//! each other, and a shop with a product catalog, a CRM and sales records.

use crate::eval::{BindingRow, PathResult};
use crate::path::{start_path, Path};
use crate::quad::Quad;
use crate::rank::{rank_path, Ranking};
use crate::store::{AddOutcome, CommitSummary, QuadStore, StoreError, StoreResult};
use crate::value::Value;
use rand::Rng;
use tracing::{info, warn};

pub const SOCIAL_GRAPH: &str = "demo graph";

/// The social graph, purposeful duplicates and one incomplete quad included
pub fn social_quads() -> Vec<Quad> {
    let raw = |s, p, o| Quad::raw(s, p, o, SOCIAL_GRAPH);
    vec![
        raw("barakmich", "drinks_with", "robertmeta"),
        raw("barakmich", "is_a", "cayley creator"),
        raw("barakmich", "knows", "robertmeta"),
        raw("barakmich", "knows", "jorgent"),
        raw("betawaffle", "knows", "robertmeta"),
        raw("betawaffle", "is_a", "cayley advocate"),
        raw("dennwc", "is_a", "cayley coding machine"),
        raw("dennwc", "knows", "robertmeta"),
        raw("henrocdotnet", "is_a", "cayley doubter"),
        raw("henrocdotnet", "knows", "robertmeta"),
        raw("henrocdotnet", "works_with", "robertmeta"),
        raw("oren", "is_a", "cayley advocate"),
        raw("oren", "knows", "robertmeta"),
        raw("oren", "makes_talks_with", "robertmeta"),
        raw("robertmeta", "is_a", "cayley advocate"),
        raw("robertmeta", "knows", "barakmich"),
        raw("robertmeta", "knows", "betawaffle"),
        raw("robertmeta", "knows", "dennwc"),
        raw("robertmeta", "knows", "dennwc"),
        raw("robertmeta", "knows", "dennwc"),
        raw("robertmeta", "knows", "dennwc"),
        raw("robertmeta", "knows", "henrocdotnet"),
        raw("robertmeta", "knows", "oren"),
        raw("jorgent", "knows", "oren"),
        raw("jorgent", "knows", "dennwc"),
        raw("jorgent", "drinks_with", "robertmeta"),
        raw("cayley advocate", "is_a", "hard job without docs"),
        raw("cayley coding machine", "is_a", ""),
    ]
}

/// Outcome of loading the social graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialLoad {
    pub added: usize,
    pub duplicates: usize,
    pub rejected: Vec<Quad>,
}

/// Add the social graph one quad at a time, skipping incomplete quads
pub fn load_social(store: &QuadStore) -> StoreResult<SocialLoad> {
    let mut load = SocialLoad::default();
    for quad in social_quads() {
        match store.add_quad(quad.clone()) {
            Ok(AddOutcome::Added) => load.added += 1,
            Ok(AddOutcome::Duplicate) => load.duplicates += 1,
            Err(StoreError::IncompleteQuad(q)) => {
                warn!("Skipping incomplete quad {}", q);
                load.rejected.push(quad);
            }
            Err(e) => return Err(e),
        }
    }
    info!(
        "Loaded social graph: {} added, {} duplicates, {} rejected",
        load.added,
        load.duplicates,
        load.rejected.len()
    );
    Ok(load)
}

fn raw_node(name: &str) -> Value {
    Value::iri(name)
}

/// Number of outgoing edges of a node
pub fn count_outs(store: &QuadStore, node: &str) -> PathResult<usize> {
    start_path(store, [raw_node(node)]).out([]).count()
}

/// Number of incoming edges of a node
pub fn count_ins(store: &QuadStore, node: &str) -> PathResult<usize> {
    start_path(store, [raw_node(node)]).r#in([]).count()
}

/// Rows binding `subject`, `predicate` and `object` for every outgoing edge
pub fn outs(store: &QuadStore, node: &Value) -> PathResult<Vec<BindingRow>> {
    collect_rows(
        &start_path(store, [node.clone()])
            .tag("subject")
            .out_with_tags(["predicate"], [])
            .tag("object"),
    )
}

/// Rows binding `object`, `predicate` and `subject` for every incoming edge
pub fn ins(store: &QuadStore, node: &Value) -> PathResult<Vec<BindingRow>> {
    collect_rows(
        &start_path(store, [node.clone()])
            .tag("object")
            .in_with_tags(["predicate"], [])
            .tag("subject"),
    )
}

fn friends_path<'s>(store: &'s QuadStore, node: &Value) -> Path<'s> {
    start_path(store, [node.clone()])
        .tag("subject")
        .out_with_tags(["predicate"], [raw_node("knows")])
        .tag("friend")
}

/// Rows binding `subject`, `predicate` and `friend` for everybody the node knows
pub fn friends(store: &QuadStore, node: &Value) -> PathResult<Vec<BindingRow>> {
    collect_rows(&friends_path(store, node))
}

/// Rows binding `friend`, `predicate` and `friend_of_friend` one hop further
pub fn friends_of_friends(store: &QuadStore, node: &Value) -> PathResult<Vec<BindingRow>> {
    collect_rows(
        &friends_path(store, node)
            .out_with_tags(["predicate"], [raw_node("knows")])
            .tag("friend_of_friend"),
    )
}

fn collect_rows(path: &Path<'_>) -> PathResult<Vec<BindingRow>> {
    let mut rows = Vec::new();
    path.each_binding_row(|row| rows.push(row.clone()))?;
    Ok(rows)
}

pub const CATALOG: &str = "catalog";
pub const CRM: &str = "crm";
pub const SALES: &str = "sales";

pub const BOUGHT: &str = "bought";
pub const IN_GROUP: &str = "in_group";
pub const LABEL: &str = "label";
pub const FIRSTNAME: &str = "firstname";

pub const JOHN_DOE: &str = "3117979d-516a-4bac-a55e-b71g4dcb2351";
pub const ALICE_BLUE: &str = "3217979d-516a-4bac-a55e-b71f4dcb2352";
pub const JASE_FOLLI: &str = "3317979d-516a-4bac-a55e-b71e4dcb2353";
pub const CASPER_WALDEN: &str = "3417979d-516a-4bac-a55e-b71d4dcb2355";

pub const WALKMAN: &str = "2017979d-516a-4bac-a55e-b71c4dcb2351";
pub const PENCIL: &str = "2017979d-516a-4bac-a55e-b71c4dcb2354";
pub const MONITOR: &str = "2017979d-516a-4bac-a55e-b71c4dcb2360";
pub const TRACKBALL: &str = "2017979d-516a-4bac-a55e-b71c4dcb2364";
pub const HARDDRIVE: &str = "2017979d-516a-4bac-a55e-b71c4dcb2365";

/// (id, label, price, group)
const PRODUCTS: [(&str, &str, f64, Option<&str>); 16] = [
    (WALKMAN, "Walkman", 12.3, Some("electronics")),
    ("2017979d-516a-4bac-a55e-b71c4dcb2352", "Discman", 34.3, Some("electronics")),
    ("2017979d-516a-4bac-a55e-b71c4dcb2353", "Walky talky", 12.3, Some("electronics")),
    (PENCIL, "Pencil", 76.3, Some("utensils")),
    ("2017979d-516a-4bac-a55e-b71c4dcb2355", "Pen", 2.3, Some("utensils")),
    ("2017979d-516a-4bac-a55e-b71c4dcb2356", "Pillow", 54.3, Some("bedroom")),
    ("2017979d-516a-4bac-a55e-b71c4dcb2357", "Blanket", 34.3, Some("bedroom")),
    ("2017979d-516a-4bac-a55e-b71c4dcb2358", "Sheets", 52.3, None),
    ("2017979d-516a-4bac-a55e-b71c4dcb2359", "Bucket", 21.3, Some("household")),
    (MONITOR, "Monitor", 321.3, Some("electronics")),
    ("2017979d-516a-4bac-a55e-b71c4dcb2361", "Laptop", 426.3, Some("electronics")),
    ("2017979d-516a-4bac-a55e-b71c4dcb2362", "Keyboard", 34.3, Some("electronics")),
    ("2017979d-516a-4bac-a55e-b71c4dcb2363", "Mouse", 12.3, Some("electronics")),
    (TRACKBALL, "Trackball", 23.3, Some("electronics")),
    (HARDDRIVE, "Harddrive", 202.3, Some("electronics")),
    ("2017979d-516a-4bac-a55e-b71c4dcb2366", "MagSafe Adapter", 86.3, None),
];

/// (id, label, description)
const GROUPS: [(&str, &str, &str); 4] = [
    ("electronics", "Electronics", "Electronics for in and around the house"),
    ("bedroom", "Bedroom", "Everything for in the bedroom"),
    ("utensils", "Utensils", "Every tool you need in house"),
    ("household", "Household", "Everything for your household"),
];

const CLIENTS: [(&str, &str, &str); 4] = [
    (JOHN_DOE, "John", "Doe"),
    (ALICE_BLUE, "Alice", "Blue"),
    (JASE_FOLLI, "Jase", "Folli"),
    (CASPER_WALDEN, "Casper", "Walden"),
];

const PURCHASES: [(&str, &str); 8] = [
    (JOHN_DOE, WALKMAN),
    (JOHN_DOE, MONITOR),
    (ALICE_BLUE, PENCIL),
    (ALICE_BLUE, WALKMAN),
    (TRACKBALL, WALKMAN),
    (CASPER_WALDEN, HARDDRIVE),
    (CASPER_WALDEN, PENCIL),
    (CASPER_WALDEN, WALKMAN),
];

fn catalog(s: &str, p: &str, o: impl Into<Value>) -> Quad {
    Quad::make(Value::iri(s), Value::iri(p), o, CATALOG)
}

fn client_quads(id: &str, firstname: &str, lastname: &str) -> [Quad; 3] {
    let id = Value::iri(id);
    [
        Quad::make(id.clone(), Value::iri(FIRSTNAME), firstname, CRM),
        Quad::make(id.clone(), Value::iri("lastname"), lastname, CRM),
        Quad::make(id, Value::iri("type"), Value::iri("client"), CRM),
    ]
}

fn purchase(customer: &str, product: &str) -> Quad {
    Quad::make(Value::iri(customer), Value::iri(BOUGHT), Value::iri(product), SALES)
}

/// The shop dataset with `customers` random customers buying two random
/// products each
pub fn shop_quads<R: Rng>(customers: usize, rng: &mut R) -> Vec<Quad> {
    let mut quads = vec![
        catalog("product", "type", Value::iri("class")),
        catalog("product", LABEL, "Product"),
        catalog("product", "desc", "A store product"),
        catalog("product", "hasProperty", Value::iri(LABEL)),
        catalog("product", "hasProperty", Value::iri("desc")),
        catalog("product", "hasProperty", Value::iri("price")),
        catalog("product_group", "type", Value::iri("class")),
        catalog("product_group", LABEL, "Product Group"),
        catalog("product_group", "desc", "A product group"),
        catalog("product_group", "hasProperty", Value::iri(LABEL)),
        catalog("product_group", "hasProperty", Value::iri("desc")),
    ];

    for (id, label, desc) in GROUPS {
        quads.push(catalog(id, "type", Value::iri("product_group")));
        quads.push(catalog(id, LABEL, Value::iri(label)));
        quads.push(catalog(id, "desc", Value::iri(desc)));
    }

    let client = Value::iri("client");
    quads.extend([
        Quad::make(client.clone(), Value::iri("type"), Value::iri("class"), CRM),
        Quad::make(client.clone(), Value::iri(LABEL), "Client", CRM),
        Quad::make(client.clone(), Value::iri("desc"), "A person who placed an order", CRM),
        Quad::make(client.clone(), Value::iri("hasProperty"), Value::iri(FIRSTNAME), CRM),
        Quad::make(client, Value::iri("hasProperty"), Value::iri("lastname"), CRM),
    ]);
    for (id, firstname, lastname) in CLIENTS {
        quads.extend(client_quads(id, firstname, lastname));
    }

    for (id, label, price, _) in PRODUCTS {
        quads.push(catalog(id, LABEL, label));
        quads.push(catalog(id, "desc", "This is a description"));
        quads.push(catalog(id, "price", price));
        quads.push(catalog(id, "type", Value::iri("product")));
    }
    for (id, _, _, group) in PRODUCTS {
        if let Some(group) = group {
            quads.push(catalog(id, IN_GROUP, Value::iri(group)));
        }
    }

    quads.extend(PURCHASES.iter().map(|(customer, product)| purchase(customer, product)));

    for i in 0..customers {
        let id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid().to_string();
        quads.extend(client_quads(&id, &format!("User {}", i), &format!("Lastname {}", i)));
        for _ in 0..2 {
            let (product, ..) = PRODUCTS[rng.gen_range(0..PRODUCTS.len())];
            quads.push(purchase(&id, product));
        }
    }
    quads
}

/// Write the shop dataset in one writer session
pub fn load_shop<R: Rng>(store: &QuadStore, customers: usize, rng: &mut R) -> StoreResult<CommitSummary> {
    let mut writer = store.writer();
    writer.write_quads(shop_quads(customers, rng));
    let summary = writer.commit()?;
    info!(
        "Loaded shop dataset: {} added, {} duplicates ({} random customers)",
        summary.added, summary.duplicates, customers
    );
    Ok(summary)
}

/// Rows binding `product` and `name` for everything a customer bought
pub fn products_for_customer(store: &QuadStore, customer: &Value) -> PathResult<Vec<BindingRow>> {
    collect_rows(
        &start_path(store, [customer.clone()])
            .out([Value::iri(BOUGHT)])
            .tag("product")
            .save(Value::iri(LABEL), "name"),
    )
}

/// Products sharing a group with what the customer bought, minus what the
/// customer already owns, ranked by how many purchases they have
pub fn recommendations_for_customer(store: &QuadStore, customer: &Value) -> PathResult<Ranking> {
    let owned = start_path(store, [customer.clone()]).out([Value::iri(BOUGHT)]);
    let groups = owned.out([Value::iri(IN_GROUP)]).unique();
    let path = groups
        .r#in([Value::iri(IN_GROUP)])
        .except(&owned)
        .tag("product")
        .save(Value::iri(LABEL), "name")
        .in_with_tags(["predicate"], [Value::iri(BOUGHT)])
        .tag("customer")
        .save(Value::iri(FIRSTNAME), "client_name");
    rank_path(&path, "product", "name")
}

/// Products in the groups of a product, other than the product itself,
/// ranked by how many of their buyers also bought it
pub fn recommendations_for_product(store: &QuadStore, product: &Value) -> PathResult<Ranking> {
    let start = start_path(store, [product.clone()]);
    let groups = start.out([Value::iri(IN_GROUP)]).unique();
    let path = groups
        .r#in([Value::iri(IN_GROUP)])
        .except(&start)
        .tag("product")
        .save(Value::iri(LABEL), "name")
        .in_with_tags(["predicate"], [Value::iri(BOUGHT)])
        .has(Value::iri(BOUGHT), product.clone())
        .tag("customer")
        .save(Value::iri(FIRSTNAME), "client_name");
    rank_path(&path, "product", "name")
}

/// Products sharing a group with what the customer bought, counted by
/// purchases of other customers only
pub fn co_purchases_for_customer(store: &QuadStore, customer: &Value) -> PathResult<Ranking> {
    let me = start_path(store, [customer.clone()]);
    let path = me
        .out([Value::iri(BOUGHT)])
        .out([Value::iri(IN_GROUP)])
        .unique()
        .r#in([Value::iri(IN_GROUP)])
        .tag("product")
        .save(Value::iri(LABEL), "name")
        .r#in([Value::iri(BOUGHT)])
        .except(&me)
        .tag("customer");
    rank_path(&path, "product", "name")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn social_store() -> QuadStore {
        let store = QuadStore::memory(true, true).unwrap();
        load_social(&store).unwrap();
        store
    }

    fn shop_store(customers: usize) -> QuadStore {
        let store = QuadStore::memory(true, true).unwrap();
        load_shop(&store, customers, &mut StdRng::seed_from_u64(7)).unwrap();
        store
    }

    #[test]
    fn test_social_load_absorbs_duplicates_and_rejects_incomplete() {
        let store = QuadStore::memory(true, true).unwrap();
        let load = load_social(&store).unwrap();
        assert_eq!(load.duplicates, 3);
        assert_eq!(load.rejected.len(), 1);
        assert_eq!(load.added, social_quads().len() - 4);
        assert_eq!(store.len(), load.added);
    }

    #[test]
    fn test_social_counts() {
        let store = social_store();
        // is_a + knows x5
        assert_eq!(count_outs(&store, "robertmeta").unwrap(), 6);
        assert_eq!(count_ins(&store, "robertmeta").unwrap(), 9);
        assert_eq!(count_outs(&store, "nobody").unwrap(), 0);
    }

    #[test]
    fn test_social_friends_of_friends() {
        let store = social_store();
        let barak = Value::iri("barakmich");
        let friends = friends(&store, &barak).unwrap();
        let names: Vec<&Value> = friends.iter().filter_map(|r| r.get("friend")).collect();
        assert_eq!(names, vec![&Value::iri("jorgent"), &Value::iri("robertmeta")]);

        let fof = friends_of_friends(&store, &barak).unwrap();
        // jorgent knows 2, robertmeta knows 5
        assert_eq!(fof.len(), 7);
        assert!(fof.iter().all(|r| r.get("predicate") == Some(&Value::iri("knows"))));
    }

    #[test]
    fn test_outs_and_ins_rows() {
        let store = social_store();
        let rows = outs(&store, &Value::iri("jorgent")).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.get("subject") == Some(&Value::iri("jorgent"))));
        let rows = ins(&store, &Value::iri("jorgent")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("subject"), Some(&Value::iri("barakmich")));
    }

    #[test]
    fn test_shop_is_reproducible_for_a_seed() {
        let a = shop_quads(5, &mut StdRng::seed_from_u64(1));
        let b = shop_quads(5, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_products_for_customer() {
        let store = shop_store(0);
        let rows = products_for_customer(&store, &Value::iri(JOHN_DOE)).unwrap();
        let names: Vec<&Value> = rows.iter().filter_map(|r| r.get("name")).collect();
        assert_eq!(names, vec![&Value::string("Walkman"), &Value::string("Monitor")]);
    }

    #[test]
    fn test_recommendations_without_random_customers() {
        let store = shop_store(0);
        // Electronics bought by others, minus John's walkman and monitor
        let ranking = recommendations_for_customer(&store, &Value::iri(JOHN_DOE)).unwrap();
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking.results()[0].product_id, Value::iri(HARDDRIVE));
        assert_eq!(ranking.results()[0].count, 1);
        assert_eq!(ranking.results()[0].name, Some(Value::string("Harddrive")));

        // Only customers who bought a trackball count; nobody did
        let ranking = recommendations_for_product(&store, &Value::iri(TRACKBALL)).unwrap();
        assert!(ranking.is_empty());
    }

    #[test]
    fn test_recommendations_with_random_customers() {
        let store = shop_store(50);
        let ranking = recommendations_for_customer(&store, &Value::iri(JOHN_DOE)).unwrap();
        assert!(ranking
            .results()
            .iter()
            .all(|r| r.product_id != Value::iri(WALKMAN) && r.product_id != Value::iri(MONITOR)));
        let counts: Vec<usize> = ranking.results().iter().map(|r| r.count).collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }
}
