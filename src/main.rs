//! Quadpath demo binary
//!
//! Loads one of the demo datasets into a store and runs its queries.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quadpath::demo;
use quadpath::{BindingRow, QuadStore, Ranking, StoreConfig, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quadpath", version, about = "Quad store path traversal demos")]
struct Cli {
    /// Store locator: `memory:`, `rocksdb:<path>` or a directory path
    #[arg(long, default_value = "memory:", global = true)]
    db: String,

    /// YAML store configuration (overrides --db and --strict)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fail on duplicate quads and missing references
    #[arg(long, global = true)]
    strict: bool,

    /// Output format
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Explore the social graph
    Social,
    /// Product recommendations on the shop dataset
    Recommend {
        /// Number of random customers to generate
        #[arg(long, default_value_t = 10)]
        customers: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => StoreConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => {
            let config = StoreConfig::from_locator(&cli.db)?;
            if cli.strict {
                config
            } else {
                config.lenient()
            }
        }
    };

    println!("Quadpath v{}", quadpath::version());
    println!("Using store: {:?}", config.backend);

    let store = QuadStore::open(config).context("opening quad store")?;
    match cli.command {
        Commands::Social => run_social(&store, cli.format)?,
        Commands::Recommend { customers } => run_recommend(&store, customers, cli.format)?,
    }
    store.close()?;
    Ok(())
}

fn run_social(store: &QuadStore, format: OutputFormat) -> Result<()> {
    if store.is_empty() {
        let load = demo::load_social(store)?;
        println!(
            "Added {} quads ({} duplicates ignored, {} rejected)",
            load.added,
            load.duplicates,
            load.rejected.len()
        );
    }

    let robertmeta = Value::iri("robertmeta");
    let jorgent = Value::iri("jorgent");

    println!("\ncountOuts for robertmeta: {}", demo::count_outs(store, "robertmeta")?);
    println!("countIns for robertmeta: {}", demo::count_ins(store, "robertmeta")?);

    for node in [&robertmeta, &jorgent] {
        header(&format!("Outs: subject ({}) -predicate-> object", node));
        for row in demo::outs(store, node)? {
            print_edge(&row, "subject", "object", format)?;
            // Follow-ups for relations that point at further records
            if row.get("predicate") == Some(&Value::iri("follows")) {
                if let Some(object) = row.get("object") {
                    for nested in demo::outs(store, object)? {
                        print_edge(&nested, "subject", "object", format)?;
                    }
                }
            }
        }

        header(&format!("Ins: object <-predicate- subject ({})", node));
        for row in demo::ins(store, node)? {
            print_edge(&row, "subject", "object", format)?;
        }
    }

    let barakmich = Value::iri("barakmich");
    header(&format!("Friends of friends for subject ({})", barakmich));
    for row in demo::friends(store, &barakmich)? {
        print_edge(&row, "subject", "friend", format)?;
    }
    for row in demo::friends_of_friends(store, &barakmich)? {
        print_edge(&row, "friend", "friend_of_friend", format)?;
    }
    Ok(())
}

fn run_recommend(store: &QuadStore, customers: usize, format: OutputFormat) -> Result<()> {
    if store.is_empty() {
        println!("Adding test data");
        demo::load_shop(store, customers, &mut rand::thread_rng())?;
    }

    let john = Value::iri(demo::JOHN_DOE);
    header(&format!("Products bought by customer ({})", john));
    for row in demo::products_for_customer(store, &john)? {
        match format {
            OutputFormat::Text => println!(
                "{} {} {}",
                john,
                display(row.get("product")),
                display(row.get("name"))
            ),
            OutputFormat::Json => println!("{}", serde_json::to_string(&row)?),
        }
    }

    header(&format!("Product recommendations for customer ({})", john));
    print_ranking(&demo::recommendations_for_customer(store, &john)?, format)?;

    let trackball = Value::iri(demo::TRACKBALL);
    header(&format!("Product recommendations for product ({})", trackball));
    print_ranking(&demo::recommendations_for_product(store, &trackball)?, format)?;
    Ok(())
}

fn header(title: &str) {
    println!("\n{}", title);
    println!("============================================");
}

fn display(value: Option<&Value>) -> String {
    value.map(Value::to_string).unwrap_or_default()
}

fn print_edge(row: &BindingRow, from: &str, to: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!(
            "{} `{}`-> {}",
            display(row.get(from)),
            display(row.get("predicate")),
            display(row.get(to))
        ),
        OutputFormat::Json => println!("{}", serde_json::to_string(row)?),
    }
    Ok(())
}

fn print_ranking(ranking: &Ranking, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if ranking.is_empty() {
                println!("(no recommendations)");
            }
            for item in ranking.results() {
                println!("{}", item);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(ranking)?),
    }
    Ok(())
}
