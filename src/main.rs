use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use housing_filters::config::Config;
use housing_filters::filters::FilterValue;
use housing_filters::models::{FilterField, Selection};
use housing_filters::navigation::MemoryNavigator;
use housing_filters::routing::split_url;
use housing_filters::sources::{
    ApiSource, CachedSource, ListingQuery, ListingSource, ReferenceSource, StaticSource, TitleResolver,
};
use housing_filters::store::Store;
use housing_filters::sync::{FieldStatus, Synchronizer};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "housing-filters", version, about = "Browse-page filter state, URL codec and option lists")]
struct Cli {
    /// Config file (defaults to ./housing-filters.toml)
    #[arg(long, global = true, env = "HOUSING_FILTERS_CONFIG")]
    config: Option<PathBuf>,

    /// Use the bundled reference data instead of the REST API
    #[arg(long, global = true)]
    offline: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rehydrate filter state from a browse URL
    Parse { url: String },
    /// Build the canonical URL from field slugs
    Build(BuildArgs),
    /// List the options a dependent field offers for a URL
    Options { url: String, field: FilterField },
    /// Search ads matching a browse URL
    Search {
        url: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[derive(Args)]
struct BuildArgs {
    #[arg(long = "tx")]
    transaction_type: Option<String>,
    #[arg(long = "pt")]
    property_type: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    province: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    area: Option<String>,
    /// Attribute filter as slug=value, comma-separated for several values
    #[arg(long = "filter", value_name = "SLUG=VALUE")]
    filters: Vec<String>,
}

impl BuildArgs {
    fn fields(&self) -> Vec<(FilterField, &str)> {
        [
            (FilterField::TransactionType, &self.transaction_type),
            (FilterField::PropertyType, &self.property_type),
            (FilterField::Category, &self.category),
            (FilterField::Country, &self.country),
            (FilterField::Province, &self.province),
            (FilterField::City, &self.city),
            (FilterField::Area, &self.area),
        ]
        .into_iter()
        .filter_map(|(field, slug)| slug.as_deref().map(|s| (field, s)))
        .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    if cli.offline {
        run(StaticSource::new(), &cli).await
    } else {
        info!("🏠 Using API at {}", config.api.base_url);
        let source = CachedSource::new(ApiSource::new(&config.api)?);
        run(source, &cli).await
    }
}

async fn run<S>(source: S, cli: &Cli) -> Result<()>
where
    S: ReferenceSource + TitleResolver + ListingSource,
{
    let store = Arc::new(Store::default());

    match &cli.command {
        Command::Parse { url } => {
            let sync = rehydrate(store, source, url).await?;
            let state = sync.state();
            if cli.json {
                let status: BTreeMap<&str, FieldStatus> =
                    FilterField::ALL.iter().map(|f| (f.as_str(), sync.status(*f))).collect();
                let report = json!({
                    "state": *state,
                    "filters": sync.selected_filters(),
                    "canonical_url": sync.canonical_url(),
                    "status": status,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for field in FilterField::ALL {
                    let selection = state.get(field);
                    println!("{:<17} {:<20} {:?}", field.as_str(), selection.slug, sync.status(field));
                }
                for (slug, value) in sync.selected_filters().iter() {
                    println!("filter {:<10} {}", slug, value.encode());
                }
                println!("canonical: {}", sync.canonical_url());
            }
        }
        Command::Build(args) => {
            let mut sync = Synchronizer::new(store, source, MemoryNavigator::default());
            for (field, slug) in args.fields() {
                sync.select(field, Selection::from_slug(slug)).await;
            }
            for raw in &args.filters {
                let Some((slug, value)) = raw.split_once('=') else {
                    bail!("Filter must look like slug=value, got {:?}", raw);
                };
                let value = FilterValue::decode(value, None)
                    .with_context(|| format!("Filter {} has no value", slug))?;
                sync.set_filter(slug, value);
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&json!({ "url": sync.canonical_url() }))?);
            } else {
                println!("{}", sync.canonical_url());
            }
        }
        Command::Options { url, field } => {
            let sync = rehydrate(store, source, url).await?;
            let options = sync.options(*field);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&options)?);
            } else if options.is_empty() {
                println!("No {} options ({:?})", field, sync.status(*field));
            } else {
                for option in options {
                    println!("{:<20} {}", option.slug, option.title);
                }
            }
        }
        Command::Search { url, page } => {
            let sync = rehydrate(store, source, url).await?;
            let query = ListingQuery::new((*sync.state()).clone(), sync.selected_filters().clone()).with_page(*page);
            let results = sync
                .source()
                .search_listings(&query)
                .await
                .context("Failed to search listings")?;

            info!("✅ Found {} listings", results.total);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for (i, listing) in results.items.iter().enumerate() {
                    println!("{}. {} ({})", i + 1, listing.title, listing.price);
                    if let Some(area) = &listing.location.area {
                        println!("   Area: {}", area.title);
                    }
                    println!("   ID: {}", listing.id);
                    println!();
                }
            }
        }
    }

    Ok(())
}

async fn rehydrate<S>(store: Arc<Store>, source: S, url: &str) -> Result<Synchronizer<S, MemoryNavigator>>
where
    S: ReferenceSource + TitleResolver,
{
    let (path, query) = split_url(url);
    let start = if query.is_empty() { path } else { format!("{}?{}", path, query) };
    let mut sync = Synchronizer::new(store, source, MemoryNavigator::new(&start));
    sync.reconcile_from_url()
        .await
        .with_context(|| format!("Failed to read filters from {}", url))?;
    Ok(sync)
}
