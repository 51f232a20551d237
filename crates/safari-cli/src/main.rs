use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use safari_catalog::Catalog;
use safari_core::{run_query, CatalogKind, FilterState, PageSize};
use safari_web::WebConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "safari-cli")]
#[command(about = "Safari catalog command-line interface")]
struct Cli {
    /// Directory holding tours.json, destinations.json and site.yaml.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the web server.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one catalog query and print the page.
    Query(QueryArgs),
    /// Load the fixtures and report what was found.
    Check,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Tours,
    Destinations,
}

impl From<KindArg> for CatalogKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Tours => CatalogKind::Tour,
            KindArg::Destinations => CatalogKind::Destination,
        }
    }
}

#[derive(Debug, clap::Args)]
struct QueryArgs {
    #[arg(value_enum, default_value = "tours")]
    kind: KindArg,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    difficulty: Option<String>,
    /// Comma-separated tags; every tag must match.
    #[arg(long)]
    tags: Option<String>,
    #[arg(long = "q")]
    query: Option<String>,
    /// price-asc, price-desc, rating-desc or duration-asc.
    #[arg(long)]
    sort: Option<String>,
    #[arg(long)]
    page: Option<String>,
    #[arg(long, default_value_t = safari_core::DEFAULT_PAGE_SIZE)]
    page_size: usize,
    #[arg(long)]
    json: bool,
}

impl QueryArgs {
    // Same flat map the web layer receives, so the same fallbacks apply.
    fn to_query_map(&self) -> BTreeMap<String, String> {
        [
            (safari_core::PARAM_COUNTRY, &self.country),
            (safari_core::PARAM_DIFFICULTY, &self.difficulty),
            (safari_core::PARAM_TAGS, &self.tags),
            (safari_core::PARAM_QUERY, &self.query),
            (safari_core::PARAM_SORT, &self.sort),
            (safari_core::PARAM_PAGE, &self.page),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
        .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = WebConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            safari_web::serve(config).await?;
        }
        Commands::Query(args) => {
            let catalog = Catalog::load(&config.data_dir)
                .with_context(|| format!("loading catalog from {}", config.data_dir.display()))?;
            let page_size = PageSize::new(args.page_size)?;
            let state = FilterState::from_query_map(&args.to_query_map());
            let view = run_query(catalog.collection(args.kind.into()), &state, page_size);

            if args.json {
                println!("{}", serde_json::to_string_pretty(view.page_items())?);
            } else {
                for item in view.page_items() {
                    println!(
                        "{:<40} {:<10} {:>8.0} {:>4} {}",
                        item.title,
                        item.country,
                        item.price,
                        item.rating.map(|r| format!("{r:.1}")).unwrap_or_else(|| "-".into()),
                        item.duration_label
                    );
                }
                println!(
                    "page {}/{} ({} matched, sort {})",
                    view.page,
                    view.total_pages,
                    view.total_matched(),
                    state.sort
                );
            }
        }
        Commands::Check => {
            let catalog = Catalog::load(&config.data_dir)
                .with_context(|| format!("loading catalog from {}", config.data_dir.display()))?;
            info!(
                site = %catalog.site().business_name,
                tours = catalog.tours().len(),
                destinations = catalog.destinations().len(),
                "catalog ok"
            );
            println!(
                "catalog ok: tours={} destinations={} page_size={}",
                catalog.tours().len(),
                catalog.destinations().len(),
                catalog.site().page_size
            );
        }
    }

    Ok(())
}
