use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storecache::api::types::ProductFilter;
use storecache::{CacheLayer, CachedStoreClient, Config, StoreClient};

#[derive(Parser, Debug)]
#[command(name = "storecache")]
#[command(about = "Cached client for the storefront API")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./storecache.yaml or $XDG_CONFIG_HOME/storecache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Override the API base URL
  #[arg(long)]
  api_url: Option<String>,

  /// Bypass the cache entirely
  #[arg(long)]
  no_cache: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List products, optionally filtered
  Products {
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    product_type: Option<String>,
    #[arg(long)]
    featured: Option<bool>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    #[arg(long)]
    limit: Option<u32>,
  },
  /// Show a single product
  Product { product_id: String },
  /// Show trending products
  Trending {
    #[arg(long, default_value_t = 8)]
    limit: u32,
  },
  /// Show reviews for a product
  Reviews {
    product_id: String,
    #[arg(long, default_value_t = 20)]
    limit: u32,
  },
  /// Show cache statistics
  Stats,
  /// Drop cached entries, all of them or only those under a prefix
  Invalidate { prefix: Option<String> },
}

/// Initialize the tracing subscriber for logging.
fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(filter)
    .init();
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  init_tracing();

  let args = Args::parse();

  let mut config = Config::load(args.config.as_deref())?;
  if let Some(url) = args.api_url {
    config.api.base_url = url;
  }
  if args.no_cache {
    config.cache.enabled = false;
  }

  let store = config.cache.build_store()?;
  let cache = CacheLayer::with_policy(store, config.cache.policy());
  let client = CachedStoreClient::new(StoreClient::new(&config.api.base_url)?, cache);

  match args.command {
    Command::Products {
      category,
      product_type,
      featured,
      search,
      min_price,
      max_price,
      limit,
    } => {
      let filter = ProductFilter {
        category,
        product_type,
        featured,
        search,
        min_price,
        max_price,
        limit,
      };
      let products = client.list_products(&filter).await?;
      println!("{}", serde_json::to_string_pretty(&products)?);
    }
    Command::Product { product_id } => {
      let product = client.get_product(&product_id).await?;
      println!("{}", serde_json::to_string_pretty(&product)?);
    }
    Command::Trending { limit } => {
      let products = client.trending_products(limit).await?;
      println!("{}", serde_json::to_string_pretty(&products)?);
    }
    Command::Reviews { product_id, limit } => {
      let reviews = client.product_reviews(&product_id, limit).await?;
      println!("{}", serde_json::to_string_pretty(&reviews)?);
    }
    Command::Stats => {
      let stats = client.stats();
      println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Command::Invalidate { prefix } => {
      let removed = client
        .cache()
        .invalidate_prefix(prefix.as_deref().unwrap_or(""));
      println!("removed {} cached entries", removed);
    }
  }

  Ok(())
}
