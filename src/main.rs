use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use sathi::config::Config;
use sathi::connectivity::{self, ConnectivityMonitor};
use sathi::logging;
use sathi::store::{KvBackend, LocalStore, MemoryKv, SqliteKv};
use sathi::sync::{BackgroundSync, HttpSink, NullSink, SyncReport};
use sathi::worker::{
  CacheStorage, CacheWorker, GatedFetcher, HttpFetcher, MemoryCacheStorage, Request,
  SqliteCacheStorage, WorkerSettings,
};

#[derive(Parser, Debug)]
#[command(name = "sathi")]
#[command(about = "Offline data cache and response cache for Maa Sathi Seva")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/sathi/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Origin to serve for (overrides config)
  #[arg(long)]
  origin: Option<String>,

  /// Treat the network as unreachable
  #[arg(long)]
  offline: bool,

  /// Keep everything in memory for this run
  #[arg(long)]
  ephemeral: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Store a JSON value under a key
  Put { key: String, json: String },
  /// Print the value stored under a key
  Get { key: String },
  /// Delete a key
  Remove { key: String },
  /// List stored keys
  Keys,
  /// Request a path through the response cache
  Fetch {
    target: String,
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,
    /// Accept header to send
    #[arg(long)]
    accept: Option<String>,
  },
  /// Precache the app shell and purge old cache generations
  Install,
  /// List cache generations and the current one's entries
  Caches,
  /// Fire the background sync signal
  Sync {
    /// Signal tag (defaults to the configured one)
    #[arg(long)]
    tag: Option<String>,
  },
  /// Show connectivity and stored data
  Status,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let config = if let Some(origin) = args.origin.clone() {
    Config { origin, ..config }
  } else {
    config
  };

  let _log_guard = logging::init(&config)?;

  if args.ephemeral {
    run(
      args,
      config,
      MemoryKv::new(),
      Arc::new(MemoryCacheStorage::new()),
    )
    .await
  } else {
    let path = config.database_path()?;
    let kv = SqliteKv::open(&path)?;
    let responses = Arc::new(SqliteCacheStorage::open_at(&path)?);
    run(args, config, kv, responses).await
  }
}

async fn run<B, S>(args: Args, config: Config, kv: B, responses: Arc<S>) -> Result<()>
where
  B: KvBackend + 'static,
  S: CacheStorage + 'static,
{
  let settings = WorkerSettings::from_config(&config)?;
  let http = HttpFetcher::new(settings.origin.clone())?;

  let monitor = ConnectivityMonitor::new(!args.offline);
  if !args.offline && matches!(args.command, Command::Sync { .. } | Command::Status) {
    monitor
      .check_reachability(|| connectivity::head_check(http.client(), settings.origin.as_str()))
      .await;
  }

  let store = LocalStore::new(kv, monitor.connectivity());
  let fetcher = GatedFetcher::new(http.clone(), monitor.connectivity());
  let mut worker = CacheWorker::new(responses, fetcher, settings);

  match args.command {
    Command::Put { key, json } => {
      let value: Value =
        serde_json::from_str(&json).map_err(|e| eyre!("Value is not valid JSON: {}", e))?;
      store.store(&key, &value);
    }
    Command::Get { key } => match store.load::<Value>(&key) {
      Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
      None => println!("(absent)"),
    },
    Command::Remove { key } => store.remove(&key),
    Command::Keys => {
      for key in store.keys() {
        println!("{}", key);
      }
    }
    Command::Fetch {
      target,
      method,
      accept,
    } => {
      let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|e| eyre!("Invalid method '{}': {}", method, e))?;
      let url = worker.settings().resolve(&target)?;
      let mut request = Request::new(method, url);
      if let Some(accept) = accept {
        request = request.with_header("accept", &accept);
      }

      if !worker.resume()? {
        worker.install().await?;
        worker.activate()?;
      }

      let response = worker.fetch(&request).await?;
      println!("{} ({})", response.status, response.kind.as_str());
      println!("{}", response.text());
      worker.settle().await;
    }
    Command::Install => {
      let cached = worker.install().await?;
      let purged = worker.activate()?;
      println!("Cached {} assets in {}", cached, worker.settings().cache_name);
      for name in purged {
        println!("Purged {}", name);
      }
    }
    Command::Caches => {
      let current = worker.settings().cache_name.clone();
      for name in worker.cache_names()? {
        let marker = if name == current { "*" } else { " " };
        println!("{} {}", marker, name);
      }
      for entry in worker.cached_entries()? {
        println!("    {}", entry);
      }
    }
    Command::Sync { tag } => {
      let tag = tag.unwrap_or_else(|| config.sync.tag.clone());
      let keys = config.sync.keys.clone();

      let report = match &config.sync.endpoint {
        Some(endpoint) => {
          let sink = HttpSink::new(http.client().clone(), endpoint)?;
          let handler = BackgroundSync::new(store.clone(), sink, keys);
          worker.on_sync(&tag, &handler).await
        }
        None => {
          let handler = BackgroundSync::new(store.clone(), NullSink, keys);
          worker.on_sync(&tag, &handler).await
        }
      };

      match report {
        Some(report) => print_report(&report),
        None => println!("Tag '{}' ignored", tag),
      }
    }
    Command::Status => {
      let online = store.is_online();
      println!("Connectivity: {}", if online { "online" } else { "offline" });
      println!("Cache: {}", worker.settings().cache_name);
      println!("Stored keys:");
      for key in store.keys() {
        println!("  {}", key);
      }
    }
  }

  Ok(())
}

fn print_report(report: &SyncReport) {
  for key in &report.flushed {
    println!("flushed  {}", key);
  }
  for key in &report.retained {
    println!("retained {}", key);
  }
  for key in &report.skipped {
    println!("skipped  {}", key);
  }
}
