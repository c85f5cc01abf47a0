//! SorobanIndex CLI: run the ingestion pipeline and inspect its data.
//!
//! # Commands
//! ```text
//! sorobanindex run           --rpc-url <url> --horizon-url <url> [--database-url <url>]
//! sorobanindex decode        <base64>...
//! sorobanindex encode-topic  <segment>...
//! sorobanindex events        [--contract <id>] [--topic <text>] [--from <n>] [--to <n>]
//! sorobanindex probe         --rpc-url <url> --start <n> [--end <n>]
//! sorobanindex head          --horizon-url <url>
//! sorobanindex info
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};

use sorobanindex_codec::{decode_segment, encode_topics, pretty_base64, TopicSegment};
use sorobanindex_core::{EventQuery, LedgerRange, SEGMENT_KINDS};
use sorobanindex_rpc::{HttpClientConfig, HttpRpcClient};
use sorobanindex_stellar::{
    encode_filter_set, HorizonHeadTracker, IndexerBuilder, LedgerHeadSource, SorobanEventFetcher,
};

mod config;
mod handlers;
mod logging;
mod store;

use config::{LogArgs, RpcArgs, RunArgs, StoreArgs};
use store::StoreTarget;

#[derive(Parser)]
#[command(
    name = "sorobanindex",
    about = "Soroban contract event indexer",
    long_about = "
SorobanIndex: ingest Soroban contract events ledger range by ledger range,
dispatch them to handlers and persist them to SQLite or Postgres.

ENVIRONMENT VARIABLES:
  SOROBAN_RPC_URL   Soroban RPC endpoint
  HORIZON_URL       Horizon endpoint (ledger head)
  DATABASE_URL      postgres://…, sqlite:…, a SQLite path, or `memory`
  START_LEDGER      First ledger when no checkpoint exists
  CHUNK_SIZE        Ledgers per getEvents request
  CONTRACT_IDS      Comma-separated contract ids scoping the handlers
  NETWORK           Network label stored with each event
  LOG_LEVEL         trace | debug | info | warn | error
",
    version
)]
struct Cli {
    #[command(flatten)]
    log: LogArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ingestion pipeline until Ctrl-C or --to-ledger
    Run(RunArgs),

    /// Decode base64 XDR ScVal segments
    Decode {
        /// One or more base64 segments
        #[arg(required = true)]
        segments: Vec<String>,
        /// Print one JSON object per segment
        #[arg(long)]
        json: bool,
    },

    /// Encode human topic segments into the getEvents filter form
    #[command(name = "encode-topic")]
    EncodeTopic {
        /// Segments such as `TOKEN`, `u32:7`, `addr:G…` or `*`
        #[arg(required = true)]
        segments: Vec<String>,
    },

    /// Query persisted events
    Events {
        #[command(flatten)]
        store: StoreArgs,
        /// Emitting contract
        #[arg(long)]
        contract: Option<String>,
        /// Case-insensitive substring of the topic signature
        #[arg(long)]
        topic: Option<String>,
        /// Lowest ledger (inclusive)
        #[arg(long)]
        from: Option<u64>,
        /// Highest ledger (inclusive)
        #[arg(long)]
        to: Option<u64>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Count events in a range with exact, wildcard-topic and no filters
    Probe {
        #[command(flatten)]
        rpc: RpcArgs,
        /// First ledger
        #[arg(long)]
        start: u64,
        /// Last ledger (default: start + 99)
        #[arg(long)]
        end: Option<u64>,
        /// Comma-separated contract ids scoping the filters
        #[arg(long, env = "CONTRACT_IDS", default_value = "")]
        contract_ids: String,
    },

    /// Print the newest closed ledger reported by Horizon
    Head {
        #[arg(long, env = "HORIZON_URL")]
        horizon_url: String,
    },

    /// Show build and capability info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log.to_log_config());

    match cli.command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Decode { segments, json } => cmd_decode(&segments, json),
        Commands::EncodeTopic { segments } => cmd_encode_topic(&segments),
        Commands::Events {
            store,
            contract,
            topic,
            from,
            to,
            limit,
            offset,
        } => {
            let query = EventQuery {
                contract_id: contract,
                topic,
                from_ledger: from,
                to_ledger: to,
                limit: Some(limit),
                offset,
            };
            cmd_events(&store, &query).await
        }
        Commands::Probe {
            rpc,
            start,
            end,
            contract_ids,
        } => cmd_probe(&rpc, start, end, &contract_ids).await,
        Commands::Head { horizon_url } => cmd_head(&horizon_url).await,
        Commands::Info => cmd_info(),
    }
}

// ─── Command implementations ──────────────────────────────────────────────────

async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = args.to_indexer_config();
    let contract_ids = args.contract_ids();
    let target = StoreTarget::parse(&args.store.database_url);
    if target == StoreTarget::Memory {
        warn!("in-memory storage; events and checkpoints are lost on exit");
    }
    let stores = store::open(&target).await?;

    let builder = handlers::register_defaults(IndexerBuilder::from_config(config), &contract_ids);
    let mut indexer = builder
        .connect(
            &args.rpc.rpc_url,
            &args.horizon_url,
            stores.events,
            stores.checkpoints,
        )
        .context("building indexer")?;

    info!(
        rpc = %args.rpc.rpc_url,
        horizon = %args.horizon_url,
        network = %indexer.config().network,
        start_ledger = indexer.config().start_ledger,
        chunk_size = indexer.config().chunk_size,
        filter_groups = indexer.filters().filters().len(),
        "starting indexer"
    );

    indexer
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            info!("shutdown requested");
        })
        .await?;

    info!(cursor = indexer.cursor().next_ledger, "indexer stopped");
    Ok(())
}

fn cmd_decode(segments: &[String], as_json: bool) -> Result<()> {
    for seg in segments {
        let decoded = decode_segment(seg);
        if as_json {
            let mut out = json!({
                "input": seg,
                "value": decoded.json,
                "signature": decoded.piece,
            });
            if let Some(e) = &decoded.error {
                out["error"] = json!(e.to_string());
            }
            println!("{}", serde_json::to_string(&out)?);
        } else {
            println!("{seg}");
            println!("  debug:     {}", pretty_base64(seg));
            println!("  json:      {}", decoded.json);
            println!("  signature: {}", decoded.piece);
        }
    }
    Ok(())
}

fn cmd_encode_topic(segments: &[String]) -> Result<()> {
    let encoded = encode_topics(segments).context("encoding topic segments")?;
    for (seg, enc) in segments.iter().zip(&encoded) {
        match enc {
            TopicSegment::Wildcard => println!("{seg:<24} *"),
            TopicSegment::Encoded(b64) => println!("{seg:<24} {b64}"),
        }
    }
    let row: Vec<String> = encoded.into_iter().map(TopicSegment::into_string).collect();
    println!("{}", serde_json::to_string(&row)?);
    Ok(())
}

async fn cmd_events(store_args: &StoreArgs, query: &EventQuery) -> Result<()> {
    let target = StoreTarget::parse(&store_args.database_url);
    if target == StoreTarget::Memory {
        anyhow::bail!("events needs a persistent DATABASE_URL (sqlite or postgres)");
    }
    let stores = store::open(&target).await?;
    let rows = stores.events.query_events(query).await?;
    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }
    eprintln!("{} event(s)", rows.len());
    Ok(())
}

async fn cmd_probe(rpc: &RpcArgs, start: u64, end: Option<u64>, contract_ids: &str) -> Result<()> {
    let end = end.unwrap_or(start.saturating_add(99));
    anyhow::ensure!(end >= start, "--end {end} is below --start {start}");
    let range = LedgerRange { start, end };

    let table = handlers::register_defaults(IndexerBuilder::new(), &config::split_list(contract_ids))
        .build_handlers()?;
    let filters = encode_filter_set(&table)?;

    let client = HttpRpcClient::new(rpc.rpc_url.as_str(), HttpClientConfig::default())?;
    let fetcher = SorobanEventFetcher::new(client, IndexerBuilder::new().build_config().page_limit);
    let report = fetcher.probe_range(range, &filters).await?;

    println!("range {range}");
    println!("  exact filters:   {}", report.exact);
    println!("  wildcard topics: {}", report.wildcard_topics);
    println!("  no filters:      {}", report.unfiltered);
    Ok(())
}

async fn cmd_head(horizon_url: &str) -> Result<()> {
    let tracker = HorizonHeadTracker::new(horizon_url)?;
    println!("{}", tracker.latest_ledger().await?);
    Ok(())
}

fn cmd_info() -> Result<()> {
    println!("SorobanIndex v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Capabilities:");
    println!("  ✓ ScVal XDR decoding         (all value kinds, 128/256-bit integers)");
    println!("  ✓ Topic filter encoding      ({})", SEGMENT_KINDS.join(", "));
    println!("  ✓ Client-side filter match   (first match or all matches)");
    println!("  ✓ Ranged getEvents fetch     (retention-window reposition)");
    println!("  ✓ Ledger head tracking       (Horizon)");
    println!("  ✓ Checkpointed cursor        (resume after restart)");
    println!();
    println!("Storage backends:              memory, sqlite, postgres");
    println!();
    println!("Default handlers:");
    for (name, [namespace, action]) in handlers::DEFAULT_TOPICS {
        println!("  {name:<18} {namespace}:{action}:*:*");
    }
    Ok(())
}
