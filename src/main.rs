//! SPA edge gateway.
//!
//! ```text
//!                    ┌───────────────────────────────────────────────┐
//!   Client Request   │  ┌────────┐   ┌──────────┐   ┌─────────────┐  │
//!   ─────────────────┼─▶│  http  │──▶│ routing  │──▶│ forward/ws  │──┼──▶ api / uc / git / UI bundles
//!                    │  │ server │   │  rules   │   └─────────────┘  │
//!                    │  └────────┘   └────┬─────┘                    │
//!                    │                    │ no rule                  │
//!                    │                    ▼                          │
//!   Client Response  │            ┌───────────────┐                  │
//!   ◀────────────────┼────────────│ static files  │                  │
//!                    │            │ → SPA shell   │                  │
//!                    │            │ → 404         │                  │
//!                    │            └───────────────┘                  │
//!                    └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use clap::{Args, Parser, Subcommand};

use spa_edge_proxy::config::{load_config, ResolvedConfig};
use spa_edge_proxy::fallback::FallbackResolver;
use spa_edge_proxy::http::error_chain;
use spa_edge_proxy::lifecycle::{self, signals, Shutdown};
use spa_edge_proxy::observability::{logging, metrics};
use spa_edge_proxy::routing::{RequestHead, Router};

#[derive(Parser)]
#[command(name = "spa-edge-proxy")]
#[command(about = "Edge gateway: proxy rules, static assets and SPA shell fallback", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway (default)
    Serve(ServeArgs),
    /// Print how a request would be dispatched, without starting the server
    Route(RouteArgs),
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Re-render the shell when the template changes
    #[arg(long)]
    dev: bool,
}

#[derive(Args)]
struct RouteArgs {
    /// Request path, optionally with a query string
    path: String,

    #[arg(short, long, default_value = "GET")]
    method: String,

    /// Request header as `name:value` (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => {
            if let Err(err) = serve(cli.config, args).await {
                eprintln!("Error: {}", error_chain(err.as_ref()));
                std::process::exit(1);
            }
        }
        Commands::Route(args) => route(cli.config, args)?,
    }

    Ok(())
}

async fn serve(
    config_path: Option<PathBuf>,
    args: ServeArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    if args.dev {
        config.shell.dev_mode = true;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "spa-edge-proxy starting");

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let gateway = lifecycle::prepare(&config)?;
    let listener = gateway.bind().await?;

    let shutdown = Shutdown::new();
    let _signal_task = signals::spawn_signal_handler(shutdown.clone());

    gateway.serve(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn route(config_path: Option<PathBuf>, args: RouteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path.as_deref())?;
    let resolved = ResolvedConfig::from_config(&config)?;
    let router = Router::from_config(&resolved);

    let method: Method = args.method.to_ascii_uppercase().parse()?;
    let mut headers = HeaderMap::new();
    for raw in &args.headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("header `{}` is not in name:value form", raw))?;
        headers.append(
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        );
    }
    let (path, query) = match args.path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (args.path.as_str(), None),
    };

    let head = RequestHead::new(&method, path, query, &headers);
    match router.match_request(&head) {
        Some(rule) => {
            let routed = rule.rewrite_path(path, query);
            println!("rule:      {}", rule.id);
            println!("upstream:  {}", rule.upstream_url(&routed));
            println!("path:      {}", routed.path_and_query());
            println!("org:       {}", routed.org.as_deref().unwrap_or("-"));
            for (name, value) in rule.inject_headers(&routed) {
                println!("header:    {}: {}", name, value);
            }
        }
        None => {
            let decision = FallbackResolver::new(resolved.shell.deep_link.clone()).decide(path);
            println!("rule:      none");
            println!("fallback:  {} (unless a static file exists)", decision.as_str());
        }
    }

    Ok(())
}
