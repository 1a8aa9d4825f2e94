//! dadata-proxy-cli — operator tool for the DaData proxy engine
//!
//! Usage:
//!   dadata-proxy-cli check-inn <inn>...                   Validate INN checksums
//!   dadata-proxy-cli key <path> <body>                    Print the cache key of a request
//!   dadata-proxy-cli ttl <path> [<response-file>]         Print the cache lifetime for a response
//!   dadata-proxy-cli request <path> <body> [--config f]   Run one request through the proxy

use anyhow::{bail, Context};
use dadata_proxy::cache::{request_key, TtlPolicy};
use dadata_proxy::config::ProxyConfig;
use dadata_proxy::inn::{self, InnKind};
use dadata_proxy::SuggestionProxyBuilder;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let outcome = match args[1].as_str() {
        "check-inn" => cmd_check_inn(&args[2..]),
        "key" => cmd_key(&args[2..]),
        "ttl" => cmd_ttl(&args[2..]),
        "request" => cmd_request(&args[2..]).await,
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"dadata-proxy-cli — DaData proxy operator tool

USAGE:
    dadata-proxy-cli <COMMAND> [OPTIONS]

COMMANDS:
    check-inn <inn>...                  Validate INN checksums
    key <path> <body>                   Print the cache key of a request
    ttl <path> [<response-file>]        Print the cache lifetime for a response
    request <path> <body> [--config f]  Run one request through the proxy
    version                             Show version information
    help                                Show this help message

ENVIRONMENT:
    DADATA_CONFIG                       YAML configuration file
    DADATA_API_KEY, DADATA_SECRET       Upstream credentials
    DADATA_REDIS_URL                    Shared store (in-process when unset)
    RUST_LOG                            Log filter (default: info)"#
    );
}

fn cmd_version() {
    println!("dadata-proxy-cli {}", env!("CARGO_PKG_VERSION"));
}

fn cmd_check_inn(args: &[String]) -> anyhow::Result<()> {
    if args.is_empty() {
        bail!("check-inn needs at least one INN");
    }
    let mut invalid = 0;
    for value in args {
        match inn::classify(value) {
            Some(InnKind::LegalEntity) => println!("✓ {value}  legal entity"),
            Some(InnKind::Individual) => println!("✓ {value}  individual"),
            None => {
                invalid += 1;
                println!("✗ {value}  invalid");
            }
        }
    }
    if invalid > 0 {
        bail!("{invalid} of {} values failed validation", args.len());
    }
    Ok(())
}

fn cmd_key(args: &[String]) -> anyhow::Result<()> {
    let [path, body] = args else {
        bail!("usage: key <path> <body>");
    };
    println!("{}", request_key(path, body));
    Ok(())
}

fn cmd_ttl(args: &[String]) -> anyhow::Result<()> {
    let Some(path) = args.first() else {
        bail!("usage: ttl <path> [<response-file>]");
    };
    let response = match args.get(1) {
        Some(file) => Some(
            std::fs::read_to_string(file).with_context(|| format!("reading {file}"))?,
        ),
        None => None,
    };
    let config = ProxyConfig::load(config_path(&[]).as_deref())?;
    let ttl = TtlPolicy::new(config.caching).select(path, response.as_deref())?;
    let secs = ttl.as_secs();
    if secs % 86_400 == 0 {
        println!("{} days", secs / 86_400);
    } else {
        println!("{} hours", secs / 3_600);
    }
    Ok(())
}

async fn cmd_request(args: &[String]) -> anyhow::Result<()> {
    let (Some(path), Some(body)) = (args.first(), args.get(1)) else {
        bail!("usage: request <path> <body> [--config <file>]");
    };
    let config = ProxyConfig::load(config_path(&args[2..]).as_deref())
        .context("loading configuration")?;
    let proxy = SuggestionProxyBuilder::from_config(&config)
        .await?
        .build()?;

    match proxy.handle_request(path, body).await {
        Ok(json) => {
            println!("{json}");
            Ok(())
        }
        Err(e) => bail!("HTTP {} {}: {}", e.status_code(), e.title(), e),
    }
}

fn config_path(args: &[String]) -> Option<PathBuf> {
    for (i, arg) in args.iter().enumerate() {
        if arg == "--config" {
            if let Some(path) = args.get(i + 1) {
                return Some(PathBuf::from(path));
            }
        }
    }
    std::env::var("DADATA_CONFIG").ok().map(PathBuf::from)
}
