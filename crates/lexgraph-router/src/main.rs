//! Lexgraph Router CLI
//!
//! Starts the Router HTTP server in front of the conflict engine.

use lexgraph_router::{config::RouterConfig, start_server, RouterError};
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), RouterError> {
    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        RouterConfig::from_file(&args[2])?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("Warning: No config file specified, using an in-memory case database");
        eprintln!("Usage: lexgraph-router --config <path-to-config.toml>");
        eprintln!();
        RouterConfig::default_test_config()
    };

    start_server(config).await?;

    Ok(())
}

fn print_help() {
    println!("Lexgraph Router - Conflict-of-interest queries over HTTP");
    println!();
    println!("USAGE:");
    println!("    lexgraph-router --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("CONFIGURATION:");
    println!("    bind_address           IP address to bind (e.g., '127.0.0.1')");
    println!("    bind_port              Port number (e.g., 8080)");
    println!("    request_timeout_secs   Per-request deadline (default: 30)");
    println!("    database_path          SQLite case database");
    println!("    [engine]               cache_capacity, max_nodes, max_edges,");
    println!("                           default_max_hops, max_hops_limit");
    println!("    [prediction]           endpoint, timeout_secs");
    println!();
    println!("Log verbosity follows RUST_LOG (default: info).");
}
