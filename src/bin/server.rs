//! respwire demo server
//!
//! Serves a handful of commands (PING, ECHO, TIME, QUIT) to show the
//! handler boundary.

use std::net::TcpListener;
use std::time::{Duration, SystemTime};

use clap::Parser;
use respwire::protocol::AsError;
use respwire::{HandlerError, ResponseWriter, Server, ServerConfig, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// respwire demo server
#[derive(Parser, Debug)]
#[command(name = "respwire-server")]
#[command(about = "Demo RESP server built on respwire")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    listen: String,

    /// Read timeout in milliseconds (0 disables)
    #[arg(long, default_value = "15000")]
    read_timeout_ms: u64,

    /// Write timeout in milliseconds (0 disables)
    #[arg(long, default_value = "0")]
    write_timeout_ms: u64,

    /// Maximum array nesting accepted from clients
    #[arg(long, default_value = "512")]
    max_depth: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,respwire=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("respwire server v{}", respwire::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = ServerConfig::builder()
        .listen_addr(&args.listen)
        .read_timeout(Duration::from_millis(args.read_timeout_ms))
        .write_timeout(Duration::from_millis(args.write_timeout_ms))
        .max_depth(args.max_depth)
        .build();

    let listener = match TcpListener::bind(&config.listen_addr) {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.listen_addr, e);
            std::process::exit(1);
        }
    };

    let server = Server::with_config(config, demo_handler);
    if let Err(e) = server.serve(listener) {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

fn demo_handler(w: &mut ResponseWriter, request: Value) -> Result<(), HandlerError> {
    let args = match request.as_string_list() {
        Ok(args) => args,
        Err(e) => {
            w.write(&AsError(format!("ERR {}", e)))?;
            return Ok(());
        }
    };

    let Some((name, rest)) = args.split_first() else {
        w.write(&AsError("ERR empty command"))?;
        return Ok(());
    };

    match (name.to_ascii_uppercase().as_str(), rest) {
        ("PING", []) => w.write("PONG")?,
        ("PING", [msg]) | ("ECHO", [msg]) => w.write(msg)?,
        ("TIME", []) => w.write(&SystemTime::now())?,
        ("QUIT", []) => {
            w.write("OK")?;
            w.close();
        }
        (cmd, _) => w.write(&AsError(format!(
            "ERR unknown command or wrong number of arguments for '{}'",
            cmd
        )))?,
    }
    Ok(())
}
