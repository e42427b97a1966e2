//! respwire CLI Client
//!
//! Sends one command as an array of bulk strings and prints the reply.

use std::io::Write;
use std::net::TcpStream;
use std::process::ExitCode;

use clap::Parser;
use respwire::protocol::{decode, encode_to_vec, ByteReader};

/// respwire CLI
#[derive(Parser, Debug)]
#[command(name = "respwire-cli")]
#[command(about = "Send a single command to a RESP server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    /// Command and arguments, e.g. `PING` or `ECHO hello`
    #[arg(required = true)]
    command: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> respwire::Result<()> {
    let mut stream = TcpStream::connect(&args.server)?;
    stream.write_all(&encode_to_vec(&args.command)?)?;
    stream.flush()?;

    let reply = decode(&mut ByteReader::new(stream));
    match reply.error() {
        Some(err) if reply.is(respwire::Kind::Invalid) => Err(err.clone()),
        _ => {
            println!("{}", reply);
            Ok(())
        }
    }
}
