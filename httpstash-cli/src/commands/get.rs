//! `get` command: fetch a URL through the response cache.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use console::style;
use httpstash::http::Method;
use httpstash::{CacheMode, Client, ClientConfig, FetchRequest, Request, Response, ValidDuration};

use super::{install_interrupt_handler, parse_header};
use crate::error::CliError;

/// Arguments for the get command.
#[derive(Debug, Args)]
pub struct GetArgs {
    /// URL to fetch
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: Method,

    /// Cache mode: only-cache, only-network, cache-else-network, network-else-cache
    #[arg(long)]
    pub mode: Option<CacheMode>,

    /// Freshness window, e.g. 30s, 10m, 2h, never, forever
    #[arg(long)]
    pub ttl: Option<ValidDuration>,

    /// Request header as 'Name: value' (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Explicit cache key instead of the request fingerprint
    #[arg(long)]
    pub key: Option<String>,

    /// Salt mixed into the request fingerprint
    #[arg(long)]
    pub salt: Option<String>,

    /// Write the body to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print status line and headers to stderr
    #[arg(short, long)]
    pub include: bool,
}

/// Run the get command.
pub fn run(config: ClientConfig, args: GetArgs) -> Result<(), CliError> {
    let client = Client::configure(config)?;
    install_interrupt_handler(&client)?;

    let mut request = Request::new(args.method, &args.url);
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        request.headers.append(name, value);
    }

    let mut fetch = FetchRequest::<Response>::new(request);
    if let Some(mode) = args.mode {
        fetch = fetch.with_cache_mode(mode);
    }
    if let Some(ttl) = args.ttl {
        fetch = fetch.with_valid_duration(ttl);
    }
    if let Some(key) = args.key {
        fetch = fetch.with_cache_key(key);
    }
    if let Some(salt) = args.salt {
        fetch = fetch.with_cache_salt(salt);
    }

    let response = client.execute(fetch)?;
    if args.include {
        print_head(&response);
    }

    let source = if response.is_from_cache() { "cache" } else { "network" };
    let body = response.bytes().map_err(CliError::Output)?;

    match args.output {
        Some(path) => {
            File::create(&path)?.write_all(&body)?;
            eprintln!(
                "{} {} bytes from {} to {}",
                style("Saved").green(),
                body.len(),
                source,
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&body)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn print_head(response: &Response) {
    eprintln!(
        "{} {} {}",
        response.protocol,
        style(response.status).bold(),
        response.message
    );
    for (name, value) in response.headers.iter() {
        eprintln!("{}: {}", style(name).cyan(), value);
    }
    eprintln!();
}
