//! `download` command: resumable, verified file download.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use httpstash::download::DigestAlgorithm;
use httpstash::{Client, ClientConfig, DownloadRequest, FetchError, Request};

use super::{install_interrupt_handler, parse_header};
use crate::error::CliError;

fn transfer_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {bytes}/{total_bytes} @ {bytes_per_sec} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} {bytes} @ {bytes_per_sec}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Arguments for the download command.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// URL to download
    pub url: String,

    /// Target directory
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Target file name (derived from the response when omitted)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Continue a partial file with a range request
    #[arg(long)]
    pub resume: bool,

    /// Delete an existing file before downloading
    #[arg(long, conflicts_with = "resume")]
    pub overwrite: bool,

    /// Expected MD5 digest
    #[arg(long)]
    pub md5: Option<String>,

    /// Expected SHA-1 digest
    #[arg(long)]
    pub sha1: Option<String>,

    /// Expected SHA-256 digest
    #[arg(long)]
    pub sha256: Option<String>,

    /// Request header as 'Name: value' (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,
}

/// Run the download command.
pub fn run(config: ClientConfig, args: DownloadArgs) -> Result<(), CliError> {
    if args.resume && args.name.is_none() {
        return Err(CliError::Usage("--resume needs --name to locate the partial file".to_string()));
    }

    let client = Client::configure(config)?;
    install_interrupt_handler(&client)?;

    let mut request = Request::get(&args.url);
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        request.headers.append(name, value);
    }

    let bar = ProgressBar::new(0);
    bar.set_style(spinner_style());
    bar.set_message(format!("Downloading {}", args.url));
    bar.enable_steady_tick(Duration::from_millis(200));

    let transfer_bar = bar.clone();
    let verify_bar = bar.clone();
    let mut download = DownloadRequest::new(request, &args.dir)
        .with_resume(args.resume)
        .with_overwrite(args.overwrite)
        .on_progress(move |progress| {
            if let Some(total) = progress.total {
                if transfer_bar.length() != Some(total) {
                    transfer_bar.set_style(transfer_style());
                    transfer_bar.set_length(total);
                }
            }
            transfer_bar.set_position(progress.bytes);
        })
        .on_verify(move |algorithm: DigestAlgorithm, progress| {
            verify_bar.set_message(format!("Verifying {}", algorithm));
            if let Some(total) = progress.total {
                verify_bar.set_length(total);
            }
            verify_bar.set_position(progress.bytes);
        });
    if let Some(name) = args.name {
        download = download.with_filename(name);
    }
    if let Some(md5) = args.md5 {
        download = download.with_md5(md5);
    }
    if let Some(sha1) = args.sha1 {
        download = download.with_sha1(sha1);
    }
    if let Some(sha256) = args.sha256 {
        download = download.with_sha256(sha256);
    }

    let result = client.download_async(download).wait();
    bar.finish_and_clear();

    match result {
        Ok(path) => {
            println!("{} {}", style("Downloaded").green().bold(), path.display());
            Ok(())
        }
        Err(FetchError::CallCanceled) => {
            eprintln!(
                "{} partial file kept, rerun with --resume to continue",
                style("Cancelled:").yellow()
            );
            Err(CliError::Fetch(FetchError::CallCanceled))
        }
        Err(e @ FetchError::FileVerification { .. }) => {
            eprintln!("{} the file was kept for inspection", style("Verification failed:").red());
            Err(CliError::Fetch(e))
        }
        Err(e) => Err(CliError::Fetch(e)),
    }
}
