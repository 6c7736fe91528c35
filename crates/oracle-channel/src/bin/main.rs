//! preimage-server: serve a preimage table over the oracle pipe protocol
//!
//! Reads keys from `--keys-fd` (stdin by default) and writes length-prefixed
//! answers to `--responses-fd` (stdout by default). Logs go to stderr.

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

use clap::Parser;
use oracle_channel::{HintReader, OracleServer};
use oracle_core::{HostConfig, PreimageTable};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "preimage-server")]
#[command(about = "Answer preimage requests from a JSON table")]
struct Args {
    /// Host config file; its table path and record dir are used as defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preimage table (hex key -> hex value)
    #[arg(long)]
    table: Option<PathBuf>,

    /// Descriptor the host writes keys to
    #[arg(long)]
    keys_fd: Option<i32>,

    /// Descriptor the host reads lengths and data from
    #[arg(long)]
    responses_fd: Option<i32>,

    /// Descriptor the host writes hints to
    #[arg(long)]
    hints_fd: Option<i32>,

    /// Dump served preimages as preimages.json / preimages.bin here
    #[arg(long)]
    record_dir: Option<PathBuf>,

    /// Reject tables whose keys are not keccak256 of their values
    #[arg(long)]
    verify_keccak: bool,
}

#[cfg(unix)]
fn open_fd(fd: i32) -> File {
    use std::os::fd::FromRawFd;
    // SAFETY: the descriptor is handed to this process by its parent and used only here.
    unsafe { File::from_raw_fd(fd) }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("oracle_channel=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };

    let table_path = args.table.unwrap_or(config.preimages_json);
    let table = PreimageTable::load(&table_path)?;
    if args.verify_keccak || config.verify_keccak {
        table.verify_keccak()?;
    }
    let record_dir = args.record_dir.or(config.record_dir);

    if let Some(fd) = args.hints_fd {
        let hints = open_fd(fd);
        std::thread::spawn(move || {
            let mut reader = HintReader::new(hints);
            loop {
                match reader.next_hint() {
                    Ok(Some(hint)) => {
                        tracing::info!(hint = %String::from_utf8_lossy(&hint), "Hint received")
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Hint stream failed");
                        break;
                    }
                }
            }
        });
    }

    let requests: Box<dyn Read> = match args.keys_fd {
        Some(fd) => Box::new(open_fd(fd)),
        None => Box::new(std::io::stdin()),
    };
    let responses: Box<dyn Write> = match args.responses_fd {
        Some(fd) => Box::new(open_fd(fd)),
        None => Box::new(std::io::stdout()),
    };

    let mut server = OracleServer::new(requests, responses);
    if record_dir.is_some() {
        server = server.with_recorder();
    }

    let served = server.serve(|key| {
        table
            .get(key)
            .map(|v| v.to_vec())
            .ok_or_else(|| anyhow::anyhow!("key not in {}", table_path.display()))
    })?;

    if let (Some(dir), Some(recorder)) = (record_dir, server.recorder()) {
        recorder.write_dir(&dir)?;
    }

    tracing::info!(served, "Preimage server finished");
    Ok(())
}
