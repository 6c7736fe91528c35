//! oracle-host: run a wasm guest against a preimage oracle
//!
//! Usage:
//!   oracle-host guest.wasm --mode offline --data-dir ./bin
//!   oracle-host guest.wasm --mode input-feed --input 68656c6c6f
//!   oracle-host guest.wasm --config host.json -- guest-arg ...
//!
//! Prints `maximum memory usage: <bytes>` on stdout when the guest stops and
//! exits with the guest's status. Logs go to stderr.

use std::path::PathBuf;

use clap::Parser;
use oracle_core::{ClockMode, HostConfig, InputSource, Mode};
use oracle_host::{run_to_report, ExitReason};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "oracle-host")]
#[command(about = "Run a wasm guest with a preimage oracle")]
struct Args {
    /// Guest module (.wasm or .wat)
    wasm: PathBuf,

    /// JSON host config; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// online, offline, sequential or input-feed
    #[arg(short = 'm', long)]
    mode: Option<Mode>,

    /// Offline preimage table
    #[arg(long)]
    preimages_json: Option<PathBuf>,

    /// Sequential preimage blob
    #[arg(long)]
    preimages_bin: Option<PathBuf>,

    /// Directory holding preimages.json and preimages.bin
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Hex input item for wasm_input (repeatable)
    #[arg(short = 'i', long = "input")]
    inputs: Vec<String>,

    /// items or blob
    #[arg(long)]
    input_source: Option<InputSource>,

    /// host or deterministic
    #[arg(long)]
    clock: Option<ClockMode>,

    /// Reject tables whose keys are not keccak256 of their values
    #[arg(long)]
    verify_keccak: bool,

    /// Exported function to run
    #[arg(long)]
    entry_point: Option<String>,

    /// Hint pipe descriptor (host -> oracle)
    #[arg(long)]
    hint_fd: Option<i32>,

    /// Key pipe descriptor (host -> oracle)
    #[arg(long)]
    key_fd: Option<i32>,

    /// Length response descriptor (oracle -> host)
    #[arg(long)]
    length_fd: Option<i32>,

    /// Data response descriptor (oracle -> host)
    #[arg(long)]
    data_fd: Option<i32>,

    /// Arguments passed to the guest
    #[arg(last = true)]
    guest_args: Vec<String>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(PathBuf, HostConfig)> {
        let mut config = match &self.config {
            Some(path) => HostConfig::load(path)?,
            None => HostConfig::default(),
        };

        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(dir) = self.data_dir {
            config = config.with_data_dir(dir);
        }
        if let Some(path) = self.preimages_json {
            config.preimages_json = path;
        }
        if let Some(path) = self.preimages_bin {
            config.preimages_bin = path;
        }
        if !self.inputs.is_empty() {
            config.inputs = self.inputs;
        }
        if let Some(source) = self.input_source {
            config.input_source = source;
        }
        if let Some(clock) = self.clock {
            config.clock = Some(clock);
        }
        config.verify_keccak |= self.verify_keccak;
        if let Some(entry) = self.entry_point {
            config.entry_point = entry;
        }
        if let Some(fd) = self.hint_fd {
            config.fds.hint_write = fd;
        }
        if let Some(fd) = self.key_fd {
            config.fds.key_write = fd;
        }
        if let Some(fd) = self.length_fd {
            config.fds.length_read = fd;
        }
        if let Some(fd) = self.data_fd {
            config.fds.data_read = fd;
        }
        if !self.guest_args.is_empty() {
            config.guest_args = self.guest_args;
        }

        Ok((self.wasm, config))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("oracle_host=info".parse()?))
        .init();

    let (wasm, config) = Args::parse().into_config()?;
    tracing::info!(wasm = %wasm.display(), mode = %config.mode, "oracle-host starting");

    let report = run_to_report(config, &wasm);

    println!("{}", report.memory_line());
    tracing::info!(
        peak_memory_bytes = report.peak_memory_bytes,
        exit_code = report.exit_code(),
        outputs = report.outputs.len(),
        "Run complete"
    );
    if let ExitReason::Fatal(msg) | ExitReason::Trap(msg) = &report.exit {
        eprintln!("error: {msg}");
    }

    std::process::exit(report.exit_code());
}
