//! Execution driver: instantiate the guest, run it, report how it ended

use std::path::Path;

use oracle_core::HostConfig;
use wasmtime::{Engine, Linker, Module, Store};
use wasmtime_wasi::preview1::WasiP1Ctx;
use wasmtime_wasi::{I32Exit, WasiCtxBuilder};

use crate::bridge::OracleBridge;
use crate::clock::GuestClock;
use crate::error::{HostError, Result, Termination};
use crate::imports;
use crate::input_feed::InputFeed;
use crate::metrics;
use crate::monitor::MemoryMonitor;
use crate::source::{open_source, PreimageSource};

/// Per-run state owned by the wasmtime store
pub struct HostState {
    pub(crate) wasi: WasiP1Ctx,
    pub(crate) bridge: Option<OracleBridge>,
    pub(crate) feed: InputFeed,
    pub(crate) monitor: MemoryMonitor,
    pub(crate) clock: GuestClock,
    pub(crate) outputs: Vec<u64>,
}

/// How the guest stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Entry point returned
    Completed,
    /// `wasm_exit` or WASI `proc_exit`
    Exit(i32),
    /// `require(0)`
    AssertionFailed,
    /// Host-side failure: missing data, closed channel, bad pointer
    Fatal(String),
    /// Guest trapped on its own
    Trap(String),
}

impl ExitReason {
    fn from_result(result: anyhow::Result<()>) -> Self {
        let err = match result {
            Ok(()) => return ExitReason::Completed,
            Err(err) => err,
        };
        if let Some(termination) = err.downcast_ref::<Termination>() {
            return match termination {
                Termination::Exit(code) => ExitReason::Exit(*code),
                Termination::AssertionFailed => ExitReason::AssertionFailed,
            };
        }
        if let Some(exit) = err.downcast_ref::<I32Exit>() {
            return ExitReason::Exit(exit.0);
        }
        if let Some(host) = err.downcast_ref::<HostError>() {
            return ExitReason::Fatal(host.to_string());
        }
        ExitReason::Trap(format!("{err:#}"))
    }

    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitReason::Completed => 0,
            ExitReason::Exit(code) => *code,
            ExitReason::AssertionFailed | ExitReason::Fatal(_) | ExitReason::Trap(_) => 1,
        }
    }
}

/// Outcome of one guest run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub exit: ExitReason,
    pub peak_memory_bytes: u64,
    /// Values reported through `wasm_output`, in order
    pub outputs: Vec<u64>,
}

impl RunReport {
    /// Report for a run that failed before the guest started
    pub fn aborted(err: &HostError) -> Self {
        Self {
            exit: ExitReason::Fatal(err.to_string()),
            peak_memory_bytes: 0,
            outputs: Vec::new(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit.exit_code()
    }

    /// Peak memory line printed when the host exits
    pub fn memory_line(&self) -> String {
        format!("maximum memory usage: {}", self.peak_memory_bytes)
    }
}

/// Builds a [`HostRunner`], opening backends from the config unless given
pub struct RunnerBuilder {
    config: HostConfig,
    source: Option<Box<dyn PreimageSource>>,
    feed: Option<InputFeed>,
    inherit_stdio: bool,
}

impl RunnerBuilder {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            source: None,
            feed: None,
            inherit_stdio: true,
        }
    }

    /// Use `source` instead of the one `config.mode` would open
    pub fn source(mut self, source: Box<dyn PreimageSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn feed(mut self, feed: InputFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Pass the guest's stdout and stderr through to ours
    pub fn inherit_stdio(mut self, inherit: bool) -> Self {
        self.inherit_stdio = inherit;
        self
    }

    pub fn build(self) -> Result<HostRunner> {
        let source = match self.source {
            Some(source) => Some(source),
            None => open_source(&self.config)?,
        };
        let feed = match self.feed {
            Some(feed) => feed,
            None => InputFeed::from_config(&self.config)?,
        };

        let engine = Engine::default();
        let mut linker = Linker::new(&engine);
        imports::add_to_linker(&mut linker).map_err(|e| HostError::Link(e.to_string()))?;

        Ok(HostRunner {
            config: self.config,
            engine,
            linker,
            source,
            feed,
            inherit_stdio: self.inherit_stdio,
        })
    }
}

/// A configured host ready to run one guest module
pub struct HostRunner {
    config: HostConfig,
    engine: Engine,
    linker: Linker<HostState>,
    source: Option<Box<dyn PreimageSource>>,
    feed: InputFeed,
    inherit_stdio: bool,
}

impl HostRunner {
    pub fn builder(config: HostConfig) -> RunnerBuilder {
        RunnerBuilder::new(config)
    }

    /// Run a guest module given as wasm bytes
    pub fn run(self, wasm: &[u8]) -> Result<RunReport> {
        let module = Module::new(&self.engine, wasm).map_err(|e| HostError::Compile(e.to_string()))?;

        let mut wasi = WasiCtxBuilder::new();
        if self.inherit_stdio {
            wasi.inherit_stdout().inherit_stderr();
        }
        wasi.arg("guest");
        for arg in &self.config.guest_args {
            wasi.arg(arg);
        }

        let state = HostState {
            wasi: wasi.build_p1(),
            bridge: self.source.map(OracleBridge::new),
            feed: self.feed,
            monitor: MemoryMonitor::new(),
            clock: GuestClock::new(self.config.effective_clock()),
            outputs: Vec::new(),
        };
        let mut store = Store::new(&self.engine, state);

        let instance = self
            .linker
            .instantiate(&mut store, &module)
            .map_err(|e| HostError::Instantiate(format!("{e:#}")))?;
        let memory = instance.get_memory(&mut store, "memory");
        if let Some(memory) = memory {
            let size = memory.data_size(&store) as u64;
            store.data_mut().monitor.sample(size);
        }

        let entry = instance
            .get_typed_func::<(), ()>(&mut store, &self.config.entry_point)
            .map_err(|_| HostError::MissingEntryPoint(self.config.entry_point.clone()))?;

        tracing::info!(
            mode = %self.config.mode,
            entry = %self.config.entry_point,
            clock = ?self.config.effective_clock(),
            "Starting guest"
        );
        let result = entry.call(&mut store, ());

        if let Some(memory) = memory {
            let size = memory.data_size(&store) as u64;
            store.data_mut().monitor.sample(size);
        }

        let exit = ExitReason::from_result(result);
        let state = store.into_data();
        let peak_memory_bytes = state.monitor.report();
        metrics::set_peak_memory(peak_memory_bytes);

        match &exit {
            ExitReason::Completed | ExitReason::Exit(0) => {
                tracing::info!(?exit, peak_memory_bytes, "Guest finished")
            }
            ExitReason::Exit(_) | ExitReason::AssertionFailed => {
                tracing::warn!(?exit, peak_memory_bytes, "Guest exited with failure")
            }
            ExitReason::Fatal(_) | ExitReason::Trap(_) => {
                tracing::error!(?exit, peak_memory_bytes, "Guest run aborted")
            }
        }

        Ok(RunReport {
            exit,
            peak_memory_bytes,
            outputs: state.outputs,
        })
    }

    /// Run a guest module read from `path` (binary or text format)
    pub fn run_file(self, path: impl AsRef<Path>) -> Result<RunReport> {
        let wasm = std::fs::read(path.as_ref())?;
        self.run(&wasm)
    }
}

/// Build a host from `config` and run the module at `path`
///
/// Always yields a report: failures before or during instantiation become
/// an [`ExitReason::Fatal`] report with no memory sampled.
pub fn run_to_report(config: HostConfig, path: impl AsRef<Path>) -> RunReport {
    match HostRunner::builder(config)
        .build()
        .and_then(|runner| runner.run_file(path))
    {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(error = %err, "Guest run could not start");
            RunReport::aborted(&err)
        }
    }
}
