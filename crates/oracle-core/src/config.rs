//! Host configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{DEFAULT_PREIMAGES_BIN, DEFAULT_PREIMAGES_JSON};

/// Protocol version constant
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Where the guest's preimages come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Live oracle process over pipes
    #[default]
    Online,
    /// Preloaded JSON table
    Offline,
    /// Blob replayed in request order
    Sequential,
    /// Guest pulls inputs through `wasm_input` only
    InputFeed,
}

impl Mode {
    /// Replay modes must not observe host time
    pub fn is_replay(&self) -> bool {
        !matches!(self, Mode::Online)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Online => write!(f, "online"),
            Mode::Offline => write!(f, "offline"),
            Mode::Sequential => write!(f, "sequential"),
            Mode::InputFeed => write!(f, "input-feed"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Mode::Online),
            "offline" | "replay" => Ok(Mode::Offline),
            "sequential" => Ok(Mode::Sequential),
            "input-feed" | "zk" => Ok(Mode::InputFeed),
            other => Err(format!("unknown mode {other:?}")),
        }
    }
}

/// Backing data for `wasm_input`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    /// Configured hex items, length word then chunks
    #[default]
    Items,
    /// Raw 8-byte words from the preimage blob
    Blob,
}

impl FromStr for InputSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "items" => Ok(InputSource::Items),
            "blob" => Ok(InputSource::Blob),
            other => Err(format!("unknown input source {other:?}")),
        }
    }
}

/// Time source seen by the guest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    Host,
    Deterministic,
}

impl FromStr for ClockMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(ClockMode::Host),
            "deterministic" => Ok(ClockMode::Deterministic),
            other => Err(format!("unknown clock {other:?}")),
        }
    }
}

/// File descriptors shared with the oracle process
///
/// The assignment is an external contract with the oracle; it is not
/// negotiated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FdConfig {
    /// host -> oracle hints
    pub hint_write: i32,
    /// host -> oracle key requests
    pub key_write: i32,
    /// oracle -> host length responses
    pub length_read: i32,
    /// oracle -> host data responses
    pub data_read: i32,
}

impl Default for FdConfig {
    fn default() -> Self {
        Self {
            hint_write: 4,
            key_write: 6,
            length_read: 5,
            data_read: 5,
        }
    }
}

/// Configuration for one guest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub mode: Mode,
    /// Offline table path
    #[serde(default = "default_preimages_json")]
    pub preimages_json: PathBuf,
    /// Streaming blob path
    #[serde(default = "default_preimages_bin")]
    pub preimages_bin: PathBuf,
    #[serde(default)]
    pub fds: FdConfig,
    /// Hex-encoded items for the input feed
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub input_source: InputSource,
    /// Time source; derived from the mode when unset
    #[serde(default)]
    pub clock: Option<ClockMode>,
    /// Reject tables whose keys are not keccak256 of their values
    #[serde(default)]
    pub verify_keccak: bool,
    /// Exported function to run
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    /// Arguments passed to the guest through WASI
    #[serde(default)]
    pub guest_args: Vec<String>,
    /// Where a serving oracle dumps what it served
    #[serde(default)]
    pub record_dir: Option<PathBuf>,
    /// Protocol version
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_preimages_json() -> PathBuf {
    PathBuf::from(DEFAULT_PREIMAGES_JSON)
}

fn default_preimages_bin() -> PathBuf {
    PathBuf::from(DEFAULT_PREIMAGES_BIN)
}

fn default_entry_point() -> String {
    "_start".to_string()
}

fn default_version() -> String {
    PROTOCOL_VERSION.to_string()
}

impl HostConfig {
    /// Configuration for a mode with every other field defaulted
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Point both data files at `dir/preimages.{json,bin}`
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.preimages_json = dir.join("preimages.json");
        self.preimages_bin = dir.join("preimages.bin");
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_input_source(mut self, source: InputSource) -> Self {
        self.input_source = source;
        self
    }

    pub fn with_clock(mut self, clock: ClockMode) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Clock in effect: explicit setting, else deterministic for replay modes
    pub fn effective_clock(&self) -> ClockMode {
        self.clock.unwrap_or(if self.mode.is_replay() {
            ClockMode::Deterministic
        } else {
            ClockMode::Host
        })
    }

    /// Decode the configured input items
    pub fn decoded_inputs(&self) -> crate::Result<Vec<Vec<u8>>> {
        self.inputs
            .iter()
            .map(|s| {
                hex::decode(s.strip_prefix("0x").unwrap_or(s))
                    .map_err(|e| crate::Error::Load(format!("input {s:?}: {e}")))
            })
            .collect()
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            preimages_json: default_preimages_json(),
            preimages_bin: default_preimages_bin(),
            fds: FdConfig::default(),
            inputs: Vec::new(),
            input_source: InputSource::default(),
            clock: None,
            verify_keccak: false,
            entry_point: default_entry_point(),
            guest_args: Vec::new(),
            record_dir: None,
            version: default_version(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.mode, Mode::Online);
        assert_eq!(config.preimages_json, PathBuf::from("./bin/preimages.json"));
        assert_eq!(config.fds.hint_write, 4);
        assert_eq!(config.fds.length_read, config.fds.data_read);
        assert_eq!(config.entry_point, "_start");
        assert_eq!(config.version, PROTOCOL_VERSION);
    }

    #[test]
    fn test_effective_clock() {
        assert_eq!(HostConfig::new(Mode::Online).effective_clock(), ClockMode::Host);
        assert_eq!(
            HostConfig::new(Mode::Offline).effective_clock(),
            ClockMode::Deterministic
        );
        assert_eq!(
            HostConfig::new(Mode::Offline)
                .with_clock(ClockMode::Host)
                .effective_clock(),
            ClockMode::Host
        );
    }

    #[test]
    fn test_minimal_json_fills_defaults() {
        let config: HostConfig =
            serde_json::from_str(r#"{"mode": "input-feed", "inputs": ["68656c6c6f"]}"#).unwrap();
        assert_eq!(config.mode, Mode::InputFeed);
        assert_eq!(config.decoded_inputs().unwrap(), vec![b"hello".to_vec()]);
        assert_eq!(config.fds, FdConfig::default());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("replay".parse::<Mode>().unwrap(), Mode::Offline);
        assert_eq!("input-feed".parse::<Mode>().unwrap(), Mode::InputFeed);
        assert_eq!(Mode::Sequential.to_string().parse::<Mode>().unwrap(), Mode::Sequential);
        assert!("bogus".parse::<Mode>().is_err());
        assert_eq!("blob".parse::<InputSource>().unwrap(), InputSource::Blob);
        assert_eq!("host".parse::<ClockMode>().unwrap(), ClockMode::Host);
    }

    #[test]
    fn test_bad_input_hex() {
        let config = HostConfig::new(Mode::InputFeed).with_inputs(vec!["0xzz".into()]);
        assert!(config.decoded_inputs().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.json");
        let config = HostConfig::new(Mode::Sequential).with_data_dir("/data/run");
        config.save(&path).unwrap();

        let loaded = HostConfig::load(&path).unwrap();
        assert_eq!(loaded.mode, Mode::Sequential);
        assert_eq!(loaded.preimages_bin, PathBuf::from("/data/run/preimages.bin"));
    }
}
