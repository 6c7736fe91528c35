//! oracle-host: Runs a sandboxed wasm guest with a preimage oracle attached
//!
//! The guest reaches the outside world only through a few imported host
//! functions. The oracle group answers "how long is the preimage of K" and
//! "copy N bytes of it here" from one of three interchangeable backends:
//!
//! - **Table** (`offline`): preloaded `preimages.json`
//! - **Sequential** (`sequential`): `preimages.bin` replayed in request order
//! - **Channel** (`online`): a live oracle process over inherited pipes
//!
//! A second group streams input items into guests that cannot touch memory
//! from the host side (`wasm_input`, `require`, `wasm_exit`). Peak guest
//! memory is sampled at clock and input calls and reported when the run ends.

pub mod bridge;
pub mod clock;
pub mod driver;
pub mod error;
pub mod imports;
pub mod input_feed;
pub mod memory;
pub mod metrics;
pub mod monitor;
pub mod source;

pub use bridge::OracleBridge;
pub use clock::GuestClock;
pub use driver::{run_to_report, ExitReason, HostRunner, HostState, RunReport, RunnerBuilder};
pub use error::{HostError, Result, Termination};
pub use input_feed::{InputCursor, InputFeed, ItemFeed};
pub use memory::GuestMemory;
pub use monitor::MemoryMonitor;
pub use source::{open_source, ChannelSource, PreimageSource, SequentialSource, TableSource};
