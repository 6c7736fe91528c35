//! Host functions wired into the guest's import table
//!
//! | Module | Function | Group |
//! |--------|----------|-------|
//! | `_gotest` | `get_preimage_len`, `get_preimage_from_oracle`, `hint_oracle` | oracle |
//! | `env` | `wasm_input`, `require`, `wasm_exit`, `wasm_output` | input feed |
//! | `wasi_snapshot_preview1` | everything, `clock_time_get` overridden | WASI |

use wasmtime::{Caller, Linker};

use crate::clock::{ERRNO_FAULT, ERRNO_INVAL, ERRNO_SUCCESS};
use crate::driver::HostState;
use crate::error::HostError;
use crate::input_feed;
use crate::memory::{exported_memory, GuestMemory};

pub const ORACLE_MODULE: &str = "_gotest";
pub const FEED_MODULE: &str = "env";
pub const WASI_MODULE: &str = "wasi_snapshot_preview1";

/// Define every host import on `linker`
pub fn add_to_linker(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    wasmtime_wasi::preview1::add_to_linker_sync(linker, |state: &mut HostState| &mut state.wasi)?;
    linker.allow_shadowing(true);
    add_clock(linker)?;
    add_oracle(linker)?;
    add_feed(linker)?;
    Ok(())
}

fn add_clock(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    linker.func_wrap(
        WASI_MODULE,
        "clock_time_get",
        |mut caller: Caller<'_, HostState>, id: u32, _precision: u64, time_ptr: u32| -> anyhow::Result<i32> {
            let memory = exported_memory(&mut caller)?;
            let (data, state) = memory.data_and_store_mut(&mut caller);
            state.monitor.sample(data.len() as u64);

            let Some(now) = state.clock.now(id) else {
                return Ok(ERRNO_INVAL);
            };
            match GuestMemory::new(data).write(time_ptr, &now.to_le_bytes()) {
                Ok(()) => Ok(ERRNO_SUCCESS),
                Err(_) => Ok(ERRNO_FAULT),
            }
        },
    )?;
    Ok(())
}

fn add_oracle(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    linker.func_wrap(
        ORACLE_MODULE,
        "get_preimage_len",
        |mut caller: Caller<'_, HostState>, key_ptr: u32| -> anyhow::Result<u32> {
            let memory = exported_memory(&mut caller)?;
            let (data, state) = memory.data_and_store_mut(&mut caller);
            let bridge = state.bridge.as_mut().ok_or(HostError::NoOracle)?;
            Ok(bridge.get_preimage_len(&GuestMemory::new(data), key_ptr)?)
        },
    )?;

    linker.func_wrap(
        ORACLE_MODULE,
        "get_preimage_from_oracle",
        |mut caller: Caller<'_, HostState>, key_ptr: u32, dest: u32, len: u32| -> anyhow::Result<u32> {
            let memory = exported_memory(&mut caller)?;
            let (data, state) = memory.data_and_store_mut(&mut caller);
            let bridge = state.bridge.as_mut().ok_or(HostError::NoOracle)?;
            Ok(bridge.get_preimage_from_oracle(&mut GuestMemory::new(data), key_ptr, dest, len)?)
        },
    )?;

    linker.func_wrap(
        ORACLE_MODULE,
        "hint_oracle",
        |mut caller: Caller<'_, HostState>, ptr: u32, size: u32| -> anyhow::Result<()> {
            let memory = exported_memory(&mut caller)?;
            let (data, state) = memory.data_and_store_mut(&mut caller);
            match state.bridge.as_mut() {
                Some(bridge) => Ok(bridge.hint_oracle(&GuestMemory::new(data), ptr, size)?),
                None => Ok(()),
            }
        },
    )?;
    Ok(())
}

fn add_feed(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    linker.func_wrap(
        FEED_MODULE,
        "wasm_input",
        |mut caller: Caller<'_, HostState>, is_public: u32| -> anyhow::Result<u64> {
            if let Ok(memory) = exported_memory(&mut caller) {
                let size = memory.data_size(&caller) as u64;
                caller.data_mut().monitor.sample(size);
            }
            Ok(caller.data_mut().feed.next_input(is_public != 0)?)
        },
    )?;

    linker.func_wrap(
        FEED_MODULE,
        "require",
        |_caller: Caller<'_, HostState>, condition: u32| -> anyhow::Result<()> {
            Ok(input_feed::require(condition)?)
        },
    )?;

    linker.func_wrap(
        FEED_MODULE,
        "wasm_exit",
        |_caller: Caller<'_, HostState>, code: i32| -> anyhow::Result<()> {
            Err(input_feed::exit(code).into())
        },
    )?;

    linker.func_wrap(
        FEED_MODULE,
        "wasm_output",
        |mut caller: Caller<'_, HostState>, value: u64| {
            tracing::info!(value, "wasm_output");
            caller.data_mut().outputs.push(value);
        },
    )?;
    Ok(())
}
