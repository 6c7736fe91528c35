//! Bridge metrics
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedder installs a recorder. Labels never carry keys or preimage bytes.

use metrics::{counter, gauge};

pub const OP_LENGTH: &str = "length";
pub const OP_READ: &str = "read";

pub const HINT_SENT: &str = "sent";
pub const HINT_DROPPED: &str = "dropped";
pub const HINT_IGNORED: &str = "ignored";

pub fn record_request(backend: &'static str, op: &'static str) {
    counter!("oracle_requests_total", "backend" => backend, "op" => op).increment(1);
}

pub fn record_bytes_served(backend: &'static str, bytes: usize) {
    counter!("oracle_bytes_served_total", "backend" => backend).increment(bytes as u64);
}

pub fn record_hint(outcome: &'static str) {
    counter!("oracle_hints_total", "outcome" => outcome).increment(1);
}

pub fn set_peak_memory(bytes: u64) {
    gauge!("guest_peak_memory_bytes").set(bytes as f64);
}
