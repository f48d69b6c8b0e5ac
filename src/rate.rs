//! Throughput estimation from octet counters
//!
//! Devices expose monotonically increasing in/out octet counters of a fixed
//! bit width. Two timestamped snapshots yield a rate; an apparent decrease is
//! counter wraparound (the counter overflowed and restarted), corrected by
//! adding 2^width to the delta. A non-positive elapsed time is a hard
//! computation error the caller must treat as "no sample this cycle".

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Bit width of the standard 64-bit interface counters (ifHCInOctets).
pub const COUNTER_WIDTH_64: u32 = 64;

/// One timestamped reading of both octet counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub in_octets: u64,
    pub out_octets: u64,
    pub taken_at: DateTime<Utc>,
}

/// Computed rates in bit/s. Unit scaling is presentation only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    pub in_bps: f64,
    pub out_bps: f64,
}

impl Throughput {
    pub fn total_bps(&self) -> f64 {
        self.in_bps + self.out_bps
    }

    pub fn in_mbps(&self) -> f64 {
        self.in_bps / 1_000_000.0
    }

    pub fn out_mbps(&self) -> f64 {
        self.out_bps / 1_000_000.0
    }

    pub fn total_mbps(&self) -> f64 {
        self.total_bps() / 1_000_000.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateError {
    /// The clock went backward or both samples share a timestamp.
    #[error("elapsed time between counter samples is not positive ({elapsed_ms} ms)")]
    NonPositiveElapsed { elapsed_ms: i64 },
}

/// Counter delta modulo 2^width.
///
/// `width >= 64` uses plain wrapping arithmetic; narrower counters mask the
/// wrapped difference down to their width, which is exactly "add 2^width on
/// apparent decrease".
pub fn wrapped_delta(prev: u64, curr: u64, width: u32) -> u64 {
    let delta = curr.wrapping_sub(prev);
    if width >= 64 {
        delta
    } else {
        delta & ((1u64 << width) - 1)
    }
}

/// Compute throughput between two counter snapshots.
///
/// Returns `Ok(None)` when there is no previous snapshot: the first sample
/// ever, or the first after a reachability gap, only seeds the baseline.
pub fn compute(
    prev: Option<&CounterSnapshot>,
    curr: &CounterSnapshot,
    counter_width: u32,
) -> Result<Option<Throughput>, RateError> {
    let Some(prev) = prev else {
        return Ok(None);
    };

    let elapsed_ms = (curr.taken_at - prev.taken_at).num_milliseconds();
    if elapsed_ms <= 0 {
        return Err(RateError::NonPositiveElapsed { elapsed_ms });
    }
    let elapsed_secs = elapsed_ms as f64 / 1000.0;

    let delta_in = wrapped_delta(prev.in_octets, curr.in_octets, counter_width);
    let delta_out = wrapped_delta(prev.out_octets, curr.out_octets, counter_width);

    Ok(Some(Throughput {
        in_bps: delta_in as f64 * 8.0 / elapsed_secs,
        out_bps: delta_out as f64 * 8.0 / elapsed_secs,
    }))
}
