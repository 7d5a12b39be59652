//! Single-pass aggregation of the raw benchmark results log
//!
//! Streams `RESULTS.CSV` once, buckets rows by (operation, size group), and
//! summarises each bucket. Program and erase buckets hold elapsed time in
//! milliseconds; read buckets additionally hold per-sample throughput in
//! MB/s and record the mean read latency in microseconds so callers can
//! derive a console-style average throughput.
//!
//! Malformed lines never fail the run: they are skipped and only counted
//! for a debug log line at the end of the pass.

use std::io::BufRead;

use serde::Serialize;
use trueno::Vector;

use crate::model::{Operation, SizeGroup};
use crate::stats::{summarize, Summary};

const MIN_FIELDS: usize = 6;

/// Per-bucket summaries for one results log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregates {
    /// Per-sample read throughput (MB/s) per size group.
    pub read_mbps: [Summary; SizeGroup::COUNT],
    /// Per-sample read latency (ms) per size group.
    pub read_lat_ms: [Summary; SizeGroup::COUNT],
    /// Program elapsed (ms) per size group.
    pub write_ms: [Summary; SizeGroup::COUNT],
    /// Erase elapsed (ms) per size group.
    pub erase_ms: [Summary; SizeGroup::COUNT],
    /// Mean read latency (us) per size group.
    pub read_mean_us: [Option<f32>; SizeGroup::COUNT],
}

impl Aggregates {
    /// One forward pass over the results stream.
    ///
    /// `capacity_bytes` gates the WHOLE size group: without it, rows sized
    /// at the device capacity cannot be classified and are dropped.
    pub fn collect<R: BufRead>(mut reader: R, capacity_bytes: Option<u32>) -> Aggregates {
        let mut read_v: [Vec<f32>; SizeGroup::COUNT] = Default::default();
        let mut read_us: [Vec<f32>; SizeGroup::COUNT] = Default::default();
        let mut read_lat: [Vec<f32>; SizeGroup::COUNT] = Default::default();
        let mut write_v: [Vec<f32>; SizeGroup::COUNT] = Default::default();
        let mut erase_v: [Vec<f32>; SizeGroup::COUNT] = Default::default();
        let mut skipped = 0usize;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(_) => break,
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match Self::parse_line(line, capacity_bytes) {
                Some((op, group, size, elapsed_us)) => {
                    let g = group.index();
                    match op {
                        Operation::Read => {
                            let secs = elapsed_us / 1e6;
                            let mb = size as f32 / (1024.0 * 1024.0);
                            let mbps = mb / secs;
                            if mbps.is_finite() && mbps > 0.0 {
                                read_v[g].push(mbps);
                            }
                            read_us[g].push(elapsed_us);
                            read_lat[g].push(elapsed_us / 1000.0);
                        }
                        Operation::Program => write_v[g].push(elapsed_us / 1000.0),
                        Operation::Erase => erase_v[g].push(elapsed_us / 1000.0),
                    }
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::debug!(skipped, "results lines dropped during aggregation");
        }

        let mut agg = Aggregates::default();
        for g in 0..SizeGroup::COUNT {
            agg.read_mbps[g] = summarize(&read_v[g]);
            agg.read_lat_ms[g] = summarize(&read_lat[g]);
            agg.write_ms[g] = summarize(&write_v[g]);
            agg.erase_ms[g] = summarize(&erase_v[g]);
            agg.read_mean_us[g] = if read_us[g].is_empty() {
                None
            } else {
                // Sorted first so sample order never leaks into the figure.
                read_us[g].sort_by(f32::total_cmp);
                Some(Vector::from_slice(&read_us[g]).mean().unwrap_or(0.0))
            };
        }
        agg
    }

    /// Extract (op, group, size, elapsed_us) from one CSV line, or `None`
    /// when the line does not survive classification and filtering.
    fn parse_line(
        line: &str,
        capacity_bytes: Option<u32>,
    ) -> Option<(Operation, SizeGroup, u32, f32)> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < MIN_FIELDS {
            return None;
        }
        // Fields: 0 jedec (unused), 1 op, 2 size, 3 addr (unused),
        // 4 elapsed_us, 5 throughput (unused).
        let size: u32 = fields[2].trim().parse().ok()?;
        let group = SizeGroup::classify(size, capacity_bytes)?;
        let op = Operation::parse(fields[1].trim())?;
        let elapsed_us: f32 = fields[4].trim().parse().ok()?;
        if elapsed_us <= 0.0 || !elapsed_us.is_finite() {
            return None;
        }
        Some((op, group, size, elapsed_us))
    }

    /// True when any bucket of any operation received a sample.
    pub fn has_samples(&self) -> bool {
        (0..SizeGroup::COUNT).any(|g| {
            self.read_mbps[g].has_samples()
                || self.write_ms[g].has_samples()
                || self.erase_ms[g].has_samples()
        })
    }

    /// Console-style read throughput derived from the mean latency of a
    /// group rather than from per-sample throughputs.
    pub fn mbps_from_avg_latency(
        &self,
        group: SizeGroup,
        capacity_bytes: Option<u32>,
    ) -> Option<f32> {
        let mean_us = self.read_mean_us[group.index()].filter(|v| *v > 0.0)?;
        let bytes = group.bytes(capacity_bytes)?;
        let mb = bytes as f32 / (1024.0 * 1024.0);
        let secs = mean_us / 1e6;
        Some(mb / secs)
    }
}
