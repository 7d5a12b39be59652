//! JSON output format for benchmark reports
//!
//! Machine-readable mirror of the CSV report for consumers that want the
//! data without re-parsing the pivoted table. The CSV schema stays the
//! interchange contract; this view is additive.

use serde::Serialize;

use crate::engine::{Conclusion, FinalGuess, Identity, ReportData};
use crate::model::SIZE_GROUPS;
use crate::stats::Summary;

/// One operation's cell for one size group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonCell {
    /// Elapsed-time summary in milliseconds (read latency for reads).
    pub summary_ms: Summary,
    /// Closest datasheet prediction for this cell, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_mean: Option<f32>,
    /// JEDEC ids matching the prediction within tolerance.
    pub possible_chips: Vec<String>,
}

/// All three operations at one size group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroup {
    pub size: &'static str,
    pub read: JsonCell,
    pub write: JsonCell,
    pub erase: JsonCell,
    /// Per-sample read throughput summary (MB/s).
    pub read_throughput_mbps: Summary,
}

/// Top-level JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub identity: Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spi_sck_mhz: Option<f32>,
    pub groups: Vec<JsonGroup>,
    pub conclusion: Conclusion,
    pub final_guess: FinalGuess,
}

impl JsonReport {
    pub fn from_data(data: &ReportData) -> JsonReport {
        let groups = SIZE_GROUPS
            .iter()
            .map(|group| {
                let g = group.index();
                JsonGroup {
                    size: group.suffix(),
                    read: JsonCell {
                        summary_ms: data.aggregates.read_lat_ms[g],
                        db_mean: data.matches.read[g].db_mean,
                        possible_chips: data.matches.read[g].candidates.clone(),
                    },
                    write: JsonCell {
                        summary_ms: data.aggregates.write_ms[g],
                        db_mean: data.matches.write[g].db_mean,
                        possible_chips: data.matches.write[g].candidates.clone(),
                    },
                    erase: JsonCell {
                        summary_ms: data.aggregates.erase_ms[g],
                        db_mean: data.matches.erase[g].db_mean,
                        possible_chips: data.matches.erase[g].candidates.clone(),
                    },
                    read_throughput_mbps: data.aggregates.read_mbps[g],
                }
            })
            .collect();

        JsonReport {
            identity: data.identity.clone(),
            spi_sck_mhz: data.sck_mhz,
            groups,
            conclusion: data.conclusion.clone(),
            final_guess: data.final_guess.clone(),
        }
    }
}

/// Render the report as pretty-printed JSON.
pub fn render_json(data: &ReportData) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport::from_data(data))
}
