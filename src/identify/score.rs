// Whole-row scoring of catalogue entries against every measured bucket
//
// Every catalogue row is scored as the sum of capped normalised errors over
// all buckets it can predict; a row that predicts nothing is ineligible.
// A row whose JEDEC equals the observed one gets its score quartered, which
// lets a hardware-confirmed identity survive noisy timings without making
// it unbeatable.

use serde::Serialize;

use crate::aggregate::Aggregates;
use crate::catalog::Catalog;
use crate::identify::matcher::{predict_erase, predict_read, predict_write};
use crate::model::SIZE_GROUPS;

/// Normalised error capped so one wild bucket cannot dominate the sum.
const PENALTY_CAP: f32 = 3.0;

/// JEDEC-match score multiplier.
const JEDEC_BIAS: f32 = 0.25;

/// The best-scoring catalogue row.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BestCandidate {
    /// Catalogue index of the winning row.
    pub row_index: usize,
    /// Accumulated score, bias already applied; lower is better.
    pub score: f32,
    /// Number of (operation, size group) buckets that contributed.
    pub used_metrics: usize,
}

fn cap_penalty(x: f32) -> f32 {
    x.min(PENALTY_CAP)
}

fn norm_diff(measured: f32, predicted: f32) -> f32 {
    cap_penalty((measured - predicted).abs() / predicted)
}

/// Score every catalogue row and return the winner, or `None` when no row
/// can predict any measured bucket. Ties break to the earlier row.
pub fn pick_best_candidate(
    catalog: &Catalog,
    agg: &Aggregates,
    observed_jedec: Option<&str>,
    sck_mhz: Option<f32>,
    capacity_bytes: Option<u32>,
) -> Option<BestCandidate> {
    let mut best: Option<BestCandidate> = None;

    for (i, row) in catalog.rows().iter().enumerate() {
        let mut score = 0.0f32;
        let mut used = 0usize;

        if let Some(sck) = sck_mhz {
            if let Some(pred) = predict_read(row, sck) {
                for group in SIZE_GROUPS {
                    let s = &agg.read_mbps[group.index()];
                    if let Some(mean) = s.mean.filter(|_| s.n > 0) {
                        score += norm_diff(mean, pred);
                        used += 1;
                    }
                }
            }
        }

        for group in SIZE_GROUPS {
            let s = &agg.write_ms[group.index()];
            if let Some(mean) = s.mean.filter(|_| s.n > 0) {
                if let Some(pred) = predict_write(row, group, capacity_bytes) {
                    score += norm_diff(mean, pred);
                    used += 1;
                }
            }
        }

        for group in SIZE_GROUPS {
            let s = &agg.erase_ms[group.index()];
            if let Some(mean) = s.mean.filter(|_| s.n > 0) {
                if let Some(pred) = predict_erase(row, group) {
                    score += norm_diff(mean, pred);
                    used += 1;
                }
            }
        }

        if used == 0 {
            continue;
        }

        if observed_jedec.is_some() && observed_jedec == row.jedec.as_deref() {
            score *= JEDEC_BIAS;
        }

        let better = match best {
            Some(b) => score < b.score,
            None => true,
        };
        if better {
            best = Some(BestCandidate {
                row_index: i,
                score,
                used_metrics: used,
            });
        }
    }

    best
}
