//! One-shot report generation
//!
//! `generate_report` owns the two input streams and the output stream for
//! the duration of one call: it loads the catalogue, aggregates the results
//! log, cross-references the two, and writes the pivoted CSV report. All
//! intermediate state lives and dies inside the call.
//!
//! Everything upstream of the writer degrades to absent cells instead of
//! failing; the only fatal error is a rejected write on the output stream.

use std::io::{BufRead, Write};

use serde::Serialize;
use thiserror::Error;

use crate::aggregate::Aggregates;
use crate::catalog::{Catalog, CatalogRow};
use crate::identify::{intersect_candidates, match_catalog, pick_best_candidate, MatchTable};
use crate::model::{DeviceContext, Operation};
use crate::report;
use crate::stats::Tolerance;

/// Cell text for an identity the engine could not defend.
pub const UNDECIDED: &str = "undecided";

/// Errors surfaced by report generation. Input problems are not errors
/// (they degrade to NA cells); only the output stream can fail the run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to write report: {0}")]
    Write(#[from] std::io::Error),
}

/// Identity block of the report, resolved from the observed JEDEC and its
/// catalogue match.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Identity {
    pub detected_jedec: Option<String>,
    pub chip_model: Option<String>,
    pub chip_family: Option<String>,
    pub company: Option<String>,
    pub capacity_mbit: Option<u32>,
    pub capacity_bytes: Option<u32>,
}

/// Per-operation candidate intersections across all size groups.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Conclusion {
    pub read: Vec<String>,
    pub write: Vec<String>,
    pub erase: Vec<String>,
}

/// The defended final chip guess. Cells are already resolved to their
/// report text (`undecided` / `NA` included); the score stays numeric.
#[derive(Debug, Clone, Serialize)]
pub struct FinalGuess {
    pub jedec: String,
    pub model: String,
    pub company: String,
    pub score: Option<f32>,
}

impl Default for FinalGuess {
    fn default() -> Self {
        FinalGuess {
            jedec: UNDECIDED.to_string(),
            model: UNDECIDED.to_string(),
            company: UNDECIDED.to_string(),
            score: None,
        }
    }
}

/// Everything the writers need for one report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub identity: Identity,
    pub sck_mhz: Option<f32>,
    pub aggregates: Aggregates,
    pub matches: MatchTable,
    pub conclusion: Conclusion,
    pub final_guess: FinalGuess,
}

/// Run the full analysis without writing anything.
///
/// When the context does not carry a capacity, the JEDEC-matched catalogue
/// row supplies one, which in turn enables WHOLE classification and
/// whole-device page accounting.
pub fn build_report<R1: BufRead, R2: BufRead>(
    results: R1,
    catalog_src: R2,
    ctx: &DeviceContext,
) -> ReportData {
    let catalog = Catalog::from_reader(catalog_src);
    if catalog.is_empty() {
        tracing::warn!("chip catalogue is empty; datasheet matching disabled");
    }

    let matched = ctx
        .jedec
        .as_deref()
        .and_then(|j| catalog.find_by_jedec(j))
        .map(|(i, _)| i);
    let capacity_bytes = ctx
        .capacity_bytes
        .or_else(|| matched.and_then(|i| catalog.rows()[i].capacity_bytes()));

    let aggregates = Aggregates::collect(results, capacity_bytes);
    let matches = match_catalog(
        &catalog,
        &aggregates,
        ctx.sck_mhz,
        capacity_bytes,
        Tolerance::default(),
    );

    let conclusion = Conclusion {
        read: intersect_for(&matches, Operation::Read),
        write: intersect_for(&matches, Operation::Program),
        erase: intersect_for(&matches, Operation::Erase),
    };

    let identity = build_identity(ctx, matched.map(|i| &catalog.rows()[i]));
    let final_guess = resolve_final_guess(&catalog, &aggregates, ctx, matched, capacity_bytes);

    ReportData {
        identity,
        sck_mhz: ctx.sck_mhz,
        aggregates,
        matches,
        conclusion,
        final_guess,
    }
}

/// Run the full analysis and write the CSV report.
///
/// Returns the final guess so embedding callers can act on it without
/// re-parsing the report. Partial output may remain on failure.
pub fn generate_report<R1: BufRead, R2: BufRead, W: Write>(
    results: R1,
    catalog: R2,
    ctx: &DeviceContext,
    mut output: W,
) -> Result<FinalGuess, EngineError> {
    let data = build_report(results, catalog, ctx);
    report::write_csv(&mut output, &data)?;
    output.flush()?;
    Ok(data.final_guess)
}

fn intersect_for(matches: &MatchTable, op: Operation) -> Vec<String> {
    let lists: Vec<&[String]> = matches
        .cells(op)
        .iter()
        .map(|cell| cell.candidates.as_slice())
        .collect();
    intersect_candidates(&lists)
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn cell_or_na(s: &str) -> String {
    if s.is_empty() {
        "NA".to_string()
    } else {
        s.to_string()
    }
}

fn build_identity(ctx: &DeviceContext, row: Option<&CatalogRow>) -> Identity {
    let mut identity = Identity {
        detected_jedec: ctx.jedec.clone(),
        ..Identity::default()
    };
    if let Some(row) = row {
        identity.chip_model = non_empty(&row.model);
        identity.chip_family = non_empty(&row.family);
        identity.company = non_empty(&row.company);
        identity.capacity_mbit = row.capacity_mbit;
        identity.capacity_bytes = row.capacity_bytes();
    }
    identity
}

fn resolve_final_guess(
    catalog: &Catalog,
    agg: &Aggregates,
    ctx: &DeviceContext,
    matched: Option<usize>,
    capacity_bytes: Option<u32>,
) -> FinalGuess {
    let observed = ctx.jedec.as_deref();

    if !agg.has_samples() {
        // No measurements: conclude on the JEDEC alone when it is known.
        return match observed {
            Some(jedec) => match matched {
                Some(i) => {
                    let row = &catalog.rows()[i];
                    FinalGuess {
                        jedec: jedec.to_string(),
                        model: cell_or_na(&row.model),
                        company: cell_or_na(&row.company),
                        score: Some(0.0),
                    }
                }
                None => FinalGuess {
                    jedec: jedec.to_string(),
                    model: UNDECIDED.to_string(),
                    company: UNDECIDED.to_string(),
                    score: Some(0.0),
                },
            },
            None => FinalGuess::default(),
        };
    }

    match pick_best_candidate(catalog, agg, observed, ctx.sck_mhz, capacity_bytes) {
        Some(best) => {
            let row = &catalog.rows()[best.row_index];
            FinalGuess {
                jedec: row.jedec.clone().unwrap_or_else(|| "NA".to_string()),
                model: cell_or_na(&row.model),
                company: cell_or_na(&row.company),
                score: Some(best.score),
            }
        }
        None => match observed {
            Some(jedec) => {
                let (model, company) = match matched {
                    Some(i) => {
                        let row = &catalog.rows()[i];
                        (cell_or_na(&row.model), cell_or_na(&row.company))
                    }
                    None => ("NA".to_string(), "NA".to_string()),
                };
                FinalGuess {
                    jedec: jedec.to_string(),
                    model,
                    company,
                    score: None,
                }
            }
            None => FinalGuess::default(),
        },
    }
}
