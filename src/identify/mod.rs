// Chip identification from aggregated benchmark timings
//
// This module cross-references measured per-(operation, size) means against
// the datasheet catalogue:
// - matcher: closest-prediction selection and per-cell candidate lists
// - intersect: candidate-set intersection across size groups
// - score: capped normalised-error scoring of whole catalogue rows
//
// Tie-breaking everywhere is catalogue row order; that ordering is a
// determinism contract for the report, not an accident.

mod intersect;
mod matcher;
mod score;

pub use intersect::intersect_candidates;
pub use matcher::{match_catalog, CellMatch, MatchTable};
pub use score::{pick_best_candidate, BestCandidate};
