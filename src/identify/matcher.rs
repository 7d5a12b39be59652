// Closest-prediction matching between measured means and datasheet timings
//
// For every (operation, size group) bucket with samples, the matcher picks
// the catalogue row whose predicted figure lands closest to the observed
// mean and records that prediction as the cell's db_mean. It then lists
// every JEDEC-carrying row whose own prediction is indistinguishable from
// the winner under the engine tolerance: those are the cell's candidates.
//
// Prediction formulas:
//   read    read50_MBps * (sck_MHz / 50)      vs mean throughput (MB/s)
//   program typ_page_ms * ceil(bytes / 256)   vs mean elapsed (ms)
//   erase   typ_4k/32k/64k_ms by size group   vs mean elapsed (ms)

use serde::Serialize;

use crate::aggregate::Aggregates;
use crate::catalog::{Catalog, CatalogRow};
use crate::model::{Operation, SizeGroup, PAGE_SIZE_BYTES, SIZE_GROUPS};
use crate::stats::Tolerance;

/// Match result for one (operation, size group) cell.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CellMatch {
    /// Prediction of the closest catalogue row, absent when no row predicts
    /// this cell or the bucket has no samples.
    pub db_mean: Option<f32>,
    /// Catalogue index of the winning row.
    pub winner: Option<usize>,
    /// JEDEC ids of every row matching `db_mean` within tolerance, in
    /// catalogue order. JEDEC-less rows may win the cell but never list.
    pub candidates: Vec<String>,
}

/// Per-operation cell matches across all size groups.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchTable {
    pub read: [CellMatch; SizeGroup::COUNT],
    pub write: [CellMatch; SizeGroup::COUNT],
    pub erase: [CellMatch; SizeGroup::COUNT],
}

impl MatchTable {
    pub fn cells(&self, op: Operation) -> &[CellMatch; SizeGroup::COUNT] {
        match op {
            Operation::Read => &self.read,
            Operation::Program => &self.write,
            Operation::Erase => &self.erase,
        }
    }
}

/// Datasheet read throughput scaled from 50 MHz to the observed clock.
pub(super) fn predict_read(row: &CatalogRow, sck_mhz: f32) -> Option<f32> {
    row.read50_mbps.map(|r| r * (sck_mhz / 50.0))
}

/// Page-program prediction for a transfer of this group's size.
pub(super) fn predict_write(
    row: &CatalogRow,
    group: SizeGroup,
    capacity_bytes: Option<u32>,
) -> Option<f32> {
    let bytes = group.bytes(capacity_bytes)?;
    let pages = bytes.div_ceil(PAGE_SIZE_BYTES);
    row.typ_page_ms.map(|t| t * pages as f32)
}

/// Datasheet erase reference for this group; only the three sector/block
/// sizes have one.
pub(super) fn predict_erase(row: &CatalogRow, group: SizeGroup) -> Option<f32> {
    match group {
        SizeGroup::K4 => row.typ_4k_ms,
        SizeGroup::K32 => row.typ_32k_ms,
        SizeGroup::K64 => row.typ_64k_ms,
        _ => None,
    }
}

/// First strict minimum of |prediction - target| over (index, prediction)
/// pairs; equal distances keep the earlier row.
fn closest(preds: impl Iterator<Item = (usize, f32)>, target: f32) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32, f32)> = None;
    for (i, pred) in preds {
        let dist = (pred - target).abs();
        let better = match best {
            Some((_, _, best_dist)) => dist < best_dist,
            None => true,
        };
        if better {
            best = Some((i, pred, dist));
        }
    }
    best.map(|(i, pred, _)| (i, pred))
}

fn match_cell<P>(catalog: &Catalog, target: Option<f32>, tol: Tolerance, predict: P) -> CellMatch
where
    P: Fn(&CatalogRow) -> Option<f32>,
{
    let Some(target) = target else {
        return CellMatch::default();
    };

    let preds = catalog
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(i, row)| predict(row).map(|p| (i, p)));
    let Some((winner, db_mean)) = closest(preds, target) else {
        return CellMatch::default();
    };

    let candidates = catalog
        .rows()
        .iter()
        .filter_map(|row| {
            let jedec = row.jedec.as_ref()?;
            let pred = predict(row)?;
            tol.almost_equal(pred, db_mean).then(|| jedec.clone())
        })
        .collect();

    CellMatch {
        db_mean: Some(db_mean),
        winner: Some(winner),
        candidates,
    }
}

/// Build the full match table for one set of aggregates.
///
/// `sck_mhz = None` disables the read column entirely; an unknown capacity
/// disables WHOLE write predictions.
pub fn match_catalog(
    catalog: &Catalog,
    agg: &Aggregates,
    sck_mhz: Option<f32>,
    capacity_bytes: Option<u32>,
    tol: Tolerance,
) -> MatchTable {
    let mut table = MatchTable::default();

    for group in SIZE_GROUPS {
        let g = group.index();

        if let Some(sck) = sck_mhz {
            let target = agg.read_mbps[g].mean.filter(|_| agg.read_mbps[g].n > 0);
            table.read[g] = match_cell(catalog, target, tol, |row| predict_read(row, sck));
        }

        let target = agg.write_ms[g].mean.filter(|_| agg.write_ms[g].n > 0);
        table.write[g] = match_cell(catalog, target, tol, |row| {
            predict_write(row, group, capacity_bytes)
        });

        let target = agg.erase_ms[g].mean.filter(|_| agg.erase_ms[g].n > 0);
        table.erase[g] = match_cell(catalog, target, tol, |row| predict_erase(row, group));
    }

    table
}
