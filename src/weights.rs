//! Dual normalization of overlap fractions
//!
//! Within each first-mesh cell the raw fractions `frac_1` are rescaled to sum to
//! one, and likewise `frac_2` within each second-mesh cell. Redistributing a
//! field with these weights conserves its total even where a cell is only
//! partly covered by the other mesh. Groups whose fractions sum to zero cannot
//! be rescaled: they keep their raw values and are listed in the report.

use crate::errors::{RemapError, Result};
use crate::overlay::OverlapRecord;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Groups left unnormalized because their fractions sum to zero
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizationReport {
    /// `id_1` values of degenerate first-mesh groups
    pub degenerate_1: Vec<u64>,
    /// `id_2` values of degenerate second-mesh groups
    pub degenerate_2: Vec<u64>,
}

impl NormalizationReport {
    /// True when every group was rescaled to a unit sum
    pub fn is_conservative(&self) -> bool {
        self.degenerate_1.is_empty() && self.degenerate_2.is_empty()
    }
}

/// Fill `frac_1_normalized` and `frac_2_normalized` on every record.
pub fn normalize(records: &mut [OverlapRecord]) -> NormalizationReport {
    let degenerate_1 = normalize_side(
        records,
        |r| r.id_1,
        |r| r.frac_1,
        |r, v| r.frac_1_normalized = v,
    );
    let degenerate_2 = normalize_side(
        records,
        |r| r.id_2,
        |r| r.frac_2,
        |r, v| r.frac_2_normalized = v,
    );

    let report = NormalizationReport {
        degenerate_1,
        degenerate_2,
    };
    if !report.is_conservative() {
        tracing::warn!(
            mesh_1 = ?report.degenerate_1,
            mesh_2 = ?report.degenerate_2,
            "overlap groups with zero total fraction left unnormalized"
        );
    }
    report
}

fn normalize_side(
    records: &mut [OverlapRecord],
    key: fn(&OverlapRecord) -> u64,
    frac: fn(&OverlapRecord) -> f64,
    store: fn(&mut OverlapRecord, f64),
) -> Vec<u64> {
    // Summed serially in record order so repeated runs agree bit for bit
    let mut sums: BTreeMap<u64, f64> = BTreeMap::new();
    for record in records.iter() {
        *sums.entry(key(record)).or_insert(0.0) += frac(record);
    }

    records.par_iter_mut().for_each(|record| {
        let sum = sums[&key(record)];
        let raw = frac(record);
        store(record, if sum > 0.0 { raw / sum } else { raw });
    });

    sums.into_iter()
        .filter(|&(_, sum)| !(sum > 0.0))
        .map(|(id, _)| id)
        .collect()
}

/// Area-weighted average of first-mesh values onto each second-mesh cell.
///
/// `values` is keyed by first-mesh cell identifier; the result is keyed by
/// second-mesh cell identifier and weights each contribution by
/// `frac_2_normalized`.
pub fn remap_field(
    records: &[OverlapRecord],
    values: &HashMap<u64, f64>,
) -> Result<BTreeMap<u64, f64>> {
    let mut out: BTreeMap<u64, f64> = BTreeMap::new();
    for record in records {
        let value = values.get(&record.cell_id_1).ok_or_else(|| {
            RemapError::InvalidArgument(format!(
                "no value supplied for first-mesh cell {}",
                record.cell_id_1
            ))
        })?;
        *out.entry(record.cell_id_2).or_insert(0.0) += value * record.frac_2_normalized;
    }
    Ok(out)
}
