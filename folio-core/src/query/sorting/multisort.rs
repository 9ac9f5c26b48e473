//! Stable multi-key sorting over parallel sequences
//!
//! Each sort key is extracted up front into its own column vector. The
//! first column orders a permutation of record indices; every maximal run of
//! equal values is then ordered by the next column, recursively, until the
//! keys run out. Original positions break any remaining tie, which makes the
//! whole sort stable and repeatable. The resulting permutation is applied to
//! the records and can be applied to any parallel sequence as well.
//!
//! Every level only touches the indices inside the runs left by the level
//! above, so a sort with `k` keys costs `O(k * n log n)` even when most
//! values tie.

use super::direction::{ComparisonMode, SortDirection};
use super::keys::{Column, Record, SortValue};
use super::utils::{apply_permutation, tie_runs};
use crate::error::{EngineError, Result};
use std::cmp::Ordering;
use tracing::trace;

/// A validated set of sort keys, each with its own direction and mode.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiKeySort {
    keys: Vec<Column>,
    directions: Vec<SortDirection>,
    modes: Vec<ComparisonMode>,
}

impl MultiKeySort {
    /// Build a sort from parallel key/direction/mode vectors.
    ///
    /// The three vectors must have the same length.
    pub fn new(
        keys: Vec<Column>,
        directions: Vec<SortDirection>,
        modes: Vec<ComparisonMode>,
    ) -> Result<Self> {
        if keys.len() != directions.len() || keys.len() != modes.len() {
            return Err(EngineError::InvalidSortConfiguration(format!(
                "{} sort keys, {} directions and {} comparison modes",
                keys.len(),
                directions.len(),
                modes.len()
            )));
        }
        Ok(Self {
            keys,
            directions,
            modes,
        })
    }

    /// Every key shares one direction and comparison mode.
    pub fn uniform(
        keys: Vec<Column>,
        direction: SortDirection,
        mode: ComparisonMode,
    ) -> Self {
        let len = keys.len();
        Self {
            keys,
            directions: vec![direction; len],
            modes: vec![mode; len],
        }
    }

    pub fn keys(&self) -> &[Column] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Extract one column vector per key.
    pub fn columns<T: Record>(&self, records: &[T]) -> Vec<Vec<SortValue>> {
        self.keys
            .iter()
            .map(|key| records.iter().map(|record| record.value(key)).collect())
            .collect()
    }

    /// Permutation that sorts `records`: position `i` of the result holds the
    /// original index of the record that belongs at `i`.
    pub fn permutation<T: Record>(&self, records: &[T]) -> Result<Vec<usize>> {
        self.ordered_indices(&self.columns(records), records.len())
    }

    /// Permutation for pre-extracted column vectors.
    ///
    /// There must be one column per key and every column must have the same
    /// length.
    pub fn permutation_for_columns(
        &self,
        columns: &[Vec<SortValue>],
    ) -> Result<Vec<usize>> {
        if columns.len() != self.keys.len() {
            return Err(EngineError::InvalidSortConfiguration(format!(
                "{} column vectors supplied for {} sort keys",
                columns.len(),
                self.keys.len()
            )));
        }

        let rows = columns.first().map(Vec::len).unwrap_or(0);
        self.ordered_indices(columns, rows)
    }

    fn ordered_indices(
        &self,
        columns: &[Vec<SortValue>],
        rows: usize,
    ) -> Result<Vec<usize>> {
        if let Some((pos, column)) =
            columns.iter().enumerate().find(|(_, c)| c.len() != rows)
        {
            return Err(EngineError::InvalidSortConfiguration(format!(
                "column for key {} has {} values, expected {}",
                self.keys[pos],
                column.len(),
                rows
            )));
        }

        let mut permutation: Vec<usize> = (0..rows).collect();
        if !columns.is_empty() && rows > 1 {
            self.order_level(columns, &mut permutation, 0);
        }
        trace!(keys = self.keys.len(), rows, "multi-key sort permutation");
        Ok(permutation)
    }

    /// Sort `records` in place and return the applied permutation.
    pub fn sort<T: Record>(&self, records: &mut Vec<T>) -> Result<Vec<usize>> {
        let permutation = self.permutation(records)?;
        apply_permutation(records, &permutation)?;
        Ok(permutation)
    }

    /// Sort `records` and carry `parallel` along so that `parallel[i]` keeps
    /// describing `records[i]`.
    pub fn sort_with<T: Record, U>(
        &self,
        records: &mut Vec<T>,
        parallel: &mut Vec<U>,
    ) -> Result<Vec<usize>> {
        if parallel.len() != records.len() {
            return Err(EngineError::InvalidSortConfiguration(format!(
                "parallel sequence has {} entries for {} records",
                parallel.len(),
                records.len()
            )));
        }
        let permutation = self.sort(records)?;
        apply_permutation(parallel, &permutation)?;
        Ok(permutation)
    }

    fn compare_at(
        &self,
        column: &[SortValue],
        level: usize,
        a: usize,
        b: usize,
    ) -> Ordering {
        self.directions[level]
            .apply(column[a].compare(&column[b], self.modes[level]))
    }

    fn order_level(
        &self,
        columns: &[Vec<SortValue>],
        indices: &mut [usize],
        level: usize,
    ) {
        let column = &columns[level];
        indices.sort_unstable_by(|&a, &b| {
            self.compare_at(column, level, a, b).then(a.cmp(&b))
        });

        if level + 1 == columns.len() {
            return;
        }

        let runs = tie_runs(indices, |&a, &b| {
            self.compare_at(column, level, a, b) == Ordering::Equal
        });
        for run in runs {
            self.order_level(columns, &mut indices[run], level + 1);
        }
    }
}

/// Sort `records` in place by `keys[0]`, then `keys[1]`, and so on.
///
/// Returns the applied permutation so parallel sequences can follow.
pub fn multi_sort<T: Record>(
    records: &mut Vec<T>,
    keys: &[Column],
    directions: &[SortDirection],
    modes: &[ComparisonMode],
) -> Result<Vec<usize>> {
    MultiKeySort::new(keys.to_vec(), directions.to_vec(), modes.to_vec())?
        .sort(records)
}
