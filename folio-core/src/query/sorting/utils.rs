//! Utility functions for sorting operations
//!
//! Helpers for applying index permutations to parallel sequences and for
//! locating runs of equal elements.

use crate::error::{EngineError, Result};
use std::ops::Range;

/// Reorder `items` so that position `i` holds the element previously at
/// `permutation[i]`.
///
/// The permutation must contain every index of `items` exactly once.
pub fn apply_permutation<T>(
    items: &mut Vec<T>,
    permutation: &[usize],
) -> Result<()> {
    check_permutation(items.len(), permutation)?;

    let mut slots: Vec<Option<T>> = items.drain(..).map(Some).collect();
    items.extend(permutation.iter().filter_map(|&idx| slots[idx].take()));
    Ok(())
}

fn check_permutation(len: usize, permutation: &[usize]) -> Result<()> {
    if permutation.len() != len {
        return Err(EngineError::InvalidSortConfiguration(format!(
            "permutation covers {} positions but the sequence has {}",
            permutation.len(),
            len
        )));
    }

    let mut seen = vec![false; len];
    for &idx in permutation {
        match seen.get_mut(idx) {
            Some(flag) if !*flag => *flag = true,
            _ => {
                return Err(EngineError::InvalidSortConfiguration(format!(
                    "index {idx} is out of range or repeated"
                )));
            }
        }
    }
    Ok(())
}

/// Maximal ranges of adjacent elements that compare equal.
///
/// Single-element ranges are omitted since there is nothing left to order
/// inside them.
pub fn tie_runs<T, F>(items: &[T], mut equal: F) -> Vec<Range<usize>>
where
    F: FnMut(&T, &T) -> bool,
{
    let mut runs = Vec::new();
    let mut start = 0;
    for end in 1..=items.len() {
        if end == items.len() || !equal(&items[start], &items[end]) {
            if end - start > 1 {
                runs.push(start..end);
            }
            start = end;
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_permutation() {
        let mut items = vec!["a", "b", "c", "d"];
        apply_permutation(&mut items, &[3, 1, 0, 2]).unwrap();
        assert_eq!(items, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn apply_permutation_rejects_bad_input() {
        let mut items = vec![1, 2, 3];
        assert!(apply_permutation(&mut items, &[0, 1]).is_err());
        assert!(apply_permutation(&mut items, &[0, 0, 1]).is_err());
        assert!(apply_permutation(&mut items, &[0, 1, 3]).is_err());
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn test_tie_runs() {
        let items = [1, 1, 2, 3, 3, 3, 4];
        assert_eq!(tie_runs(&items, |a, b| a == b), vec![0..2, 3..6]);
        assert!(tie_runs::<i32, _>(&[], |a, b| a == b).is_empty());
        assert!(tie_runs(&[7], |a, b| a == b).is_empty());
    }
}
