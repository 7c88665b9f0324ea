//! 0/1 subset-sum table over micro-token weights.
//!
//! Balances are floored and the target is ceiled to micro-tokens, so a subset
//! covering the scaled target always covers the real one. A minimal covering
//! subset never exceeds `target + largest item`, which bounds the table width.

use crate::{amount::MICRO_DECIMALS, selector::Pool};

const UNREACHED: u32 = u32::MAX;
const ROOT: u32 = u32::MAX - 1;

pub(crate) fn solve(pool: &Pool<'_>, max_cells: usize) -> Option<Vec<usize>> {
    let target = pool.target.to_resolution(MICRO_DECIMALS, true);
    if target == 0 || pool.len() == 0 {
        return None;
    }

    let weights: Vec<(usize, u128)> = (0..pool.len())
        .map(|i| (i, pool.items[i].balance.micros()))
        .filter(|(_, w)| *w > 0)
        .collect();

    // Items that cover the target alone never need the table.
    let best_single = weights
        .iter()
        .filter(|(_, w)| *w >= target)
        .min_by_key(|(i, w)| (*w, pool.items[*i].selection_index, *i))
        .copied();

    let small: Vec<(usize, u128)> = weights.iter().copied().filter(|(_, w)| *w < target).collect();
    let table = small_subset(&small, target, max_cells);

    match (table, best_single) {
        (Some((sum, picked)), Some((single, single_weight))) => {
            if single_weight <= sum {
                Some(vec![single])
            } else {
                Some(picked)
            }
        }
        (Some((_, picked)), None) => Some(picked),
        (None, Some((single, _))) => Some(vec![single]),
        (None, None) => None,
    }
}

/// Minimal reachable sum `>= target` using items lighter than the target,
/// with the pool indices that make it up (in pool order).
fn small_subset(
    items: &[(usize, u128)],
    target: u128,
    max_cells: usize,
) -> Option<(u128, Vec<usize>)> {
    let max_item = items.iter().map(|(_, w)| *w).max()?;
    let width = usize::try_from(target.checked_add(max_item)?).ok()?;
    if items.len().saturating_mul(width) > max_cells || items.len() >= ROOT as usize {
        return None;
    }
    let total: u128 = items.iter().map(|(_, w)| *w).sum();
    if total < target {
        return None;
    }

    // parent[s] = item that first reached sum s; descending sweeps keep each item 0/1.
    let mut parent = vec![UNREACHED; width];
    parent[0] = ROOT;
    for (k, &(_, w)) in items.iter().enumerate() {
        let w = w as usize;
        for s in (w..width).rev() {
            if parent[s] == UNREACHED && parent[s - w] != UNREACHED {
                parent[s] = k as u32;
            }
        }
    }

    let start = target as usize;
    let best = (start..width).find(|&s| parent[s] != UNREACHED)?;

    let mut picked = Vec::new();
    let mut s = best;
    while s > 0 {
        let k = parent[s];
        debug_assert!(k != UNREACHED && k != ROOT);
        let (index, w) = items[k as usize];
        picked.push(index);
        s -= w as usize;
    }
    picked.sort_unstable();
    Some((best as u128, picked))
}
