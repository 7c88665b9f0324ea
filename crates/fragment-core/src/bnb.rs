//! Bounded depth-first branch-and-bound over fragments sorted by balance.
//!
//! Pruning:
//! - a fragment is only included while the overshoot stays within tolerance
//! - a branch is abandoned past the sum ceiling or the fragment cap
//! - a branch is abandoned when the remaining fragments cannot cover the target
//! - the whole search stops after `bnb_max_nodes` visits (best-so-far is kept)
//!
//! Any combination that covers the target is a candidate; the lowest score wins.

use log::debug;

use crate::{
    amount::TokenAmount,
    config::SelectorConfig,
    score::{score, Score},
    selector::Pool,
};

pub(crate) fn search(pool: &Pool<'_>, config: &SelectorConfig) -> Option<Vec<usize>> {
    if pool.len() == 0 || config.bnb_max_fragments == 0 {
        return None;
    }
    let order = pool.sorted(true);
    let amounts: Vec<u128> = order.iter().map(|&i| pool.units(i)).collect();

    let mut suffix = vec![0u128; amounts.len() + 1];
    for i in (0..amounts.len()).rev() {
        suffix[i] = suffix[i + 1].saturating_add(amounts[i]);
    }
    if suffix[0] < pool.target.units() {
        return None;
    }

    let target = pool.target.units();
    let tolerance = pool.target.mul_bps(config.bnb_overshoot_tolerance_bps).units();
    let mut search = BnbSearch {
        pool,
        config,
        amounts: &amounts,
        suffix: &suffix,
        target,
        include_ceiling: target.saturating_add(tolerance),
        sum_ceiling: pool.target.mul_bps(config.bnb_max_sum_bps).units(),
        nodes_visited: 0,
        node_limit_hit: false,
        current: Vec::with_capacity(config.bnb_max_fragments),
        best: None,
    };
    search.descend(0, 0);

    if search.node_limit_hit {
        debug!(
            "bnb: node limit {} reached, keeping best-so-far",
            config.bnb_max_nodes
        );
    }
    search
        .best
        .map(|(_, positions)| positions.into_iter().map(|p| order[p]).collect())
}

struct BnbSearch<'a, 'p> {
    pool: &'a Pool<'p>,
    config: &'a SelectorConfig,
    amounts: &'a [u128],
    suffix: &'a [u128],
    target: u128,
    include_ceiling: u128,
    sum_ceiling: u128,
    nodes_visited: usize,
    node_limit_hit: bool,
    /// Positions into the sorted order.
    current: Vec<usize>,
    best: Option<(Score, Vec<usize>)>,
}

impl BnbSearch<'_, '_> {
    fn mark_node_visit(&mut self) -> bool {
        self.nodes_visited = self.nodes_visited.saturating_add(1);
        if self.nodes_visited > self.config.bnb_max_nodes {
            self.node_limit_hit = true;
        }
        self.node_limit_hit
    }

    fn record_candidate(&mut self, sum: u128) {
        let total = TokenAmount::new(sum, self.pool.target.decimals());
        let candidate = score(
            self.current.len(),
            total,
            self.pool.target,
            &self.config.weights,
        );
        let better = match &self.best {
            Some((best, _)) => candidate < *best,
            None => true,
        };
        if better {
            self.best = Some((candidate, self.current.clone()));
        }
    }

    /// Each level picks the next included fragment; skipping a position is
    /// the exclusion branch. Depth is bounded by the fragment cap.
    fn descend(&mut self, start: usize, sum: u128) {
        if self.mark_node_visit() {
            return;
        }
        if sum >= self.target {
            self.record_candidate(sum);
            return;
        }
        if sum > self.sum_ceiling || self.current.len() >= self.config.bnb_max_fragments {
            return;
        }

        for position in start..self.amounts.len() {
            if self.node_limit_hit {
                return;
            }
            if sum.saturating_add(self.suffix[position]) < self.target {
                // sorted descending: later positions can only cover less
                return;
            }
            let included = sum.saturating_add(self.amounts[position]);
            if included > self.include_ceiling || included > self.sum_ceiling {
                continue;
            }
            self.current.push(position);
            self.descend(position + 1, included);
            self.current.pop();
        }
    }
}
