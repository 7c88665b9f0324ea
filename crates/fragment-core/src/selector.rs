//! Multi-strategy coin selection over fragments.
//!
//! Strategies are tried in a fixed order and the first one that covers the
//! target wins; results are never blended across strategies. Smallest-first
//! is the unconditional fallback and may return an unreached selection.

use log::{debug, warn};

use crate::{
    amount::TokenAmount,
    bnb,
    config::SelectorConfig,
    knapsack,
    model::{ChosenFragment, Fragment, Selection, Strategy},
    score::score,
};

/// Selects fragments with the default configuration.
pub fn select(fragments: &[Fragment], target: TokenAmount) -> Selection {
    CoinSelector::default().select(fragments, target)
}

#[derive(Clone, Debug, Default)]
pub struct CoinSelector {
    config: SelectorConfig,
}

impl CoinSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Never fails: insufficiency is reported through `Selection::reached`.
    pub fn select(&self, fragments: &[Fragment], target: TokenAmount) -> Selection {
        let pool = Pool::new(fragments, target);
        debug!(
            "select: target={} eligible={} available={}",
            target,
            pool.len(),
            pool.available
        );

        if target.is_zero() {
            warn!("select: zero target requested, returning empty selection");
            return self.assemble(&pool, &[], Strategy::SmallestFirst);
        }

        if let Some(index) = exact_match(&pool) {
            debug!("select: exact match on fragment #{}", pool.items[index].selection_index);
            return self.assemble_exact(&pool, index);
        }

        if let Some(indices) = bnb::search(&pool, &self.config) {
            return self.assemble(&pool, &indices, Strategy::BranchAndBound);
        }

        match knapsack::solve(&pool, self.config.knapsack_max_cells) {
            Some(indices) => return self.assemble(&pool, &indices, Strategy::Knapsack),
            None => debug!("select: knapsack found nothing or exceeded its table budget"),
        }

        if let Some(indices) = largest_first(&pool, self.config.single_fragment_max_bps) {
            return self.assemble(&pool, &indices, Strategy::LargestFirst);
        }

        let indices = smallest_first(&pool);
        let selection = self.assemble(&pool, &indices, Strategy::SmallestFirst);
        if !selection.reached {
            debug!(
                "select: insufficient funds, requested={} available={}",
                target, pool.available
            );
        }
        selection
    }

    fn assemble(&self, pool: &Pool<'_>, indices: &[usize], strategy: Strategy) -> Selection {
        let chosen: Vec<ChosenFragment> = indices
            .iter()
            .map(|&i| ChosenFragment::full(pool.items[i].clone()))
            .collect();
        self.finish(pool, chosen, strategy)
    }

    /// Draws the target, or the whole balance when it sits just below it.
    /// Either way the draw is within tolerance, so the selection is reached.
    fn assemble_exact(&self, pool: &Pool<'_>, index: usize) -> Selection {
        let fragment = pool.items[index];
        let draw = if fragment.balance.units() < pool.target.units() {
            fragment.balance
        } else {
            pool.target
        };
        let chosen = vec![ChosenFragment::partial(fragment.clone(), draw)];
        let mut selection = self.finish(pool, chosen, Strategy::ExactMatch);
        selection.reached = true;
        selection
    }

    fn finish(&self, pool: &Pool<'_>, chosen: Vec<ChosenFragment>, strategy: Strategy) -> Selection {
        let target = pool.target;
        let total_drawn = chosen
            .iter()
            .fold(TokenAmount::zero(target.decimals()), |acc, c| {
                acc.saturating_add(c.amount_to_draw)
            });
        let reached = total_drawn.units() >= target.units();
        let change = total_drawn.saturating_sub(target);
        let score = score(chosen.len(), total_drawn, target, &self.config.weights);
        Selection {
            chosen,
            total_drawn,
            target,
            reached,
            strategy,
            change,
            score,
            available_total: pool.available,
        }
    }
}

/// Eligible fragments for one selection call, in input order.
pub(crate) struct Pool<'a> {
    pub(crate) items: Vec<&'a Fragment>,
    pub(crate) target: TokenAmount,
    pub(crate) available: TokenAmount,
}

impl<'a> Pool<'a> {
    pub(crate) fn new(fragments: &'a [Fragment], target: TokenAmount) -> Self {
        let mut items = Vec::with_capacity(fragments.len());
        let mut available = TokenAmount::zero(target.decimals());
        for fragment in fragments {
            if fragment.decimals() != target.decimals() {
                warn!(
                    "select: skipping fragment #{} with {} decimals (target uses {})",
                    fragment.selection_index,
                    fragment.decimals(),
                    target.decimals()
                );
                continue;
            }
            if fragment.balance.is_zero() {
                continue;
            }
            available = available.saturating_add(fragment.balance);
            items.push(fragment);
        }
        Self {
            items,
            target,
            available,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn units(&self, index: usize) -> u128 {
        self.items[index].balance.units()
    }

    /// Indices sorted by balance, ties broken by selection index then input order.
    pub(crate) fn sorted(&self, descending: bool) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.items.len()).collect();
        order.sort_by(|&a, &b| {
            let by_balance = self.units(a).cmp(&self.units(b));
            let by_balance = if descending {
                by_balance.reverse()
            } else {
                by_balance
            };
            by_balance
                .then(self.items[a].selection_index.cmp(&self.items[b].selection_index))
                .then(a.cmp(&b))
        });
        order
    }
}

/// A fragment within one micro-token of the target, on either side.
fn exact_match(pool: &Pool<'_>) -> Option<usize> {
    let epsilon = TokenAmount::micro_unit(pool.target.decimals());
    let target = pool.target.units();
    (0..pool.len())
        .map(|i| (i, pool.units(i).abs_diff(target)))
        .filter(|&(_, diff)| diff < epsilon)
        .min_by_key(|&(i, diff)| (diff, pool.items[i].selection_index, i))
        .map(|(i, _)| i)
}

fn largest_first(pool: &Pool<'_>, single_max_bps: u32) -> Option<Vec<usize>> {
    let target = pool.target.units();
    let ceiling = pool.target.mul_bps(single_max_bps).units();
    let order = pool.sorted(true);

    // Descending order: the last in-range fragment leaves the least change.
    if let Some(&single) = order
        .iter()
        .filter(|&&i| pool.units(i) >= target && pool.units(i) <= ceiling)
        .last()
    {
        return Some(vec![single]);
    }

    let mut picked = Vec::new();
    let mut sum = 0u128;
    for i in order {
        picked.push(i);
        sum = sum.saturating_add(pool.units(i));
        if sum >= target {
            return Some(picked);
        }
    }
    None
}

fn smallest_first(pool: &Pool<'_>) -> Vec<usize> {
    let target = pool.target.units();
    let mut picked = Vec::new();
    let mut sum = 0u128;
    for i in pool.sorted(false) {
        picked.push(i);
        sum = sum.saturating_add(pool.units(i));
        if sum >= target {
            break;
        }
    }
    picked
}
