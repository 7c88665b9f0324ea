use alloy_primitives::Address;
use fragment_core::{select, Fragment, TokenAmount};
use proptest::prelude::*;

// At micro-unit precision the exact-match window is a single unit wide.
const DECIMALS: u8 = 6;

fn build(balances: &[u64]) -> Vec<Fragment> {
    balances
        .iter()
        .enumerate()
        .map(|(i, units)| Fragment {
            balance: TokenAmount::new(*units as u128, DECIMALS),
            owner_address: Address::repeat_byte(0x11),
            wallet_address: Address::repeat_byte(i as u8 + 1),
            selection_index: i as u64,
            token_address: Address::ZERO,
            wallet_deployed: i % 2 == 0,
        })
        .collect()
}

proptest! {
    #[test]
    fn reached_iff_funds_suffice(
        balances in prop::collection::vec(1u64..5_000, 0..12),
        target in 1u64..20_000,
    ) {
        let fragments = build(&balances);
        let selection = select(&fragments, TokenAmount::new(target as u128, DECIMALS));
        let available: u64 = balances.iter().sum();
        prop_assert_eq!(selection.reached, available >= target);
        if selection.reached {
            prop_assert!(selection.total_drawn.units() >= target as u128);
        }
    }

    #[test]
    fn drawn_amounts_are_conserved(
        balances in prop::collection::vec(1u64..5_000, 0..12),
        target in 1u64..20_000,
    ) {
        let fragments = build(&balances);
        let target = TokenAmount::new(target as u128, DECIMALS);
        let selection = select(&fragments, target);

        let drawn: u128 = selection.chosen.iter().map(|c| c.amount_to_draw.units()).sum();
        prop_assert_eq!(drawn, selection.total_drawn.units());
        prop_assert_eq!(
            selection.change.units(),
            selection.total_drawn.units().saturating_sub(target.units())
        );
        for chosen in &selection.chosen {
            prop_assert!(chosen.amount_to_draw.units() <= chosen.fragment.balance.units());
        }
        let mut wallets: Vec<_> = selection.chosen.iter().map(|c| c.fragment.wallet_address).collect();
        wallets.sort();
        wallets.dedup();
        prop_assert_eq!(wallets.len(), selection.chosen.len());
    }

    #[test]
    fn selection_is_deterministic(
        balances in prop::collection::vec(1u64..5_000, 0..12),
        target in 1u64..20_000,
    ) {
        let fragments = build(&balances);
        let target = TokenAmount::new(target as u128, DECIMALS);
        prop_assert_eq!(select(&fragments, target), select(&fragments, target));
    }
}
