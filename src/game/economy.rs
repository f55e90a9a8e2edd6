//! Economic policy: taxes, block subsidy, treasure and fee tiers.
//!
//! All amounts are integer counts of the smallest currency unit. Every
//! function here is pure so miners and validators agree on the result
//! without seeing the block hash.
//!
//! # Taxes
//!
//! - Banking: 10% of the banked loot goes to the miner.
//! - Death: 4% of the dropped loot (and stake) goes to the miner, except for
//!   deaths on the spawn strip.
//!
//! Both use integer division, so the payout side keeps any rounding dust.

use crate::game::GameRules;

/// Currency amount in the smallest unit.
pub type Amount = i64;

/// One full coin.
pub const COIN: Amount = 100_000_000;

/// One hundredth of a coin.
pub const CENT: Amount = 1_000_000;

/// Split of a gross amount into tax and payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxSplit {
    /// Withheld for the miner.
    pub tax: Amount,
    /// Remainder paid out or dropped.
    pub net: Amount,
}

/// Apply a `1 / divisor` tax to a gross amount.
#[must_use]
pub const fn split_tax(gross: Amount, divisor: Amount) -> TaxSplit {
    let tax = if divisor > 0 { gross / divisor } else { 0 };
    TaxSplit {
        tax,
        net: gross - tax,
    }
}

/// Tax withheld when a hunter banks `gross` loot.
#[must_use]
pub const fn banking_tax(rules: &GameRules, gross: Amount) -> TaxSplit {
    split_tax(gross, rules.banking_tax_divisor)
}

/// Tax withheld when a hunter dies carrying `gross`.
#[must_use]
pub const fn death_tax(rules: &GameRules, gross: Amount) -> TaxSplit {
    split_tax(gross, rules.death_tax_divisor)
}

/// Block subsidy at `height`: the initial subsidy halved every
/// `halving_interval` blocks.
#[must_use]
pub fn block_subsidy(rules: &GameRules, height: u32) -> Amount {
    if rules.halving_interval == 0 {
        return rules.initial_subsidy;
    }
    let halvings = height / rules.halving_interval;
    if halvings >= 63 {
        return 0;
    }
    rules.initial_subsidy >> halvings
}

/// Treasure dropped onto the map at `height`.
#[must_use]
pub fn block_treasure(rules: &GameRules, height: u32) -> Amount {
    block_subsidy(rules, height).saturating_mul(rules.treasure_multiplier)
}

/// Expected coinbase value: subsidy, transaction fees and game taxes.
#[must_use]
pub fn coinbase_value(rules: &GameRules, height: u32, fees: Amount, taxes: Amount) -> Amount {
    block_subsidy(rules, height) + fees + taxes
}

/// Minimum relay fee for a name update carrying `len` payload bytes.
///
/// Tiered by size, never decreasing with length.
#[must_use]
pub const fn min_message_fee(len: usize) -> Amount {
    if len < 100 {
        CENT
    } else if len < 200 {
        CENT * 12 / 10
    } else {
        CENT * 14 / 10
    }
}

/// Minimum relay fee for a name registration.
#[must_use]
pub const fn min_registration_fee() -> Amount {
    COIN
}

/// Coins a spawning player must lock in the name.
#[must_use]
pub const fn min_spawn_lock(rules: &GameRules) -> Amount {
    rules.name_coin_amount + rules.spawn_fee
}

/// Game fee an update must add to the locked coins.
#[must_use]
pub fn min_update_fee(rules: &GameRules, destructs: usize) -> Amount {
    let count = Amount::try_from(destructs).unwrap_or(Amount::MAX);
    rules.destruct_fee.saturating_mul(count)
}

/// Split `total` into shares proportional to `weights`.
///
/// The last share takes the rounding remainder so the shares always sum to
/// `total`. Returns an empty vector if all weights are zero.
#[must_use]
pub fn split_weighted(total: Amount, weights: &[u32]) -> Vec<Amount> {
    let sum: i128 = weights.iter().map(|&w| i128::from(w)).sum();
    if sum == 0 {
        return Vec::new();
    }
    let mut shares = Vec::with_capacity(weights.len());
    let mut assigned: Amount = 0;
    for (i, &w) in weights.iter().enumerate() {
        let share = if i + 1 == weights.len() {
            total - assigned
        } else {
            Amount::try_from(i128::from(total) * i128::from(w) / sum).unwrap_or(0)
        };
        assigned += share;
        shares.push(share);
    }
    shares
}

/// Render an amount as a decimal coin value with eight fractional digits.
#[must_use]
pub fn format_amount(amount: Amount) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    let coin = COIN.unsigned_abs();
    format!("{sign}{}.{:08}", abs / coin, abs % coin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banking_tax_is_ten_percent() {
        let rules = GameRules::default();
        let split = banking_tax(&rules, 5 * COIN);
        assert_eq!(split.tax, COIN / 2);
        assert_eq!(split.net, 5 * COIN - COIN / 2);

        // rounding dust stays with the payout
        let split = banking_tax(&rules, 19);
        assert_eq!(split, TaxSplit { tax: 1, net: 18 });
    }

    #[test]
    fn test_death_tax_is_four_percent() {
        let rules = GameRules::default();
        let split = death_tax(&rules, 100 * COIN);
        assert_eq!(split.tax, 4 * COIN);
        assert_eq!(split.net, 96 * COIN);
        assert_eq!(death_tax(&rules, 24), TaxSplit { tax: 0, net: 24 });
    }

    #[test]
    fn test_subsidy_halving() {
        let rules = GameRules::default();
        assert_eq!(block_subsidy(&rules, 0), COIN);
        assert_eq!(block_subsidy(&rules, 149), COIN);
        assert_eq!(block_subsidy(&rules, 150), COIN / 2);
        assert_eq!(block_subsidy(&rules, 300), COIN / 4);
        assert_eq!(block_subsidy(&rules, 150 * 64), 0);
        assert_eq!(block_treasure(&rules, 1), 9 * COIN);
    }

    #[test]
    fn test_message_fee_tiers() {
        assert_eq!(min_message_fee(0), CENT);
        assert_eq!(min_message_fee(99), CENT);
        assert_eq!(min_message_fee(100), 1_200_000);
        assert_eq!(min_message_fee(199), 1_200_000);
        assert_eq!(min_message_fee(200), 1_400_000);
        assert_eq!(min_message_fee(10_000), 1_400_000);
        assert_eq!(min_registration_fee(), COIN);
    }

    #[test]
    fn test_coinbase_value() {
        let rules = GameRules::default();
        assert_eq!(coinbase_value(&rules, 10, 3 * CENT, 7), COIN + 3 * CENT + 7);
    }

    #[test]
    fn test_split_weighted_conserves() {
        let shares = split_weighted(10, &[1, 1, 1]);
        assert_eq!(shares, vec![3, 3, 4]);
        assert_eq!(split_weighted(9 * COIN, &[2, 1, 1, 1, 1]).iter().sum::<Amount>(), 9 * COIN);
        assert!(split_weighted(5, &[0, 0]).is_empty());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(COIN), "1.00000000");
        assert_eq!(format_amount(1_200_000), "0.01200000");
        assert_eq!(format_amount(-5), "-0.00000005");
    }
}
