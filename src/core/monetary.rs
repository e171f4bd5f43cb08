/// Ledger monetary constants
///
/// Values are indivisible integer units. There are no fees: every non-coinbase
/// transaction must spend exactly what it consumes.
///
/// Number of base units in one coin
pub const UNITS_PER_COIN: u64 = 100_000_000;

/// Fixed subsidy paid by every coinbase transaction (50 coins)
pub const BLOCK_SUBSIDY: u64 = 50 * UNITS_PER_COIN;

/// Utility functions for monetary conversions
pub mod conversions {
    use super::*;

    /// Convert whole coins to base units
    pub fn coins_to_units(coins: u64) -> u64 {
        coins.saturating_mul(UNITS_PER_COIN)
    }

    /// Render base units as a decimal coin amount
    pub fn format_units(units: u64) -> String {
        format!(
            "{}.{:08}",
            units / UNITS_PER_COIN,
            units % UNITS_PER_COIN
        )
    }
}

#[cfg(test)]
mod tests {
    use super::conversions::*;
    use super::*;

    #[test]
    fn test_subsidy_value() {
        assert_eq!(BLOCK_SUBSIDY, 5_000_000_000);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(coins_to_units(2), 200_000_000);
        assert_eq!(format_units(BLOCK_SUBSIDY), "50.00000000");
        assert_eq!(format_units(1), "0.00000001");
    }
}
