//! Penalty scoring
//!
//! Deltas scale sublinearly with the dollar amount (a $10,000 dispute is
//! worse than a $100 one, but not 100x worse). Losing a refund penalizes
//! the seller with a larger coefficient than losing a release penalizes the
//! buyer.

/// Exponent of the power law over the transaction amount
pub const PENALTY_EXPONENT: f64 = 0.3;

/// Coefficient applied to the seller when a dispute resolves as refund
pub const REFUND_SELLER_COEFFICIENT: f64 = 15.0;

/// Coefficient applied to the buyer when a dispute resolves as release
pub const RELEASE_BUYER_COEFFICIENT: f64 = 6.0;

/// Coefficient applied to the seller when a sale completes cleanly
pub const SALE_COEFFICIENT: f64 = 2.0;

/// Signed penalty for the losing party of a resolved dispute.
///
/// `-round(amount_usd ^ 0.3 * coefficient)`
pub fn dispute_penalty(amount_usd: f64, coefficient: f64) -> i64 {
    let magnitude = amount_usd.max(0.0).powf(PENALTY_EXPONENT) * coefficient;
    -(magnitude.round() as i64)
}

/// Reward for the seller of a completed (released) sale
pub fn sale_reward(amount_usd: f64) -> i64 {
    (amount_usd.max(0.0).powf(PENALTY_EXPONENT) * SALE_COEFFICIENT).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hundred_dollar_penalties() {
        assert_eq!(dispute_penalty(100.0, REFUND_SELLER_COEFFICIENT), -60);
        assert_eq!(dispute_penalty(100.0, RELEASE_BUYER_COEFFICIENT), -24);
    }

    #[test]
    fn test_refund_harsher_than_release() {
        for amount in [1.0, 10.0, 100.0, 5_000.0, 1_000_000.0] {
            let seller = dispute_penalty(amount, REFUND_SELLER_COEFFICIENT);
            let buyer = dispute_penalty(amount, RELEASE_BUYER_COEFFICIENT);
            assert!(
                seller < buyer,
                "seller penalty {} should exceed buyer penalty {} at ${}",
                seller,
                buyer,
                amount
            );
        }
    }

    #[test]
    fn test_sublinear_scaling() {
        let small = dispute_penalty(100.0, REFUND_SELLER_COEFFICIENT);
        let large = dispute_penalty(10_000.0, REFUND_SELLER_COEFFICIENT);
        assert!(large < small);
        assert!(large.abs() < small.abs() * 100);
    }

    #[test]
    fn test_negative_amount_clamped() {
        assert_eq!(dispute_penalty(-5.0, REFUND_SELLER_COEFFICIENT), 0);
    }

    #[test]
    fn test_sale_reward() {
        assert_eq!(sale_reward(100.0), 8);
        assert!(sale_reward(100.0) < -dispute_penalty(100.0, RELEASE_BUYER_COEFFICIENT));
    }
}
