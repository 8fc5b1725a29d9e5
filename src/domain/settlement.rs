//! Settlement arithmetic: the pure profit-sharing calculator and its
//! audit record.
//!
//! The calculator has no side effects; the full breakdown (every
//! intermediate value) is persisted verbatim as the write-once settlement
//! record for audit.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};

/// Economic parameters of a cluster round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementParams {
    /// Underwriter principal, currency units.
    pub principal: Decimal,
    /// Interest rate owed to the underwriter (0.02 = 2%).
    pub interest_rate: Decimal,
    /// Platform fee rate, taken from positive post-interest profit only.
    pub platform_fee_rate: Decimal,
    /// Number of investor shares the net profit is split across.
    pub investor_shares: Decimal,
}

impl Default for SettlementParams {
    fn default() -> Self {
        SettlementParams {
            principal: Decimal::from_int(250),
            interest_rate: Decimal::scaled(2, 2),
            platform_fee_rate: Decimal::scaled(20, 2),
            investor_shares: Decimal::from_int(10),
        }
    }
}

/// Full settlement breakdown, one per cluster, write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementBreakdown {
    pub total_profit: Decimal,
    pub underwriter_interest_rate: Decimal,
    pub underwriter_principal: Decimal,
    pub underwriter_repayment: Decimal,
    pub platform_fee_rate: Decimal,
    pub platform_fee: Decimal,
    pub net_profit_for_investors: Decimal,
    pub profit_per_investor_share: Decimal,
}

/// Compute the settlement breakdown for a trade result.
///
/// The underwriter is made whole first (principal + interest). The platform
/// fee applies only when the remaining profit is positive; a loss passes
/// through to investors undiluted and unclamped, so the per-share value can
/// be negative.
pub fn compute_settlement(params: &SettlementParams, trade_profit: Decimal) -> SettlementBreakdown {
    let underwriter_repayment = params.principal * (Decimal::one() + params.interest_rate);
    let interest_owed = underwriter_repayment - params.principal;
    let profit_after_underwriter = trade_profit - interest_owed;

    let (platform_fee, net_profit_for_investors) = if profit_after_underwriter.is_positive() {
        let fee = profit_after_underwriter * params.platform_fee_rate;
        (fee, profit_after_underwriter - fee)
    } else {
        (Decimal::zero(), profit_after_underwriter)
    };

    let profit_per_investor_share = net_profit_for_investors / params.investor_shares;

    SettlementBreakdown {
        total_profit: trade_profit,
        underwriter_interest_rate: params.interest_rate,
        underwriter_principal: params.principal,
        underwriter_repayment,
        platform_fee_rate: params.platform_fee_rate,
        platform_fee,
        net_profit_for_investors,
        profit_per_investor_share,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn settles_a_profit_with_platform_fee() {
        let breakdown = compute_settlement(&SettlementParams::default(), dec("30.50"));

        assert_eq!(breakdown.underwriter_repayment, dec("255.00"));
        assert_eq!(breakdown.platform_fee, dec("5.10"));
        assert_eq!(breakdown.net_profit_for_investors, dec("20.40"));
        assert_eq!(breakdown.profit_per_investor_share, dec("2.04"));
    }

    #[test]
    fn settles_a_loss_without_fee_or_clamping() {
        let breakdown = compute_settlement(&SettlementParams::default(), dec("-10"));

        assert_eq!(breakdown.net_profit_for_investors, dec("-15.00"));
        assert!(breakdown.platform_fee.is_zero());
        // Negative per-share entitlement is deliberate: losses pass through.
        assert_eq!(breakdown.profit_per_investor_share, dec("-1.50"));
    }

    #[test]
    fn profit_exactly_covering_interest_yields_zero_shares() {
        // 5.00 profit pays exactly the interest; nothing left, no fee.
        let breakdown = compute_settlement(&SettlementParams::default(), dec("5.00"));

        assert!(breakdown.platform_fee.is_zero());
        assert!(breakdown.net_profit_for_investors.is_zero());
        assert!(breakdown.profit_per_investor_share.is_zero());
    }

    #[test]
    fn zero_profit_passes_interest_as_loss() {
        let breakdown = compute_settlement(&SettlementParams::default(), Decimal::zero());

        assert_eq!(breakdown.net_profit_for_investors, dec("-5.00"));
        assert_eq!(breakdown.profit_per_investor_share, dec("-0.50"));
    }

    #[test]
    fn breakdown_preserves_input_parameters() {
        let breakdown = compute_settlement(&SettlementParams::default(), dec("100"));

        assert_eq!(breakdown.total_profit, dec("100"));
        assert_eq!(breakdown.underwriter_principal, dec("250"));
        assert_eq!(breakdown.underwriter_interest_rate, dec("0.02"));
        assert_eq!(breakdown.platform_fee_rate, dec("0.2"));
    }
}
