use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::proforma::exit::ExitValuation;
use crate::types::{Money, Rate};

/// Two-tier LP distribution: a preferred coupon each year, then at exit the
/// accrued preference plus a share of net sale proceeds, less the preference
/// already paid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpWaterfall {
    pub preferred_rate: Rate,
    pub profit_share: Rate,
    pub annual_preferred: Money,
    pub total_preferred_accrued: Money,
    pub total_preferred_paid: Money,
    /// Net sale proceeds floored at zero, before the LP share
    pub sale_surplus: Money,
    pub exit_payout: Money,
    /// `[-equity, pref, ..., pref + exit payout]`
    pub cash_flows: Vec<Money>,
}

pub fn distribute(
    equity: Money,
    years: u32,
    exit: &ExitValuation,
    preferred_rate: Rate,
    profit_share: Rate,
) -> LpWaterfall {
    let annual_preferred = equity * preferred_rate;
    let total_preferred_accrued = annual_preferred * Decimal::from(years);
    // Preferred is paid current every year
    let total_preferred_paid = total_preferred_accrued;

    let sale_surplus = exit.net_sale_proceeds.max(Decimal::ZERO);
    let exit_payout = (total_preferred_accrued + profit_share * sale_surplus
        - total_preferred_paid)
        .max(Decimal::ZERO);

    let mut cash_flows = Vec::with_capacity(years as usize + 1);
    cash_flows.push(-equity);
    for year in 1..=years {
        let flow = if year == years {
            annual_preferred + exit_payout
        } else {
            annual_preferred
        };
        cash_flows.push(flow);
    }

    LpWaterfall {
        preferred_rate,
        profit_share,
        annual_preferred,
        total_preferred_accrued,
        total_preferred_paid,
        sale_surplus,
        exit_payout,
        cash_flows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn exit_with(net: Money) -> ExitValuation {
        ExitValuation {
            exit_cap_rate: dec!(0.07),
            terminal_noi: Decimal::ZERO,
            gross_sale_price: Decimal::ZERO,
            sale_commission: Decimal::ZERO,
            loan_payoff: Decimal::ZERO,
            net_sale_proceeds: net,
        }
    }

    #[test]
    fn test_lp_series_shape() {
        let w = distribute(dec!(300000), 5, &exit_with(dec!(500000)), dec!(0.08), dec!(0.45));
        assert_eq!(w.annual_preferred, dec!(24000));
        assert_eq!(w.total_preferred_accrued, dec!(120000));
        assert_eq!(w.total_preferred_paid, dec!(120000));
        // 120,000 + 0.45 × 500,000 − 120,000
        assert_eq!(w.exit_payout, dec!(225000));
        assert_eq!(w.cash_flows.len(), 6);
        assert_eq!(w.cash_flows[0], dec!(-300000));
        assert_eq!(w.cash_flows[4], dec!(24000));
        assert_eq!(w.cash_flows[5], dec!(249000));
        // Preferred reaches the LP once: five coupons, none again at exit
        let received: Money = w.cash_flows[1..].iter().sum();
        assert_eq!(received, dec!(120000) + dec!(225000));
    }

    #[test]
    fn test_small_sale_shares_proceeds_only() {
        let w = distribute(dec!(300000), 5, &exit_with(dec!(50000)), dec!(0.08), dec!(0.45));
        assert_eq!(w.sale_surplus, dec!(50000));
        assert_eq!(w.exit_payout, dec!(22500));
    }

    #[test]
    fn test_underwater_sale_pays_nothing_at_exit() {
        let w = distribute(dec!(300000), 5, &exit_with(dec!(-80000)), dec!(0.08), dec!(0.45));
        assert_eq!(w.sale_surplus, Decimal::ZERO);
        assert_eq!(w.exit_payout, Decimal::ZERO);
        assert_eq!(w.cash_flows[5], dec!(24000));
    }

    #[test]
    fn test_zero_equity() {
        let w = distribute(Decimal::ZERO, 5, &exit_with(dec!(100000)), dec!(0.08), dec!(0.45));
        assert_eq!(w.annual_preferred, Decimal::ZERO);
        assert_eq!(w.exit_payout, dec!(45000));
    }
}
