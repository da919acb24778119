use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::time_value::{irr, quotient, IrrEstimate};
use crate::types::{Money, Multiple, Rate};

/// Denominator used for cash-on-cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CocBasis {
    CashLeftInDeal,
    Equity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineMetrics {
    /// LP IRR
    pub irr: IrrEstimate,
    /// IRR of the whole-deal levered series
    pub deal_irr: IrrEstimate,
    pub cash_on_cash: Rate,
    pub coc_basis: CocBasis,
    pub equity_multiple: Multiple,
    pub going_in_cap_rate: Rate,
    pub year1_dscr: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_sqft: Option<Money>,
}

/// Inputs gathered from the earlier projection steps.
pub struct MetricInputs<'a> {
    pub lp_cash_flows: &'a [Money],
    pub deal_cash_flows: &'a [Money],
    pub year1_cash_flow: Money,
    pub year1_noi: Money,
    pub year1_dscr: Decimal,
    pub equity: Money,
    pub cash_left_in_deal: Option<Money>,
    pub exit_payout: Money,
    pub purchase_price: Money,
    pub units: Option<Decimal>,
    pub sqft: Option<Decimal>,
    pub irr_guess: Rate,
}

pub fn headline(inputs: &MetricInputs<'_>) -> HeadlineMetrics {
    let (coc_basis, coc_denominator) = match inputs.cash_left_in_deal {
        Some(cash) if cash > Decimal::ZERO => (CocBasis::CashLeftInDeal, cash),
        _ => (CocBasis::Equity, inputs.equity),
    };

    HeadlineMetrics {
        irr: irr(inputs.lp_cash_flows, inputs.irr_guess),
        deal_irr: irr(inputs.deal_cash_flows, inputs.irr_guess),
        cash_on_cash: quotient(inputs.year1_cash_flow, coc_denominator),
        coc_basis,
        equity_multiple: quotient(inputs.exit_payout, inputs.equity),
        going_in_cap_rate: quotient(inputs.year1_noi, inputs.purchase_price),
        year1_dscr: inputs.year1_dscr,
        price_per_unit: inputs.units.map(|u| quotient(inputs.purchase_price, u)),
        price_per_sqft: inputs.sqft.map(|s| quotient(inputs.purchase_price, s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn inputs<'a>(lp: &'a [Money], deal: &'a [Money]) -> MetricInputs<'a> {
        MetricInputs {
            lp_cash_flows: lp,
            deal_cash_flows: deal,
            year1_cash_flow: dec!(30000),
            year1_noi: dec!(80000),
            year1_dscr: dec!(1.6),
            equity: dec!(300000),
            cash_left_in_deal: None,
            exit_payout: dec!(450000),
            purchase_price: dec!(1000000),
            units: Some(dec!(10)),
            sqft: None,
            irr_guess: dec!(0.15),
        }
    }

    #[test]
    fn test_coc_on_equity() {
        let lp = [dec!(-100), dec!(110)];
        let m = headline(&inputs(&lp, &lp));
        assert_eq!(m.cash_on_cash, dec!(0.1));
        assert_eq!(m.coc_basis, CocBasis::Equity);
        assert_eq!(m.equity_multiple, dec!(1.5));
        assert_eq!(m.price_per_unit, Some(dec!(100000)));
        assert_eq!(m.price_per_sqft, None);
        assert!((m.irr.rate - dec!(0.10)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_coc_prefers_cash_left_in_deal() {
        let lp = [dec!(-100), dec!(110)];
        let mut i = inputs(&lp, &lp);
        i.cash_left_in_deal = Some(dec!(150000));
        let m = headline(&i);
        assert_eq!(m.cash_on_cash, dec!(0.2));
        assert_eq!(m.coc_basis, CocBasis::CashLeftInDeal);
    }

    #[test]
    fn test_zero_equity_guards() {
        let lp = [dec!(0), dec!(110)];
        let mut i = inputs(&lp, &lp);
        i.equity = Decimal::ZERO;
        let m = headline(&i);
        assert_eq!(m.cash_on_cash, Decimal::ZERO);
        assert_eq!(m.equity_multiple, Decimal::ZERO);
    }
}
