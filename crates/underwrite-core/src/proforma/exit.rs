use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::proforma::schedule::YearRecord;
use crate::types::{Money, Rate};

/// Sale at the end of the hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitValuation {
    pub exit_cap_rate: Rate,
    pub terminal_noi: Money,
    pub gross_sale_price: Money,
    pub sale_commission: Money,
    pub loan_payoff: Money,
    /// Gross price less commission and the outstanding loan balance
    pub net_sale_proceeds: Money,
}

/// Capitalize final-year NOI. A zero cap rate gives a zero sale price.
pub fn value_exit(years: &[YearRecord], exit_cap_rate: Rate, commission_rate: Rate) -> ExitValuation {
    let (terminal_noi, loan_payoff) = years
        .last()
        .map(|y| (y.noi, y.ending_balance))
        .unwrap_or((Decimal::ZERO, Decimal::ZERO));

    let gross_sale_price = terminal_noi
        .checked_div(exit_cap_rate)
        .unwrap_or(Decimal::ZERO);
    let sale_commission = gross_sale_price * commission_rate;

    ExitValuation {
        exit_cap_rate,
        terminal_noi,
        gross_sale_price,
        sale_commission,
        loan_payoff,
        net_sale_proceeds: gross_sale_price - sale_commission - loan_payoff,
    }
}

/// Unlevered-to-equity deal series: `[-equity, cf1, ..., cfN + net sale]`.
pub fn deal_cash_flows(equity: Money, years: &[YearRecord], exit: &ExitValuation) -> Vec<Money> {
    let mut flows = Vec::with_capacity(years.len() + 1);
    flows.push(-equity);
    flows.extend(years.iter().map(|y| y.cash_flow));
    if !years.is_empty() {
        if let Some(last) = flows.last_mut() {
            *last += exit.net_sale_proceeds;
        }
    }
    flows
}
