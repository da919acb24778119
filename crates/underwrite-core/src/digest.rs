//! Plain-text deal digest for the narrative collaborator.

use crate::deal::DealInput;
use crate::format::{money, multiple, percent, ratio};
use crate::normalize::{self, RawValue};
use crate::proforma::Projection;

const MISSING: &str = "N/A";

fn text(value: Option<&String>) -> &str {
    value.map(|s| s.trim()).filter(|s| !s.is_empty()).unwrap_or(MISSING)
}

fn amount(value: Option<&RawValue>) -> String {
    normalize::positive(value).map(money).unwrap_or_else(|| MISSING.into())
}

fn amount_per(value: Option<&RawValue>, period: &str) -> String {
    normalize::positive(value)
        .map(|v| format!("{}/{period}", money(v)))
        .unwrap_or_else(|| MISSING.into())
}

fn rate(value: Option<&RawValue>) -> String {
    normalize::opt_rate(value).map(percent).unwrap_or_else(|| MISSING.into())
}

fn figure(value: Option<&RawValue>) -> String {
    normalize::parse(value)
        .map(|v| v.normalize().to_string())
        .unwrap_or_else(|| MISSING.into())
}

/// Field-by-field summary of the deal, followed by the engine's derived
/// figures when the projection is complete. Missing values print as `N/A`.
pub fn deal_digest(deal: &DealInput, projection: &Projection) -> String {
    let d = deal;
    let mut lines = vec![
        format!(
            "Deal: {} | Type: {} | Market: {} | Address: {}",
            text(d.name.as_ref()),
            text(d.property_type.as_ref()),
            text(d.market.as_ref()),
            text(d.address.as_ref()),
        ),
        format!(
            "Units: {} | Year built: {} | Sqft: {} | Lot: {} ac | Source: {}",
            figure(d.units.as_ref()),
            figure(d.year_built.as_ref()),
            figure(d.sqft.as_ref()),
            figure(d.lot_size.as_ref()),
            text(d.source.as_ref()),
        ),
        format!("Description: {}", text(d.description.as_ref())),
        format!(
            "Asking: {} | Offer: {} | ARV: {}",
            amount(d.asking_price.as_ref()),
            amount(d.offer_price.as_ref()),
            amount(d.after_repair_value.as_ref()),
        ),
        format!(
            "Gross income: {} | Other income: {} | Occupancy: {} | Market rent: {}",
            amount_per(d.gross_income.as_ref(), "yr"),
            amount_per(d.other_income.as_ref(), "yr"),
            rate(d.occupancy.as_ref()),
            amount_per(d.market_rent.as_ref(), "mo"),
        ),
        format!(
            "Opex: {} | Taxes: {} | Insurance: {} | Capex: {}",
            amount_per(d.opex.as_ref(), "yr"),
            amount(d.taxes.as_ref()),
            amount(d.insurance.as_ref()),
            amount(d.capex.as_ref()),
        ),
        format!(
            "LTV: {} | Rate: {} | Amortization: {} yrs | Loan type: {}",
            rate(d.ltv.as_ref()),
            rate(d.interest_rate.as_ref()),
            figure(d.amortization_years.as_ref()),
            text(d.loan_type.as_ref()),
        ),
        format!(
            "Targets: CoC {} | IRR {} | Multiple {} | Hold {} yrs",
            rate(d.target_coc.as_ref()),
            rate(d.target_irr.as_ref()),
            figure(d.target_multiple.as_ref()),
            figure(d.hold_period.as_ref()),
        ),
        format!(
            "Submarket: {} | Comps: {} | Plan: {} | Risks: {} | Notes: {}",
            text(d.submarket.as_ref()),
            text(d.comps.as_ref()),
            text(d.business_plan.as_ref()),
            text(d.known_risks.as_ref()),
            text(d.additional_notes.as_ref()),
        ),
    ];
    lines.extend(engine_lines(projection));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn engine_lines(projection: &Projection) -> Vec<String> {
    let r = match projection {
        Projection::Complete(r) => r,
        Projection::Incomplete { missing } => {
            let labels: Vec<&str> = missing.iter().map(|a| a.label()).collect();
            return vec![format!("Engine: not projected (missing {})", labels.join(", "))];
        }
    };

    let m = &r.metrics;
    let mut lines = Vec::with_capacity(3);
    if let Some(y1) = r.first_year() {
        lines.push(format!(
            "Engine year 1: NOI {} | Debt service {} | Cash flow {} | DSCR {} | Cap rate {}",
            money(y1.noi),
            money(y1.debt_service),
            money(y1.cash_flow),
            ratio(y1.dscr),
            percent(y1.cap_rate),
        ));
    }
    lines.push(format!(
        "Engine capital: Loan {} | Equity {} | Exit value {} | Net sale {}",
        money(r.loan_amount),
        money(r.equity),
        money(r.exit.gross_sale_price),
        money(r.exit.net_sale_proceeds),
    ));
    lines.push(format!(
        "Engine returns: LP IRR {} | Cash-on-cash {} | Equity multiple {}",
        percent(m.irr.rate),
        percent(m.cash_on_cash),
        multiple(m.equity_multiple),
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectionDefaults;
    use crate::proforma::project_deal;

    #[test]
    fn test_missing_fields_print_na() {
        let deal = DealInput::default();
        let digest = deal_digest(&deal, &project_deal(&deal, &ProjectionDefaults::default()));
        assert!(digest.starts_with("Deal: N/A | Type: N/A"));
        assert!(digest.contains("not projected (missing purchase price, gross income, loan amount)"));
        assert_eq!(digest.lines().count(), 10);
        assert!(digest.ends_with(")\n"));
    }

    #[test]
    fn test_rounded_money_and_percent() {
        let deal = DealInput {
            name: Some("Oakwood".into()),
            asking_price: Some("1000000.4".into()),
            gross_income: Some("120000".into()),
            occupancy: Some("92".into()),
            opex: Some("45000".into()),
            ltv: Some("70".into()),
            interest_rate: Some("7.25".into()),
            ..Default::default()
        };
        let digest = deal_digest(&deal, &project_deal(&deal, &ProjectionDefaults::default()));
        assert!(digest.contains("Deal: Oakwood"));
        assert!(digest.contains("Asking: $1,000,000"));
        assert!(digest.contains("Occupancy: 92.00%"));
        assert!(digest.contains("Rate: 7.25%"));
        assert!(digest.contains("NOI $65,400"));
        assert!(digest.contains("Equity $300,000"));

        let lines: Vec<&str> = digest.lines().collect();
        assert_eq!(lines.len(), 12);
        assert!(lines[9].starts_with("Engine year 1:"));
        assert!(lines[11].starts_with("Engine returns:"));
    }
}
