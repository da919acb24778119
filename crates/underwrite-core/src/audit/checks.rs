use rust_decimal::Decimal;

use super::{AuditCategory, AuditFinding, AuditStatus};
use crate::config::{AuditThresholds, Band};
use crate::deal::DealInput;
use crate::format::{money, multiple, percent, ratio};
use crate::normalize::{self, has_text, positive};
use crate::proforma::{OpexSource, ProjectionResult, YearRecord};
use crate::time_value::quotient;
use crate::types::PROJECTION_YEARS;

struct Battery<'a> {
    thresholds: &'a AuditThresholds,
    findings: Vec<AuditFinding>,
}

impl Battery<'_> {
    fn push(&mut self, category: AuditCategory, title: String, status: AuditStatus, detail: String) {
        self.findings.push(AuditFinding {
            title,
            status,
            detail,
            category,
        });
    }

    /// Pass when `ok`, otherwise `miss`.
    fn check(
        &mut self,
        category: AuditCategory,
        title: impl Into<String>,
        ok: bool,
        miss: AuditStatus,
        detail: String,
    ) {
        let status = if ok { AuditStatus::Pass } else { miss };
        self.push(category, title.into(), status, detail);
    }

    fn band(
        &mut self,
        category: AuditCategory,
        title: impl Into<String>,
        value: Decimal,
        band: Band,
        fmt: fn(Decimal) -> String,
    ) {
        let detail = format!("{} (expected {} to {})", fmt(value), fmt(band.min), fmt(band.max));
        self.check(category, title, band.contains(value), AuditStatus::Warn, detail);
    }

    fn present(&mut self, title: &str, present: bool) {
        let detail = if present { "Provided" } else { "Not provided" };
        self.check(
            AuditCategory::DataQuality,
            title,
            present,
            AuditStatus::Warn,
            detail.into(),
        );
    }
}

pub(super) fn run_battery(
    deal: &DealInput,
    result: &ProjectionResult,
    thresholds: &AuditThresholds,
) -> Vec<AuditFinding> {
    let mut battery = Battery {
        thresholds,
        findings: Vec::with_capacity(141),
    };

    financial(&mut battery, deal, result);
    market(&mut battery, result);
    debt(&mut battery, deal, result);
    returns(&mut battery, deal, result);
    data_quality(&mut battery, deal);
    for year in &result.years {
        yearly(&mut battery, result, year);
    }
    anomaly(&mut battery, result);

    battery.findings
}

// ---------------------------------------------------------------------------
// Deal-level checks
// ---------------------------------------------------------------------------

fn financial(b: &mut Battery<'_>, deal: &DealInput, r: &ProjectionResult) {
    let t = b.thresholds;
    let gross_income = r.assumptions.gross_income;

    let explicit_income = positive(deal.gross_income.as_ref());
    b.check(
        AuditCategory::Financial,
        "Gross income provided",
        explicit_income.is_some(),
        AuditStatus::Fail,
        match explicit_income {
            Some(v) => money(v),
            None => format!("Not provided; estimated {} from rent roll", money(gross_income)),
        },
    );

    let opex_provided = r.flags.opex_source != OpexSource::Heuristic;
    b.check(
        AuditCategory::Financial,
        "Operating expenses provided",
        opex_provided,
        AuditStatus::Warn,
        if opex_provided {
            "Itemized or total expenses supplied".into()
        } else {
            "Estimated from a flat expense ratio".into()
        },
    );

    let year1_opex = r.first_year().map(|y| y.total_opex).unwrap_or_default();
    b.band(
        AuditCategory::Financial,
        "Expense ratio",
        quotient(year1_opex, gross_income),
        t.expense_ratio,
        percent,
    );
}

fn market(b: &mut Battery<'_>, r: &ProjectionResult) {
    let band = b.thresholds.vacancy;
    b.band(
        AuditCategory::Market,
        "Vacancy assumption",
        r.assumptions.vacancy_rate,
        band,
        percent,
    );
}

fn debt(b: &mut Battery<'_>, deal: &DealInput, r: &ProjectionResult) {
    let t = b.thresholds;

    let ltv = normalize::positive_rate(deal.ltv.as_ref())
        .unwrap_or_else(|| quotient(r.loan_amount, r.assumptions.purchase_price));
    b.band(AuditCategory::Debt, "Loan-to-value", ltv, t.ltv, percent);
    b.band(
        AuditCategory::Debt,
        "Interest rate",
        r.assumptions.interest_rate,
        t.interest_rate,
        percent,
    );

    let dscr = r.metrics.year1_dscr;
    let status = if dscr >= t.dscr_pass {
        AuditStatus::Pass
    } else if dscr >= t.dscr_warn {
        AuditStatus::Warn
    } else {
        AuditStatus::Fail
    };
    b.push(
        AuditCategory::Debt,
        "Year 1 DSCR".into(),
        status,
        format!("{} (minimum {})", ratio(dscr), ratio(t.dscr_pass)),
    );
}

fn returns(b: &mut Battery<'_>, deal: &DealInput, r: &ProjectionResult) {
    let t = b.thresholds;
    let m = &r.metrics;

    b.check(
        AuditCategory::Returns,
        "Positive cash-on-cash",
        m.cash_on_cash > Decimal::ZERO,
        AuditStatus::Fail,
        percent(m.cash_on_cash),
    );

    let target_irr = normalize::rate(deal.target_irr.as_ref(), t.target_irr);
    b.check(
        AuditCategory::Returns,
        "IRR meets target",
        m.irr.rate >= target_irr,
        AuditStatus::Warn,
        format!("{} vs target {}", percent(m.irr.rate), percent(target_irr)),
    );

    b.check(
        AuditCategory::Returns,
        "Equity multiple",
        m.equity_multiple >= t.min_equity_multiple,
        AuditStatus::Warn,
        format!(
            "{} (minimum {})",
            multiple(m.equity_multiple),
            multiple(t.min_equity_multiple)
        ),
    );
}

fn data_quality(b: &mut Battery<'_>, deal: &DealInput) {
    let numeric = [
        ("Property taxes", &deal.taxes),
        ("Insurance", &deal.insurance),
        ("Capital expenditure", &deal.capex),
        ("Occupancy", &deal.occupancy),
        ("Square footage", &deal.sqft),
        ("Year built", &deal.year_built),
    ];
    for (title, value) in numeric {
        b.present(title, positive(value.as_ref()).is_some());
    }

    let text = [
        ("Submarket", &deal.submarket),
        ("Comparable sales", &deal.comps),
        ("Known risks", &deal.known_risks),
        ("Business plan", &deal.business_plan),
        ("Address", &deal.address),
    ];
    for (title, value) in text {
        b.present(title, has_text(value.as_ref()));
    }

    b.present("Unit count", positive(deal.units.as_ref()).is_some());
}

// ---------------------------------------------------------------------------
// Per-year checks
// ---------------------------------------------------------------------------

fn yearly(b: &mut Battery<'_>, r: &ProjectionResult, y: &YearRecord) {
    let t = b.thresholds;
    let a = &r.assumptions;
    let n = y.year;
    let cat = AuditCategory::Yearly;
    let title = |name: &str| format!("Year {n}: {name}");

    b.check(cat, title("NOI positive"), y.noi > Decimal::ZERO, AuditStatus::Fail, money(y.noi));

    b.check(
        cat,
        title("DSCR above breakeven"),
        y.dscr >= t.yearly_min_dscr,
        AuditStatus::Fail,
        ratio(y.dscr),
    );
    b.check(
        cat,
        title("DSCR at lender target"),
        y.dscr >= t.yearly_target_dscr,
        AuditStatus::Warn,
        format!("{} (target {})", ratio(y.dscr), ratio(t.yearly_target_dscr)),
    );

    b.check(
        cat,
        title("Cash flow positive"),
        y.cash_flow > Decimal::ZERO,
        AuditStatus::Fail,
        money(y.cash_flow),
    );

    b.check(
        cat,
        title("Cap rate floor"),
        y.cap_rate >= t.cap_rate.min,
        AuditStatus::Warn,
        format!("{} (minimum {})", percent(y.cap_rate), percent(t.cap_rate.min)),
    );
    b.check(
        cat,
        title("Cap rate ceiling"),
        y.cap_rate <= t.cap_rate.max,
        AuditStatus::Warn,
        format!("{} (maximum {})", percent(y.cap_rate), percent(t.cap_rate.max)),
    );

    let prior_balance = if n <= 1 {
        r.loan_amount
    } else {
        r.year(n - 1).map(|p| p.ending_balance).unwrap_or(r.loan_amount)
    };
    b.check(
        cat,
        title("Loan balance not increasing"),
        y.ending_balance <= prior_balance,
        AuditStatus::Fail,
        format!("{} (prior {})", money(y.ending_balance), money(prior_balance)),
    );

    b.band(
        cat,
        title("Expense ratio"),
        quotient(y.total_opex, y.effective_gross_income),
        t.expense_ratio,
        percent,
    );

    let debt_yield = quotient(y.noi, r.loan_amount);
    b.check(
        cat,
        title("Debt yield"),
        debt_yield >= t.min_debt_yield,
        AuditStatus::Warn,
        format!("{} (minimum {})", percent(debt_yield), percent(t.min_debt_yield)),
    );

    let stressed_noi = y.noi * (Decimal::ONE - t.noi_stress);
    b.check(
        cat,
        title("NOI survives income stress"),
        stressed_noi > Decimal::ZERO,
        AuditStatus::Warn,
        money(stressed_noi),
    );

    let stressed_ds = y.debt_service * (Decimal::ONE + t.debt_service_stress);
    let stressed_coverage = quotient(y.noi, stressed_ds);
    b.check(
        cat,
        title("Coverage survives rate stress"),
        stressed_ds.is_zero() || stressed_coverage >= Decimal::ONE,
        AuditStatus::Warn,
        ratio(stressed_coverage),
    );

    b.check(
        cat,
        title("Gross rent positive"),
        y.gross_potential_rent > Decimal::ZERO,
        AuditStatus::Fail,
        money(y.gross_potential_rent),
    );

    b.check(
        cat,
        title("Income covers expenses"),
        y.effective_gross_income > y.total_opex,
        AuditStatus::Fail,
        format!("EGI {} vs opex {}", money(y.effective_gross_income), money(y.total_opex)),
    );

    let after_debt = y.noi - y.debt_service;
    b.check(
        cat,
        title("NOI exceeds debt service"),
        after_debt > Decimal::ZERO,
        AuditStatus::Warn,
        money(after_debt),
    );

    let year1_balance = r.first_year().map(|f| f.ending_balance).unwrap_or(r.loan_amount);
    b.check(
        cat,
        title("Balance at or below year 1"),
        y.ending_balance <= year1_balance,
        AuditStatus::Warn,
        money(y.ending_balance),
    );

    let implied_value = quotient(y.noi, a.exit_cap_rate);
    b.check(
        cat,
        title("Implied value positive"),
        implied_value > Decimal::ZERO,
        AuditStatus::Warn,
        money(implied_value),
    );

    let margin = quotient(y.cash_flow, y.effective_gross_income);
    b.check(
        cat,
        title("Cash flow margin"),
        margin > t.min_cash_flow_margin,
        AuditStatus::Warn,
        format!("{} (minimum {})", percent(margin), percent(t.min_cash_flow_margin)),
    );

    let (noi_holds, noi_detail) = match n.checked_sub(2).and_then(|earlier| r.year(earlier)) {
        Some(earlier) => {
            let floor = earlier.noi * (Decimal::ONE - t.max_noi_decline);
            (
                y.noi >= floor,
                format!("{} vs year {} {}", money(y.noi), earlier.year, money(earlier.noi)),
            )
        }
        None => (true, "No comparison year".into()),
    };
    b.check(cat, title("NOI trend"), noi_holds, AuditStatus::Warn, noi_detail);

    b.check(
        cat,
        title("Balance non-negative"),
        y.ending_balance >= Decimal::ZERO,
        AuditStatus::Fail,
        money(y.ending_balance),
    );

    b.band(cat, title("Vacancy sanity"), a.vacancy_rate, t.vacancy_sanity, percent);
    b.band(cat, title("Rent growth sanity"), a.rent_growth, t.rent_growth_sanity, percent);
    b.band(
        cat,
        title("Expense growth sanity"),
        a.expense_growth,
        t.expense_growth_sanity,
        percent,
    );
    b.band(cat, title("Exit cap sanity"), a.exit_cap_rate, t.exit_cap_sanity, percent);
}

// ---------------------------------------------------------------------------
// Anomaly checks
// ---------------------------------------------------------------------------

fn anomaly(b: &mut Battery<'_>, r: &ProjectionResult) {
    let t = b.thresholds;
    let cat = AuditCategory::Anomaly;

    b.check(
        cat,
        "IRR plausibility",
        r.metrics.irr.rate <= t.max_irr,
        AuditStatus::Warn,
        format!("{} (maximum {})", percent(r.metrics.irr.rate), percent(t.max_irr)),
    );

    b.band(cat, "Year 1 DSCR plausibility", r.metrics.year1_dscr, t.year1_dscr_sanity, ratio);

    let years = r.years.len();
    b.check(
        cat,
        "Projection length",
        years == PROJECTION_YEARS as usize,
        AuditStatus::Fail,
        format!("{years} years"),
    );

    b.check(
        cat,
        "Equity source",
        !r.flags.equity_source.is_derived(),
        AuditStatus::Warn,
        format!("{:?}", r.flags.equity_source),
    );
}
