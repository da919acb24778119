use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use underwrite_core::deal::{DealInput, LoanType};
use underwrite_core::normalize::{self, RawValue};
use underwrite_core::proforma::{project_deal, Anchor, LoanSource, Projection, ProjectionResult};
use underwrite_core::time_value::{amortization_payment, irr, RATIO_LIMIT};
use underwrite_core::ProjectionDefaults;

fn raw(s: &str) -> Option<RawValue> {
    Some(RawValue::from(s))
}

fn scenario_deal() -> DealInput {
    DealInput {
        asking_price: raw("1000000"),
        gross_income: raw("120000"),
        occupancy: raw("92"),
        opex: raw("45000"),
        ltv: raw("70"),
        interest_rate: raw("7.25"),
        amortization_years: raw("30"),
        ..Default::default()
    }
}

fn complete(deal: &DealInput) -> ProjectionResult {
    match project_deal(deal, &ProjectionDefaults::default()) {
        Projection::Complete(result) => *result,
        Projection::Incomplete { missing } => panic!("expected complete projection, missing {missing:?}"),
    }
}

// ===========================================================================
// End-to-end scenario
// ===========================================================================

#[test]
fn test_scenario_year_one_noi() {
    let result = complete(&scenario_deal());
    assert_eq!(result.years.len(), 5);

    let y1 = &result.years[0];
    assert_eq!(y1.effective_gross_income, dec!(120000) * dec!(0.92));
    assert_eq!(y1.noi, y1.effective_gross_income - dec!(45000));
    assert_eq!(y1.noi, dec!(65400));
}

#[test]
fn test_scenario_debt_service() {
    let result = complete(&scenario_deal());
    let y1 = &result.years[0];
    // 700k at 7.25% over 30 years ≈ 4,775 per month
    let expected_payment = amortization_payment(dec!(0.0725) / dec!(12), 360, dec!(700000)).unwrap();
    assert!(
        (result.assumptions.monthly_payment - expected_payment).abs() < dec!(0.000001),
        "monthly payment {}",
        result.assumptions.monthly_payment
    );
    assert!(
        (y1.debt_service - expected_payment * dec!(12)).abs() < dec!(0.01),
        "debt service {}",
        y1.debt_service
    );
    assert!(
        (y1.dscr - dec!(1.141)).abs() < dec!(0.01),
        "Expected DSCR ~1.14, got {}",
        y1.dscr
    );
}

#[test]
fn test_scenario_irr_converged() {
    let result = complete(&scenario_deal());
    let irr = result.metrics.irr;
    assert!(irr.converged, "IRR did not converge: {irr:?}");
    // Whole-deal series: -300k, cash flows of ~8.1k rising to ~16.3k, plus ~370k at exit
    assert!(
        (result.metrics.deal_irr.rate - dec!(0.0792)).abs() < dec!(0.0005),
        "Expected deal IRR ~7.92%, got {}",
        result.metrics.deal_irr.rate
    );
}

#[test]
fn test_scenario_lp_exit_payout() {
    let result = complete(&scenario_deal());
    let w = &result.waterfall;

    // Year 5 NOI ≈ 73,608 at a 7% cap, less 2% commission ≈ 1,030,516,
    // less a ≈ 660,651 payoff leaves ≈ 369,864 of net sale proceeds
    assert!(
        (result.exit.net_sale_proceeds - dec!(369864.43)).abs() < dec!(1),
        "net sale proceeds {}",
        result.exit.net_sale_proceeds
    );
    assert_eq!(w.annual_preferred, dec!(24000));
    assert_eq!(w.total_preferred_accrued, dec!(120000));
    assert_eq!(w.total_preferred_paid, dec!(120000));

    // 120,000 + 45% × 369,864 − 120,000 ≈ 166,439
    assert!(
        (w.exit_payout - dec!(166438.99)).abs() < dec!(1),
        "exit payout {}",
        w.exit_payout
    );
    assert!(
        (result.metrics.equity_multiple - dec!(0.5548)).abs() < dec!(0.001),
        "equity multiple {}",
        result.metrics.equity_multiple
    );

    // 120,000 of coupons plus ≈ 166,439 at exit on 300,000 invested
    assert!(
        (result.metrics.irr.rate - dec!(-0.0110)).abs() < dec!(0.0005),
        "LP IRR {}",
        result.metrics.irr.rate
    );
}

#[test]
fn test_scenario_equity_derived_from_price() {
    let result = complete(&scenario_deal());
    assert_eq!(result.loan_amount, dec!(700000));
    assert_eq!(result.equity, dec!(300000));
    assert!(result.flags.equity_source.is_derived());
    assert_eq!(result.deal_cash_flows[0], dec!(-300000));
}

#[test]
fn test_lp_series_matches_waterfall() {
    let result = complete(&scenario_deal());
    let w = &result.waterfall;
    assert_eq!(w.cash_flows[0], -result.equity);
    for flow in &w.cash_flows[1..5] {
        assert_eq!(*flow, w.annual_preferred);
    }
    assert_eq!(w.cash_flows[5], w.annual_preferred + w.exit_payout);
    assert_eq!(
        result.metrics.equity_multiple,
        w.exit_payout / result.equity
    );
}

// ===========================================================================
// Growth and escalation
// ===========================================================================

#[test]
fn test_zero_growth_zero_vacancy_noi_is_flat() {
    let mut deal = scenario_deal();
    deal.occupancy = raw("100");
    deal.rent_growth = raw("0");
    deal.expense_growth = raw("0");

    let result = complete(&deal);
    let first = result.years[0].noi;
    for year in &result.years {
        assert_eq!(year.noi, first, "year {} NOI drifted", year.year);
        assert_eq!(year.vacancy_loss, Decimal::ZERO);
    }
}

#[test]
fn test_negative_rent_growth_text() {
    let mut deal = scenario_deal();
    deal.rent_growth = raw("-3");
    let result = complete(&deal);
    assert_eq!(result.assumptions.rent_growth, dec!(-0.03));
    assert!(result.years[1].gross_potential_rent < result.years[0].gross_potential_rent);
}

#[test]
fn test_itemized_management_uses_larger_of_fixed_and_percent() {
    let mut deal = scenario_deal();
    deal.opex = None;
    deal.taxes = raw("15000");
    deal.management = raw("1000");

    let result = complete(&deal);
    let y1 = &result.years[0];
    // 2% of 110,400 EGI beats the 1,000 fixed fee
    assert_eq!(y1.expenses.management, dec!(2208));

    deal.management = raw("5000");
    let result = complete(&deal);
    assert_eq!(result.years[0].expenses.management, dec!(5000));
}

// ===========================================================================
// Debt
// ===========================================================================

#[test]
fn test_amortizing_balance_strictly_decreases() {
    for rate in ["3", "7.25", "12"] {
        let mut deal = scenario_deal();
        deal.interest_rate = raw(rate);
        let result = complete(&deal);

        let mut previous = result.loan_amount;
        for year in &result.years {
            assert!(
                year.ending_balance < previous,
                "rate {rate}: year {} balance {} not below {}",
                year.year,
                year.ending_balance,
                previous
            );
            previous = year.ending_balance;
        }
    }
}

#[test]
fn test_interest_only_period_holds_balance() {
    let mut deal = scenario_deal();
    deal.loan_type = Some("interest-only".into());
    deal.io_years = raw("2");

    let result = complete(&deal);
    assert_eq!(result.assumptions.loan_type, LoanType::InterestOnly);
    assert_eq!(result.years[0].principal, Decimal::ZERO);
    assert_eq!(result.years[1].ending_balance, result.loan_amount);
    assert!(result.years[2].ending_balance < result.years[1].ending_balance);
    assert!(result.years[4].ending_balance < result.years[3].ending_balance);
}

#[test]
fn test_explicit_loan_beats_ltv() {
    let mut deal = scenario_deal();
    deal.loan_amount = raw("$650,000");

    let result = complete(&deal);
    assert_eq!(result.loan_amount, dec!(650000));
    assert!(result.flags.used_explicit_loan);
    assert!(!result.flags.used_arv_loan);
    assert_eq!(result.flags.loan_source, LoanSource::Explicit);
}

#[test]
fn test_arv_loan_flagged() {
    let mut deal = scenario_deal();
    deal.after_repair_value = raw("1,200,000");

    let result = complete(&deal);
    assert_eq!(result.loan_amount, dec!(840000));
    assert!(result.flags.used_arv_loan);
    assert_eq!(result.equity, dec!(160000));
}

// ===========================================================================
// Incomplete projections
// ===========================================================================

#[test]
fn test_missing_income_and_loan_is_incomplete() {
    let deal = DealInput {
        asking_price: raw("1000000"),
        ..Default::default()
    };
    assert_eq!(
        project_deal(&deal, &ProjectionDefaults::default()),
        Projection::Incomplete {
            missing: vec![Anchor::GrossIncome, Anchor::LoanAmount]
        }
    );
}

#[test]
fn test_rent_roll_completes_income() {
    let mut deal = scenario_deal();
    deal.gross_income = None;
    deal.units = raw("10");
    deal.market_rent = raw("1000");

    let result = complete(&deal);
    assert_eq!(result.assumptions.gross_income, dec!(120000));
}

// ===========================================================================
// Out-of-range inputs
// ===========================================================================

#[test]
fn test_huge_interest_rate_uses_default() {
    let mut deal = scenario_deal();
    deal.interest_rate = raw("1e26");

    let result = complete(&deal);
    assert_eq!(result.assumptions.interest_rate, dec!(0.07));
    assert!(result.notes.iter().any(|n| n.starts_with("Interest rate")));
}

#[test]
fn test_long_amortization_is_bounded() {
    let mut deal = scenario_deal();
    deal.interest_rate = raw("-1");
    deal.amortization_years = raw("20000000");

    let started = std::time::Instant::now();
    let result = complete(&deal);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(result.assumptions.amortization_years, 30);
    assert!(result.notes.iter().any(|n| n.starts_with("Amortization term")));
}

#[test]
fn test_vanishing_exit_cap_uses_default() {
    let mut deal = scenario_deal();
    deal.exit_cap_rate = raw("0.0000000000000000000000000001");

    let result = complete(&deal);
    assert_eq!(result.exit.exit_cap_rate, dec!(0.07));
}

#[test]
fn test_extreme_inputs_do_not_panic() {
    let cases = [
        DealInput {
            asking_price: raw("0.0000000000000000000000000001"),
            gross_income: raw("1000000000000"),
            loan_amount: raw("0.0000000000000000000000000001"),
            interest_rate: raw("0.0000000000000000000000000001"),
            ..Default::default()
        },
        DealInput {
            asking_price: raw("1000000000000"),
            units: raw("999999999999"),
            market_rent: raw("999999999999"),
            gross_income: raw("1000000000000"),
            other_income: raw("1000000000000"),
            opex: raw("1000000000000"),
            ltv: raw("100"),
            interest_rate: raw("100"),
            amortization_years: raw("50"),
            rent_growth: raw("100"),
            expense_growth: raw("-100"),
            occupancy: raw("1e-28"),
            preferred_return: raw("100"),
            profit_share: raw("100"),
            exit_cap_rate: raw("0.1%"),
            ..Default::default()
        },
        DealInput {
            asking_price: raw("1e30"),
            gross_income: raw("-1e30"),
            loan_amount: raw("79228162514264337593543950335"),
            ..Default::default()
        },
    ];

    for deal in &cases {
        let projection = project_deal(deal, &ProjectionDefaults::default());
        if let Some(result) = projection.result() {
            for year in &result.years {
                assert!(year.dscr.abs() <= RATIO_LIMIT);
                assert!(year.cap_rate.abs() <= RATIO_LIMIT);
            }
        }
        let report = underwrite_core::audit_deal(deal, &projection, &underwrite_core::AuditThresholds::default());
        assert!(report.score <= 100);
        let _ = underwrite_core::deal_digest(deal, &projection);
    }
}

#[test]
fn test_rent_roll_beyond_range_is_unresolved() {
    let deal = DealInput {
        asking_price: raw("1000000"),
        units: raw("999999999999"),
        market_rent: raw("999999999999"),
        ltv: raw("70"),
        ..Default::default()
    };
    assert_eq!(
        project_deal(&deal, &ProjectionDefaults::default()),
        Projection::Incomplete {
            missing: vec![Anchor::GrossIncome]
        }
    );
}

// ===========================================================================
// Library primitives
// ===========================================================================

#[test]
fn test_zero_rate_payment_is_straight_line() {
    let payment = amortization_payment(Decimal::ZERO, 240, dec!(480000)).unwrap();
    assert_eq!(payment, dec!(2000));
}

#[test]
fn test_irr_ten_percent() {
    let estimate = irr(&[dec!(-100), dec!(110)], dec!(0.15));
    assert!(
        (estimate.rate - dec!(0.10)).abs() < dec!(0.0001),
        "Expected IRR ~10%, got {}",
        estimate.rate
    );
}

#[test]
fn test_rate_normalizer_agrees() {
    let text = normalize::rate(raw("75").as_ref(), Decimal::ZERO);
    let number = normalize::rate(Some(&RawValue::from(dec!(0.75))), Decimal::ZERO);
    assert_eq!(text, number);
    assert_eq!(normalize::rate(raw("-3").as_ref(), Decimal::ZERO), dec!(-0.03));
}
