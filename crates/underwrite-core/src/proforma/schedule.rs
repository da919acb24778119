use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::proforma::financing::DebtYear;
use crate::proforma::resolve::ExpenseBasis;
use crate::time_value::{growth_factor, quotient};
use crate::types::{Money, Rate};

/// Operating assumptions driving the annual roll-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingPlan {
    pub gross_income: Money,
    pub other_income: Money,
    pub vacancy_rate: Rate,
    pub rent_growth: Rate,
    pub expense_growth: Rate,
    pub insurance_growth: Rate,
    pub maintenance_growth: Rate,
    pub expenses: ExpenseBasis,
}

/// Expense lines for one year. Unitemized carries a single total or the
/// heuristic figure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseLines {
    pub taxes: Money,
    pub insurance: Money,
    pub maintenance: Money,
    pub management: Money,
    pub reserves: Money,
    pub utilities: Money,
    pub unitemized: Money,
}

impl ExpenseLines {
    pub fn total(&self) -> Money {
        self.taxes
            + self.insurance
            + self.maintenance
            + self.management
            + self.reserves
            + self.utilities
            + self.unitemized
    }
}

/// One projected operating year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRecord {
    pub year: u32,
    pub gross_potential_rent: Money,
    pub vacancy_loss: Money,
    pub other_income: Money,
    pub effective_gross_income: Money,
    pub expenses: ExpenseLines,
    pub total_opex: Money,
    pub noi: Money,
    pub interest: Money,
    pub principal: Money,
    pub debt_service: Money,
    pub cash_flow: Money,
    /// NOI / debt service; zero when there is no debt service
    pub dscr: Decimal,
    /// NOI / purchase price
    pub cap_rate: Rate,
    pub beginning_balance: Money,
    pub ending_balance: Money,
}

impl OperatingPlan {
    /// Expenses for `year` (1-based). Growth compounds from year one.
    pub fn expenses_for_year(&self, year: u32, effective_gross_income: Money) -> ExpenseLines {
        let elapsed = year.saturating_sub(1);
        match &self.expenses {
            ExpenseBasis::Itemized {
                taxes,
                insurance,
                maintenance,
                management_fixed,
                management_rate,
                reserves,
                utilities,
            } => ExpenseLines {
                taxes: *taxes,
                insurance: *insurance * growth_factor(self.insurance_growth, elapsed),
                maintenance: *maintenance * growth_factor(self.maintenance_growth, elapsed),
                management: (*management_fixed).max(effective_gross_income * *management_rate),
                reserves: *reserves,
                utilities: *utilities,
                unitemized: Decimal::ZERO,
            },
            ExpenseBasis::Total { amount } | ExpenseBasis::Heuristic { amount } => ExpenseLines {
                unitemized: *amount * growth_factor(self.expense_growth, elapsed),
                ..Default::default()
            },
        }
    }

    /// Build the annual pro forma against a debt schedule of the same length.
    pub fn project(&self, debt: &[DebtYear], purchase_price: Money) -> Vec<YearRecord> {
        debt.iter()
            .map(|d| {
                let year = d.year;
                let gross_potential_rent =
                    self.gross_income * growth_factor(self.rent_growth, year.saturating_sub(1));
                let vacancy_loss = gross_potential_rent * self.vacancy_rate;
                let effective_gross_income =
                    gross_potential_rent - vacancy_loss + self.other_income;

                let expenses = self.expenses_for_year(year, effective_gross_income);
                let total_opex = expenses.total();
                let noi = effective_gross_income - total_opex;

                let debt_service = d.debt_service();
                let dscr = quotient(noi, debt_service);
                let cap_rate = quotient(noi, purchase_price);

                YearRecord {
                    year,
                    gross_potential_rent,
                    vacancy_loss,
                    other_income: self.other_income,
                    effective_gross_income,
                    expenses,
                    total_opex,
                    noi,
                    interest: d.interest,
                    principal: d.principal,
                    debt_service,
                    cash_flow: noi - debt_service,
                    dscr,
                    cap_rate,
                    beginning_balance: d.beginning_balance,
                    ending_balance: d.ending_balance,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn plan(expenses: ExpenseBasis) -> OperatingPlan {
        OperatingPlan {
            gross_income: dec!(150000),
            other_income: Decimal::ZERO,
            vacancy_rate: dec!(0.05),
            rent_growth: dec!(0.03),
            expense_growth: dec!(0.03),
            insurance_growth: dec!(0.05),
            maintenance_growth: dec!(0.02),
            expenses,
        }
    }

    fn itemized() -> ExpenseBasis {
        ExpenseBasis::Itemized {
            taxes: dec!(18000),
            insurance: dec!(8000),
            maintenance: dec!(10000),
            management_fixed: Decimal::ZERO,
            management_rate: dec!(0.02),
            reserves: dec!(5000),
            utilities: dec!(7000),
        }
    }

    fn no_debt(years: u32) -> Vec<DebtYear> {
        (1..=years)
            .map(|year| DebtYear {
                year,
                beginning_balance: Decimal::ZERO,
                interest: Decimal::ZERO,
                principal: Decimal::ZERO,
                ending_balance: Decimal::ZERO,
            })
            .collect()
    }

    #[test]
    fn test_year_one_itemized() {
        let years = plan(itemized()).project(&no_debt(1), dec!(1000000));
        let y1 = &years[0];
        assert_eq!(y1.effective_gross_income, dec!(142500));
        assert_eq!(y1.expenses.management, dec!(2850));
        assert_eq!(y1.total_opex, dec!(50850));
        assert_eq!(y1.noi, dec!(91650));
        assert_eq!(y1.cap_rate, dec!(0.09165));
        assert_eq!(y1.dscr, Decimal::ZERO);
    }

    #[test]
    fn test_itemized_lines_escalate_independently() {
        let p = plan(itemized());
        let y3 = p.expenses_for_year(3, dec!(150000));
        assert_eq!(y3.taxes, dec!(18000));
        assert_eq!(y3.insurance, dec!(8820));
        assert_eq!(y3.maintenance, dec!(10404));
        assert_eq!(y3.reserves, dec!(5000));
    }

    #[test]
    fn test_fixed_management_floor() {
        let mut basis = itemized();
        if let ExpenseBasis::Itemized { management_fixed, .. } = &mut basis {
            *management_fixed = dec!(6000);
        }
        let lines = plan(basis).expenses_for_year(1, dec!(142500));
        assert_eq!(lines.management, dec!(6000));
    }

    #[test]
    fn test_total_opex_grows_with_expense_growth() {
        let p = plan(ExpenseBasis::Total { amount: dec!(40000) });
        assert_eq!(p.expenses_for_year(1, dec!(0)).total(), dec!(40000));
        assert_eq!(p.expenses_for_year(2, dec!(0)).total(), dec!(41200));
    }

    #[test]
    fn test_other_income_not_subject_to_vacancy() {
        let mut p = plan(ExpenseBasis::Total { amount: dec!(40000) });
        p.other_income = dec!(6000);
        let years = p.project(&no_debt(1), dec!(1000000));
        assert_eq!(years[0].vacancy_loss, dec!(7500));
        assert_eq!(years[0].effective_gross_income, dec!(148500));
    }
}
