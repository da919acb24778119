use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::UnderwriteError;
use crate::types::{Money, Rate};
use crate::UnderwriteResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 80;
const MIN_IRR_RATE: Decimal = dec!(-0.99);

/// Reporting ratios (DSCR, cap rate, multiples) are clamped to this magnitude.
pub const RATIO_LIMIT: Decimal = dec!(1000000000000);

/// Best-effort IRR solution. `converged` is false when the solver ran out of
/// iterations or hit a step it could not represent; `rate` is then the last
/// valid estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrEstimate {
    pub rate: Rate,
    pub iterations: u32,
    pub converged: bool,
}

/// `(1 + rate)^periods`; None on overflow.
fn compound(rate: Rate, periods: u32) -> Option<Decimal> {
    Decimal::ONE
        .checked_add(rate)?
        .checked_powu(u64::from(periods))
}

/// `numerator / denominator` for reported ratios: zero on a zero denominator,
/// clamped to `±RATIO_LIMIT` when the quotient is larger or not representable.
pub fn quotient(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    let limit = if numerator.is_sign_negative() == denominator.is_sign_negative() {
        RATIO_LIMIT
    } else {
        -RATIO_LIMIT
    };
    match numerator.checked_div(denominator) {
        Some(q) if q.abs() <= RATIO_LIMIT => q,
        _ => limit,
    }
}

/// Escalation factor for `periods` years of growth. Saturates at the last
/// representable factor rather than overflowing.
pub fn growth_factor(rate: Rate, periods: u32) -> Decimal {
    let one_plus_r = Decimal::ONE + rate;
    let mut factor = Decimal::ONE;
    for _ in 0..periods {
        match factor.checked_mul(one_plus_r) {
            Some(next) => factor = next,
            None => break,
        }
    }
    factor
}

/// Level payment for a fully amortizing loan: `r·P / (1 − (1+r)^-n)`.
///
/// Falls back to straight-line `P/n` when the rate is zero or so small that
/// `(1+r)^n` is indistinguishable from one.
pub fn amortization_payment(rate: Rate, periods: u32, principal: Money) -> UnderwriteResult<Money> {
    if periods == 0 {
        return Err(UnderwriteError::InvalidInput {
            field: "periods".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    let n = Decimal::from(periods);
    if rate.is_zero() {
        return Ok(principal / n);
    }

    let overflow = || UnderwriteError::InvalidInput {
        field: "rate".into(),
        reason: format!("Compounding {rate} over {periods} periods overflows"),
    };
    let growth = compound(rate, periods).ok_or_else(overflow)?;
    let denominator = growth - Decimal::ONE;
    if denominator.is_zero() {
        return Ok(principal / n);
    }

    // r·P first: it is small when r is tiny, and growth / (growth − 1) is
    // near one when r is large
    let annuity = growth.checked_div(denominator).ok_or_else(overflow)?;
    rate.checked_mul(principal)
        .and_then(|rp| rp.checked_mul(annuity))
        .ok_or_else(overflow)
}

/// Net Present Value of a series of cash flows (index 0 is undiscounted).
pub fn npv(rate: Rate, cash_flows: &[Money]) -> UnderwriteResult<Money> {
    if rate <= dec!(-1) {
        return Err(UnderwriteError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    npv_and_derivative(rate, cash_flows)
        .map(|(value, _)| value)
        .ok_or_else(|| UnderwriteError::InvalidInput {
            field: "cash_flows".into(),
            reason: format!("NPV at {rate} is not representable"),
        })
}

/// NPV and dNPV/dr in one pass. None when any intermediate overflows or
/// divides by zero.
fn npv_and_derivative(rate: Rate, cash_flows: &[Money]) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE.checked_add(rate)?;
    let mut discount = Decimal::ONE;
    let mut value = Decimal::ZERO;
    let mut derivative = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r)?;
        }
        value = value.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let t_dec = Decimal::from(t as u64);
            let term = t_dec
                .checked_mul(*cf)?
                .checked_div(discount.checked_mul(one_plus_r)?)?;
            derivative = derivative.checked_sub(term)?;
        }
    }

    Some((value, derivative))
}

/// Internal Rate of Return using Newton-Raphson.
///
/// Never fails: pathological series (all positive, all negative) return the
/// last valid rate with `converged: false`.
pub fn irr(cash_flows: &[Money], guess: Rate) -> IrrEstimate {
    let mut rate = guess.max(MIN_IRR_RATE);

    for i in 0..MAX_IRR_ITERATIONS {
        let Some((npv_val, dnpv)) = npv_and_derivative(rate, cash_flows) else {
            return not_converged(rate, i);
        };

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return IrrEstimate {
                rate,
                iterations: i,
                converged: true,
            };
        }

        let Some(next) = npv_val
            .checked_div(dnpv)
            .and_then(|step| rate.checked_sub(step))
        else {
            return not_converged(rate, i);
        };

        // Guard against divergence into rates below -100%
        rate = next.max(MIN_IRR_RATE);
    }

    not_converged(rate, MAX_IRR_ITERATIONS)
}

fn not_converged(rate: Rate, iterations: u32) -> IrrEstimate {
    warn!(%rate, iterations, "IRR did not converge; returning last estimate");
    IrrEstimate {
        rate,
        iterations,
        converged: false,
    }
}
