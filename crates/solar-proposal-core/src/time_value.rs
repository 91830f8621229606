use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::ProposalError;
use crate::types::{Money, Rate};
use crate::ProposalResult;

/// Stop once successive Newton iterates move less than this.
const RATE_TOLERANCE: Decimal = dec!(0.000001);
/// Below this the NPV slope is treated as flat and the search is abandoned.
const DERIVATIVE_FLOOR: Decimal = dec!(0.00000001);
const MAX_IRR_ITERATIONS: u32 = 100;

/// Convert an annual rate to its monthly-compounded equivalent:
/// `(1 + r)^(1/12) - 1`.
///
/// A rate below -100% has no real twelfth root and yields 0.
pub fn to_monthly(annual_rate: Rate) -> Rate {
    let base = match Decimal::ONE.checked_add(annual_rate) {
        Some(b) => b,
        None => return Decimal::ZERO,
    };
    if base < Decimal::ZERO {
        return Decimal::ZERO;
    }
    if base.is_zero() {
        return -Decimal::ONE;
    }
    let twelfth = Decimal::ONE / Decimal::from(12);
    base.checked_powd(twelfth)
        .map(|factor| factor - Decimal::ONE)
        .unwrap_or(Decimal::ZERO)
}

/// `base^exp` for a non-negative integer exponent, `None` on overflow.
pub fn checked_pow(base: Decimal, exp: u32) -> Option<Decimal> {
    if exp == 0 {
        return Some(Decimal::ONE);
    }
    base.checked_powi(i64::from(exp))
}

/// `(1 + rate)^periods`, `None` when it is not representable.
pub fn growth_factor(rate: Rate, periods: u32) -> Option<Decimal> {
    if periods == 0 {
        return Some(Decimal::ONE);
    }
    checked_pow(Decimal::ONE.checked_add(rate)?, periods)
}

/// Net Present Value of a series of cash flows; the first flow is undiscounted.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> ProposalResult<Money> {
    if rate <= dec!(-1) {
        return Err(ProposalError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE.checked_add(rate).ok_or_else(|| {
        ProposalError::FinancialImpossibility(format!("discount rate {rate} overflows"))
    })?;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r).ok_or_else(|| {
                ProposalError::FinancialImpossibility(format!(
                    "NPV discount factor overflows at period {t}"
                ))
            })?;
        }
        let pv = cf
            .checked_div(discount)
            .ok_or_else(|| ProposalError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            })?;
        result = result.checked_add(pv).ok_or_else(|| {
            ProposalError::FinancialImpossibility(format!("NPV overflows at period {t}"))
        })?;
    }

    Ok(result)
}

/// NPV and its derivative with respect to the rate, `None` when any term
/// leaves the representable range.
fn npv_with_slope(one_plus_r: Decimal, cash_flows: &[Money]) -> Option<(Decimal, Decimal)> {
    let mut value = Decimal::ZERO;
    let mut slope = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        let discount = checked_pow(one_plus_r, t as u32)?;
        if discount.is_zero() {
            return None;
        }
        value = value.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let t_dec = Decimal::from(t as u64);
            let term = (t_dec.checked_mul(*cf)?).checked_div(discount.checked_mul(one_plus_r)?)?;
            slope = slope.checked_sub(term)?;
        }
    }

    Some((value, slope))
}

/// Internal Rate of Return using Newton-Raphson.
///
/// Bounded to 100 iterations. Converges when the step is below 1e-6; gives up
/// when the slope flattens below 1e-8, when any intermediate overflows, or
/// when the rate would fall to -100% or lower.
///
/// A flattened slope is an error rather than an early return of the current
/// iterate: a rate that has not met the step tolerance is never reported.
pub fn irr(cash_flows: &[Money], guess: Rate) -> ProposalResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(ProposalError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let diverged = |iterations: u32, last_delta: Decimal| ProposalError::ConvergenceFailure {
        function: "IRR".into(),
        iterations,
        last_delta,
    };

    let mut rate = guess;

    for i in 0..MAX_IRR_ITERATIONS {
        let one_plus_r = Decimal::ONE
            .checked_add(rate)
            .ok_or_else(|| diverged(i, rate))?;
        if one_plus_r <= Decimal::ZERO {
            return Err(diverged(i, rate));
        }

        let (npv_val, dnpv) =
            npv_with_slope(one_plus_r, cash_flows).ok_or_else(|| diverged(i, rate))?;

        if dnpv.abs() < DERIVATIVE_FLOOR {
            return Err(diverged(i, npv_val));
        }

        let step = npv_val
            .checked_div(dnpv)
            .ok_or_else(|| diverged(i, npv_val))?;
        let next = rate.checked_sub(step).ok_or_else(|| diverged(i, step))?;

        if step.abs() < RATE_TOLERANCE {
            if next <= dec!(-1) {
                break;
            }
            return Ok(next);
        }
        rate = next;
    }

    Err(diverged(
        MAX_IRR_ITERATIONS,
        npv(rate, cash_flows).unwrap_or(Decimal::MAX),
    ))
}
