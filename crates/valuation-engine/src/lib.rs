//! Discounted cash flow valuation.
//!
//! Projects free cash flow over a fixed horizon at a clamped growth rate,
//! discounts at WACC, and adds a Gordon-growth terminal value. Any missing
//! input (FCF, shares outstanding) or a WACC at or below the perpetual
//! growth rate yields a null valuation instead of a nonsense number.

use analysis_core::{finite, safe_divide, AnalysisConfig, MarketSnapshot};
use serde::{Deserialize, Serialize};

/// Statutory fallback when the effective tax rate cannot be derived.
const DEFAULT_TAX_RATE: f64 = 0.21;
/// Growth applied when no historical FCF growth is available.
const DEFAULT_FCF_GROWTH: f64 = 0.05;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DcfValuation {
    pub intrinsic_value_per_share: Option<f64>,
    pub current_price: Option<f64>,
    /// (intrinsic - price) / price, as a decimal.
    pub upside: Option<f64>,
    pub wacc: Option<f64>,
    pub cost_of_equity: Option<f64>,
    pub cost_of_debt_after_tax: Option<f64>,
    pub latest_fcf: Option<f64>,
    pub growth_rate_used: Option<f64>,
}

pub struct ValuationEngine;

impl ValuationEngine {
    /// `fcf_growth` is the historical free-cash-flow growth estimate, if one
    /// could be computed from the statements.
    pub fn analyze(
        snapshot: &MarketSnapshot,
        fcf_growth: Option<f64>,
        config: &AnalysisConfig,
    ) -> DcfValuation {
        let current_price = snapshot.latest_close();

        let latest_fcf = snapshot
            .statements
            .cash_flow
            .first()
            .and_then(|cf| cf.free_cash_flow)
            .and_then(finite);

        let growth = fcf_growth
            .and_then(finite)
            .unwrap_or(DEFAULT_FCF_GROWTH)
            .clamp(config.min_fcf_growth, config.max_fcf_growth);

        let cost_of_equity = cost_of_equity(snapshot, config);
        let cost_of_debt = after_tax_cost_of_debt(snapshot);
        let wacc = wacc(snapshot, cost_of_equity, cost_of_debt);

        let mut valuation = DcfValuation {
            current_price,
            wacc,
            cost_of_equity,
            cost_of_debt_after_tax: cost_of_debt,
            latest_fcf,
            growth_rate_used: Some(growth),
            ..DcfValuation::default()
        };

        let (fcf, rate) = match (latest_fcf, wacc) {
            (Some(fcf), Some(rate)) if fcf > 0.0 => (fcf, rate),
            _ => {
                tracing::debug!(
                    "DCF skipped for {}: missing or non-positive FCF, or no WACC",
                    snapshot.ticker
                );
                return valuation;
            }
        };

        if rate <= config.perpetual_growth_rate {
            tracing::warn!(
                "DCF skipped for {}: WACC {:.4} at or below perpetual growth {:.4}",
                snapshot.ticker,
                rate,
                config.perpetual_growth_rate
            );
            return valuation;
        }

        let shares = match snapshot.profile.shares_outstanding.and_then(finite) {
            Some(s) if s > 0.0 => s,
            _ => return valuation,
        };

        // Sum of discounted projected cash flows.
        let mut enterprise_value = 0.0;
        let mut projected = fcf;
        for year in 1..=config.projection_years {
            projected *= 1.0 + growth;
            enterprise_value += projected / (1.0 + rate).powi(year as i32);
        }

        // Gordon-growth terminal value, discounted back from the horizon.
        let terminal = projected * (1.0 + config.perpetual_growth_rate)
            / (rate - config.perpetual_growth_rate);
        enterprise_value += terminal / (1.0 + rate).powi(config.projection_years as i32);

        // Equity value adjusts for net debt.
        let debt = balance_field(snapshot, |b| b.total_debt).unwrap_or(0.0);
        let cash = balance_field(snapshot, |b| b.cash_and_equivalents).unwrap_or(0.0);
        let equity_value = enterprise_value - debt + cash;

        let intrinsic = finite(equity_value / shares);
        valuation.intrinsic_value_per_share = intrinsic;
        valuation.upside = match (intrinsic, current_price) {
            (Some(iv), Some(price)) if price > 0.0 => finite((iv - price) / price),
            _ => None,
        };
        valuation
    }
}

/// CAPM: rf + beta * (market - rf). Beta defaults to 1.0 when unknown.
fn cost_of_equity(snapshot: &MarketSnapshot, config: &AnalysisConfig) -> Option<f64> {
    let beta = snapshot.profile.beta.and_then(finite).unwrap_or(1.0);
    finite(config.risk_free_rate + beta * (config.market_return - config.risk_free_rate))
}

fn after_tax_cost_of_debt(snapshot: &MarketSnapshot) -> Option<f64> {
    let income = snapshot.statements.income.first()?;
    let debt = balance_field(snapshot, |b| b.total_debt)?;
    if debt <= 0.0 {
        return Some(0.0);
    }

    let pre_tax = safe_divide(income.interest_expense.map(f64::abs), Some(debt))?;
    let tax_rate = safe_divide(income.income_tax_expense, income.income_before_tax)
        .filter(|t| (0.0..1.0).contains(t))
        .unwrap_or(DEFAULT_TAX_RATE);
    finite(pre_tax * (1.0 - tax_rate))
}

/// Market-cap / total-debt weighted average. Falls back to the cost of
/// equity alone when the capital structure is unknown.
fn wacc(
    snapshot: &MarketSnapshot,
    cost_of_equity: Option<f64>,
    cost_of_debt: Option<f64>,
) -> Option<f64> {
    let equity = snapshot.profile.market_cap.and_then(finite);
    let debt = balance_field(snapshot, |b| b.total_debt);

    match (equity, debt, cost_of_equity, cost_of_debt) {
        (Some(e), Some(d), Some(ce), Some(cd)) if e + d > 0.0 => {
            finite((e / (e + d)) * ce + (d / (e + d)) * cd)
        }
        _ => cost_of_equity,
    }
}

fn balance_field(
    snapshot: &MarketSnapshot,
    field: impl Fn(&analysis_core::BalanceSheet) -> Option<f64>,
) -> Option<f64> {
    snapshot
        .statements
        .balance
        .first()
        .and_then(field)
        .and_then(finite)
}
