use analysis_core::{
    growth_rate, safe_divide, BalanceSheet, CashFlowStatement, CompanyProfile, IncomeStatement,
    MarketSnapshot,
};
use serde::{Deserialize, Serialize};

/// Valuation multiples from the latest statements and current price.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValuationMultiples {
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub ps_ratio: Option<f64>,
    pub ev_ebitda: Option<f64>,
    pub peg_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfitabilityMetrics {
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub roe: Option<f64>,
    pub roa: Option<f64>,
    pub roic: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiquidityMetrics {
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeverageMetrics {
    pub de_ratio: Option<f64>,
    pub interest_coverage: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EfficiencyMetrics {
    pub asset_turnover: Option<f64>,
    pub inventory_turnover: Option<f64>,
}

/// Year-over-year growth, as decimals (0.10 = 10%).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrowthMetrics {
    pub revenue_growth: Option<f64>,
    pub net_income_growth: Option<f64>,
    pub eps_growth: Option<f64>,
    /// Free-cash-flow growth, the figure the DCF valuation consumes.
    pub fcf_growth: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashFlowMetrics {
    pub fcf_yield: Option<f64>,
    pub fcf_per_share: Option<f64>,
    pub ocf_to_net_income: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DividendMetrics {
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
}

/// Full fundamental metric set. Every value is independently nullable:
/// None means "insufficient data", never zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub valuation: ValuationMultiples,
    pub profitability: ProfitabilityMetrics,
    pub liquidity: LiquidityMetrics,
    pub leverage: LeverageMetrics,
    pub efficiency: EfficiencyMetrics,
    pub growth: GrowthMetrics,
    pub cash_flow: CashFlowMetrics,
    pub dividends: DividendMetrics,
}

impl FinancialMetrics {
    /// Number of populated metrics, for logging.
    pub fn computed_count(&self) -> usize {
        [
            self.valuation.pe_ratio,
            self.valuation.pb_ratio,
            self.valuation.ps_ratio,
            self.valuation.ev_ebitda,
            self.valuation.peg_ratio,
            self.profitability.gross_margin,
            self.profitability.operating_margin,
            self.profitability.net_margin,
            self.profitability.roe,
            self.profitability.roa,
            self.profitability.roic,
            self.liquidity.current_ratio,
            self.liquidity.quick_ratio,
            self.leverage.de_ratio,
            self.leverage.interest_coverage,
            self.efficiency.asset_turnover,
            self.efficiency.inventory_turnover,
            self.growth.revenue_growth,
            self.growth.net_income_growth,
            self.growth.eps_growth,
            self.growth.fcf_growth,
            self.cash_flow.fcf_yield,
            self.cash_flow.fcf_per_share,
            self.cash_flow.ocf_to_net_income,
            self.dividends.dividend_yield,
            self.dividends.payout_ratio,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }
}

pub struct FinancialMetricsEngine;

impl FinancialMetricsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute all fundamental ratios from a snapshot. Pure and
    /// deterministic; missing inputs propagate as None.
    pub fn analyze(&self, snapshot: &MarketSnapshot) -> FinancialMetrics {
        tracing::info!("Calculating financial metrics for {}", snapshot.ticker);

        let income = snapshot.statements.income.first();
        let prev_income = snapshot.statements.income.get(1);
        let balance = snapshot.statements.balance.first();
        let cash_flow = snapshot.statements.cash_flow.first();
        let prev_cash_flow = snapshot.statements.cash_flow.get(1);
        let profile = &snapshot.profile;

        let current_price = snapshot.latest_close().or(profile.price);

        let metrics = FinancialMetrics {
            valuation: self.valuation(current_price, income, prev_income, balance, profile),
            profitability: self.profitability(income, balance),
            liquidity: self.liquidity(balance),
            leverage: self.leverage(income, balance),
            efficiency: self.efficiency(income, balance),
            growth: self.growth(income, prev_income, cash_flow, prev_cash_flow),
            cash_flow: self.cash_flow(cash_flow, income, profile),
            dividends: self.dividends(cash_flow, income, profile, current_price),
        };

        tracing::info!(
            "Computed {}/26 financial metrics for {}",
            metrics.computed_count(),
            snapshot.ticker
        );

        metrics
    }

    fn valuation(
        &self,
        price: Option<f64>,
        income: Option<&IncomeStatement>,
        prev_income: Option<&IncomeStatement>,
        balance: Option<&BalanceSheet>,
        profile: &CompanyProfile,
    ) -> ValuationMultiples {
        let eps = income.and_then(|i| i.eps);
        let shares = income.and_then(|i| i.weighted_average_shares);
        let revenue = income.and_then(|i| i.revenue);
        let equity = balance.and_then(|b| b.total_equity);

        let pe = safe_divide(price, eps);

        let book_value_per_share = safe_divide(equity, shares);
        let pb = safe_divide(price, book_value_per_share);

        let revenue_per_share = safe_divide(revenue, shares);
        let ps = safe_divide(price, revenue_per_share);

        // Enterprise value = market cap + total debt - cash
        let ev = profile.market_cap.map(|mc| {
            mc + balance.and_then(|b| b.total_debt).unwrap_or(0.0)
                - balance.and_then(|b| b.cash_and_equivalents).unwrap_or(0.0)
        });
        let ev_ebitda = safe_divide(ev, income.and_then(|i| i.ebitda));

        let eps_growth = growth_rate(eps, prev_income.and_then(|i| i.eps));
        let peg = safe_divide(pe, eps_growth.map(|g| g * 100.0));

        ValuationMultiples {
            pe_ratio: pe,
            pb_ratio: pb,
            ps_ratio: ps,
            ev_ebitda,
            peg_ratio: peg,
        }
    }

    fn profitability(
        &self,
        income: Option<&IncomeStatement>,
        balance: Option<&BalanceSheet>,
    ) -> ProfitabilityMetrics {
        let revenue = income.and_then(|i| i.revenue);
        let net_income = income.and_then(|i| i.net_income);
        let equity = balance.and_then(|b| b.total_equity);

        // ROIC = NOPAT / invested capital, with invested capital defined as
        // equity + total debt - cash
        let roic = {
            let operating_income = income.and_then(|i| i.operating_income);
            let nopat = operating_income.map(|oi| {
                let eff_tax = safe_divide(
                    income.and_then(|i| i.income_tax_expense),
                    income.and_then(|i| i.income_before_tax),
                )
                .unwrap_or(0.21);
                oi * (1.0 - eff_tax)
            });
            let invested_capital = equity.map(|eq| {
                eq + balance.and_then(|b| b.total_debt).unwrap_or(0.0)
                    - balance.and_then(|b| b.cash_and_equivalents).unwrap_or(0.0)
            });
            safe_divide(nopat, invested_capital)
        };

        ProfitabilityMetrics {
            gross_margin: safe_divide(income.and_then(|i| i.gross_profit), revenue),
            operating_margin: safe_divide(income.and_then(|i| i.operating_income), revenue),
            net_margin: safe_divide(net_income, revenue),
            roe: safe_divide(net_income, equity),
            roa: safe_divide(net_income, balance.and_then(|b| b.total_assets)),
            roic,
        }
    }

    fn liquidity(&self, balance: Option<&BalanceSheet>) -> LiquidityMetrics {
        let current_assets = balance.and_then(|b| b.total_current_assets);
        let current_liabilities = balance.and_then(|b| b.total_current_liabilities);
        let quick_assets =
            current_assets.map(|ca| ca - balance.and_then(|b| b.inventory).unwrap_or(0.0));

        LiquidityMetrics {
            current_ratio: safe_divide(current_assets, current_liabilities),
            quick_ratio: safe_divide(quick_assets, current_liabilities),
        }
    }

    fn leverage(
        &self,
        income: Option<&IncomeStatement>,
        balance: Option<&BalanceSheet>,
    ) -> LeverageMetrics {
        LeverageMetrics {
            de_ratio: safe_divide(
                balance.and_then(|b| b.total_debt),
                balance.and_then(|b| b.total_equity),
            ),
            interest_coverage: safe_divide(
                income.and_then(|i| i.operating_income),
                income.and_then(|i| i.interest_expense),
            ),
        }
    }

    fn efficiency(
        &self,
        income: Option<&IncomeStatement>,
        balance: Option<&BalanceSheet>,
    ) -> EfficiencyMetrics {
        EfficiencyMetrics {
            asset_turnover: safe_divide(
                income.and_then(|i| i.revenue),
                balance.and_then(|b| b.total_assets),
            ),
            inventory_turnover: safe_divide(
                income.and_then(|i| i.cost_of_revenue),
                balance.and_then(|b| b.inventory),
            ),
        }
    }

    fn growth(
        &self,
        income: Option<&IncomeStatement>,
        prev_income: Option<&IncomeStatement>,
        cash_flow: Option<&CashFlowStatement>,
        prev_cash_flow: Option<&CashFlowStatement>,
    ) -> GrowthMetrics {
        GrowthMetrics {
            revenue_growth: growth_rate(
                income.and_then(|i| i.revenue),
                prev_income.and_then(|i| i.revenue),
            ),
            net_income_growth: growth_rate(
                income.and_then(|i| i.net_income),
                prev_income.and_then(|i| i.net_income),
            ),
            eps_growth: growth_rate(
                income.and_then(|i| i.eps),
                prev_income.and_then(|i| i.eps),
            ),
            fcf_growth: growth_rate(
                cash_flow.and_then(|c| c.free_cash_flow),
                prev_cash_flow.and_then(|c| c.free_cash_flow),
            ),
        }
    }

    fn cash_flow(
        &self,
        cash_flow: Option<&CashFlowStatement>,
        income: Option<&IncomeStatement>,
        profile: &CompanyProfile,
    ) -> CashFlowMetrics {
        let fcf = cash_flow.and_then(|c| c.free_cash_flow);

        CashFlowMetrics {
            fcf_yield: safe_divide(fcf, profile.market_cap),
            fcf_per_share: safe_divide(fcf, income.and_then(|i| i.weighted_average_shares)),
            ocf_to_net_income: safe_divide(
                cash_flow.and_then(|c| c.operating_cash_flow),
                income.and_then(|i| i.net_income),
            ),
        }
    }

    fn dividends(
        &self,
        cash_flow: Option<&CashFlowStatement>,
        income: Option<&IncomeStatement>,
        profile: &CompanyProfile,
        price: Option<f64>,
    ) -> DividendMetrics {
        let dividends_paid = cash_flow
            .and_then(|c| c.dividends_paid)
            .map(f64::abs)
            .filter(|d| *d > 0.0);

        DividendMetrics {
            dividend_yield: safe_divide(profile.last_dividend, price),
            payout_ratio: safe_divide(dividends_paid, income.and_then(|i| i.net_income)),
        }
    }
}

impl Default for FinancialMetricsEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{Bar, FinancialStatements};
    use chrono::Utc;

    fn snapshot_with(
        income: Vec<IncomeStatement>,
        balance: Vec<BalanceSheet>,
        cash_flow: Vec<CashFlowStatement>,
        profile: CompanyProfile,
        close: f64,
    ) -> MarketSnapshot {
        MarketSnapshot {
            ticker: "TEST".to_string(),
            bars: vec![Bar {
                timestamp: Utc::now(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000_000.0,
            }],
            statements: FinancialStatements {
                income,
                balance,
                cash_flow,
            },
            profile,
            benchmark_bars: vec![],
            news: vec![],
        }
    }

    fn sample_income() -> IncomeStatement {
        IncomeStatement {
            revenue: Some(1000.0),
            cost_of_revenue: Some(400.0),
            gross_profit: Some(600.0),
            operating_income: Some(300.0),
            net_income: Some(200.0),
            eps: Some(2.0),
            ebitda: Some(350.0),
            interest_expense: Some(10.0),
            income_before_tax: Some(250.0),
            income_tax_expense: Some(50.0),
            weighted_average_shares: Some(100.0),
            ..IncomeStatement::default()
        }
    }

    fn sample_balance() -> BalanceSheet {
        BalanceSheet {
            total_assets: Some(2000.0),
            total_current_assets: Some(800.0),
            total_current_liabilities: Some(400.0),
            inventory: Some(100.0),
            total_debt: Some(500.0),
            cash_and_equivalents: Some(300.0),
            total_equity: Some(1000.0),
            ..BalanceSheet::default()
        }
    }

    #[test]
    fn pe_and_margins_from_full_statements() {
        let snapshot = snapshot_with(
            vec![sample_income()],
            vec![sample_balance()],
            vec![],
            CompanyProfile::default(),
            50.0,
        );
        let m = FinancialMetricsEngine::new().analyze(&snapshot);

        assert_eq!(m.valuation.pe_ratio, Some(25.0)); // 50 / 2
        assert_eq!(m.profitability.gross_margin, Some(0.6));
        assert_eq!(m.profitability.net_margin, Some(0.2));
        assert_eq!(m.profitability.roe, Some(0.2));
        assert_eq!(m.liquidity.current_ratio, Some(2.0));
        assert_eq!(m.leverage.de_ratio, Some(0.5));
        assert_eq!(m.leverage.interest_coverage, Some(30.0));
    }

    #[test]
    fn roic_uses_nopat_over_invested_capital() {
        let snapshot = snapshot_with(
            vec![sample_income()],
            vec![sample_balance()],
            vec![],
            CompanyProfile::default(),
            50.0,
        );
        let m = FinancialMetricsEngine::new().analyze(&snapshot);

        // eff tax = 50/250 = 0.20, NOPAT = 300 * 0.8 = 240
        // invested capital = 1000 + 500 - 300 = 1200
        let roic = m.profitability.roic.unwrap();
        assert!((roic - 240.0 / 1200.0).abs() < 1e-9);
    }

    #[test]
    fn zero_eps_yields_null_pe() {
        let mut income = sample_income();
        income.eps = Some(0.0);
        let snapshot = snapshot_with(
            vec![income],
            vec![],
            vec![],
            CompanyProfile::default(),
            50.0,
        );
        let m = FinancialMetricsEngine::new().analyze(&snapshot);
        assert_eq!(m.valuation.pe_ratio, None);
    }

    #[test]
    fn growth_needs_two_periods() {
        let mut prev = sample_income();
        prev.revenue = Some(800.0);
        prev.eps = Some(1.6);
        let snapshot = snapshot_with(
            vec![sample_income(), prev],
            vec![],
            vec![],
            CompanyProfile::default(),
            50.0,
        );
        let m = FinancialMetricsEngine::new().analyze(&snapshot);

        let g = m.growth.revenue_growth.unwrap();
        assert!((g - 0.25).abs() < 1e-9);
        // PEG = PE / (eps growth * 100) = 25 / 25
        let peg = m.valuation.peg_ratio.unwrap();
        assert!((peg - 1.0).abs() < 1e-9);

        let single = snapshot_with(
            vec![sample_income()],
            vec![],
            vec![],
            CompanyProfile::default(),
            50.0,
        );
        let m = FinancialMetricsEngine::new().analyze(&single);
        assert_eq!(m.growth.revenue_growth, None);
    }

    #[test]
    fn fcf_growth_from_consecutive_cash_flow_statements() {
        let latest = CashFlowStatement {
            free_cash_flow: Some(110.0),
            ..CashFlowStatement::default()
        };
        let prior = CashFlowStatement {
            free_cash_flow: Some(100.0),
            ..CashFlowStatement::default()
        };
        let snapshot = snapshot_with(
            vec![],
            vec![],
            vec![latest.clone(), prior],
            CompanyProfile::default(),
            50.0,
        );
        let m = FinancialMetricsEngine::new().analyze(&snapshot);
        let g = m.growth.fcf_growth.unwrap();
        assert!((g - 0.10).abs() < 1e-9);

        let single = snapshot_with(
            vec![],
            vec![],
            vec![latest],
            CompanyProfile::default(),
            50.0,
        );
        let m = FinancialMetricsEngine::new().analyze(&single);
        assert_eq!(m.growth.fcf_growth, None);
    }

    #[test]
    fn empty_statements_yield_all_null() {
        let snapshot = snapshot_with(
            vec![],
            vec![],
            vec![],
            CompanyProfile::default(),
            50.0,
        );
        let m = FinancialMetricsEngine::new().analyze(&snapshot);
        assert_eq!(m.computed_count(), 0);
    }

    #[test]
    fn dividend_metrics_from_profile_and_cash_flow() {
        let profile = CompanyProfile {
            last_dividend: Some(1.0),
            ..CompanyProfile::default()
        };
        let cash_flow = CashFlowStatement {
            dividends_paid: Some(-50.0),
            ..CashFlowStatement::default()
        };
        let snapshot = snapshot_with(
            vec![sample_income()],
            vec![],
            vec![cash_flow],
            profile,
            50.0,
        );
        let m = FinancialMetricsEngine::new().analyze(&snapshot);

        assert_eq!(m.dividends.dividend_yield, Some(0.02)); // 1 / 50
        assert_eq!(m.dividends.payout_ratio, Some(0.25)); // 50 / 200
    }
}
