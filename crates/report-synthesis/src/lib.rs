//! Assembles engine outputs into a markdown research report plus the
//! chart-ready series that back it.

pub mod chart;
pub mod fmt;
pub mod recommendation;

pub use chart::ChartData;
pub use recommendation::{recommend, Recommendation, RecommendationAction};

use analysis_core::MarketSnapshot;
use chrono::{DateTime, Utc};
use financial_metrics::FinancialMetrics;
use risk_analysis::{RiskMetrics, RiskRating};
use sentiment_analysis::{SentimentLabel, SentimentSummary};
use serde::{Deserialize, Serialize};
use technical_analysis::{TechnicalSnapshot, TrendDirection};
use valuation_engine::DcfValuation;

/// Engine outputs for one job. Any engine may have failed; its slot is then
/// None and the report degrades section by section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportInputs {
    pub metrics: Option<FinancialMetrics>,
    pub technicals: Option<TechnicalSnapshot>,
    pub risk: Option<RiskMetrics>,
    pub valuation: Option<DcfValuation>,
    pub sentiment: Option<SentimentSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    pub ticker: String,
    pub generated_at: DateTime<Utc>,
    pub markdown: String,
    pub recommendation: Recommendation,
    /// The raw engine outputs backing the narrative, for API consumers.
    pub engines: ReportInputs,
    pub chart_data: ChartData,
}

pub struct ReportGenerator;

impl ReportGenerator {
    pub fn generate(snapshot: &MarketSnapshot, inputs: &ReportInputs) -> ReportPayload {
        tracing::info!("Generating report for {}", snapshot.ticker);

        let upside = inputs.valuation.as_ref().and_then(|v| v.upside);
        let rating = inputs
            .risk
            .as_ref()
            .map(|r| r.rating)
            .unwrap_or(RiskRating::Unknown);
        let (label, has_sentiment) = match &inputs.sentiment {
            Some(s) => (s.label, !s.no_data),
            None => (SentimentLabel::Neutral, false),
        };
        let recommendation = recommend(upside, rating, &label, has_sentiment);

        let markdown = render_markdown(snapshot, inputs, &recommendation);

        ReportPayload {
            ticker: snapshot.ticker.clone(),
            generated_at: Utc::now(),
            markdown,
            recommendation,
            engines: inputs.clone(),
            chart_data: ChartData::from_snapshot(snapshot),
        }
    }
}

fn render_markdown(
    snapshot: &MarketSnapshot,
    inputs: &ReportInputs,
    recommendation: &Recommendation,
) -> String {
    let mut md = String::new();

    overview_section(&mut md, snapshot, inputs, recommendation);
    valuation_section(&mut md, inputs);
    growth_section(&mut md, inputs);
    financial_health_section(&mut md, inputs);
    technical_section(&mut md, inputs);
    risk_section(&mut md, inputs);
    sentiment_section(&mut md, inputs);
    recommendation_section(&mut md, recommendation);

    md
}

fn overview_section(
    md: &mut String,
    snapshot: &MarketSnapshot,
    inputs: &ReportInputs,
    recommendation: &Recommendation,
) {
    let name = snapshot
        .profile
        .company_name
        .as_deref()
        .unwrap_or(&snapshot.ticker);
    md.push_str(&format!("# Equity Research Report: {}\n\n", snapshot.ticker));
    md.push_str(&format!(
        "**{}** | Price: {} | DCF Value: {}\n\n",
        recommendation.action.as_str(),
        fmt::currency(snapshot.latest_close()),
        fmt::currency(
            inputs
                .valuation
                .as_ref()
                .and_then(|v| v.intrinsic_value_per_share)
        ),
    ));
    md.push_str("## Overview\n\n");
    md.push_str(&format!("- **Company:** {}\n", name));
    if let Some(sector) = &snapshot.profile.sector {
        md.push_str(&format!("- **Sector:** {}\n", sector));
    }
    if let Some(industry) = &snapshot.profile.industry {
        md.push_str(&format!("- **Industry:** {}\n", industry));
    }
    md.push_str(&format!(
        "- **Current Price:** {}\n",
        fmt::currency(snapshot.latest_close())
    ));
    md.push_str(&format!(
        "- **Market Cap:** {}\n",
        fmt::large_number(snapshot.profile.market_cap)
    ));
    if let Some(m) = &inputs.metrics {
        md.push_str(&format!(
            "- **P/E Ratio:** {}\n",
            fmt::ratio(m.valuation.pe_ratio)
        ));
    }
    md.push('\n');
}

fn valuation_section(md: &mut String, inputs: &ReportInputs) {
    md.push_str("## Valuation\n\n");
    let valuation = match &inputs.valuation {
        Some(v) => v,
        None => {
            md.push_str("Valuation analysis unavailable.\n\n");
            return;
        }
    };

    md.push_str(&format!(
        "- **Intrinsic Value (DCF):** {}\n",
        fmt::currency(valuation.intrinsic_value_per_share)
    ));
    md.push_str(&format!(
        "- **Current Price:** {}\n",
        fmt::currency(valuation.current_price)
    ));
    md.push_str(&format!("- **Upside:** {}\n", fmt::percent(valuation.upside)));
    md.push_str(&format!("- **WACC:** {}\n", fmt::percent(valuation.wacc)));
    md.push_str(&format!(
        "- **FCF Growth Assumption:** {}\n",
        fmt::percent(valuation.growth_rate_used)
    ));

    if let Some(m) = &inputs.metrics {
        md.push_str(&format!(
            "- **P/B:** {} | **P/S:** {} | **EV/EBITDA:** {} | **PEG:** {}\n",
            fmt::ratio(m.valuation.pb_ratio),
            fmt::ratio(m.valuation.ps_ratio),
            fmt::ratio(m.valuation.ev_ebitda),
            fmt::ratio(m.valuation.peg_ratio),
        ));
    }
    md.push('\n');
}

fn growth_section(md: &mut String, inputs: &ReportInputs) {
    md.push_str("## Growth\n\n");
    let metrics = match &inputs.metrics {
        Some(m) => m,
        None => {
            md.push_str("Growth analysis unavailable.\n\n");
            return;
        }
    };

    md.push_str(&format!(
        "- **Revenue Growth (YoY):** {}\n",
        fmt::percent(metrics.growth.revenue_growth)
    ));
    md.push_str(&format!(
        "- **Net Income Growth (YoY):** {}\n",
        fmt::percent(metrics.growth.net_income_growth)
    ));
    md.push_str(&format!(
        "- **EPS Growth (YoY):** {}\n",
        fmt::percent(metrics.growth.eps_growth)
    ));
    md.push('\n');
}

fn financial_health_section(md: &mut String, inputs: &ReportInputs) {
    md.push_str("## Financial Health\n\n");
    let m = match &inputs.metrics {
        Some(m) => m,
        None => {
            md.push_str("Fundamental analysis unavailable.\n\n");
            return;
        }
    };

    md.push_str(&format!(
        "- **Gross Margin:** {} | **Operating Margin:** {} | **Net Margin:** {}\n",
        fmt::percent(m.profitability.gross_margin),
        fmt::percent(m.profitability.operating_margin),
        fmt::percent(m.profitability.net_margin),
    ));
    md.push_str(&format!(
        "- **ROE:** {} | **ROA:** {} | **ROIC:** {}\n",
        fmt::percent(m.profitability.roe),
        fmt::percent(m.profitability.roa),
        fmt::percent(m.profitability.roic),
    ));
    md.push_str(&format!(
        "- **Current Ratio:** {} | **Quick Ratio:** {}\n",
        fmt::ratio(m.liquidity.current_ratio),
        fmt::ratio(m.liquidity.quick_ratio),
    ));
    md.push_str(&format!(
        "- **Debt/Equity:** {} | **Interest Coverage:** {}\n",
        fmt::ratio(m.leverage.de_ratio),
        fmt::ratio(m.leverage.interest_coverage),
    ));
    md.push_str(&format!(
        "- **FCF Yield:** {} | **Dividend Yield:** {} | **Payout Ratio:** {}\n",
        fmt::percent(m.cash_flow.fcf_yield),
        fmt::percent(m.dividends.dividend_yield),
        fmt::percent(m.dividends.payout_ratio),
    ));
    md.push('\n');
}

fn technical_section(md: &mut String, inputs: &ReportInputs) {
    md.push_str("## Technical Analysis\n\n");
    let t = match &inputs.technicals {
        Some(t) => t,
        None => {
            md.push_str("Technical analysis unavailable.\n\n");
            return;
        }
    };

    md.push_str(&format!(
        "- **SMA 20/50/200:** {} / {} / {}\n",
        fmt::currency(t.moving_averages.sma_20),
        fmt::currency(t.moving_averages.sma_50),
        fmt::currency(t.moving_averages.sma_200),
    ));
    md.push_str(&format!("- **RSI (14):** {}\n", fmt::ratio(t.rsi_14)));
    md.push_str(&format!(
        "- **MACD:** {} | **Signal:** {} | **Histogram:** {}\n",
        fmt::ratio(t.macd.macd_line),
        fmt::ratio(t.macd.signal_line),
        fmt::ratio(t.macd.histogram),
    ));
    md.push_str(&format!(
        "- **Bollinger Bands:** {} / {} / {}\n",
        fmt::currency(t.bollinger.upper),
        fmt::currency(t.bollinger.middle),
        fmt::currency(t.bollinger.lower),
    ));
    md.push_str(&format!("- **ATR (14):** {}\n", fmt::ratio(t.atr_14)));
    md.push_str(&format!(
        "- **Momentum (ROC 5d/20d/60d):** {} / {} / {}\n",
        fmt::percent_points(t.momentum.roc_5d),
        fmt::percent_points(t.momentum.roc_20d),
        fmt::percent_points(t.momentum.roc_60d),
    ));
    md.push_str(&format!(
        "- **Avg Volume (20d/50d):** {} / {} ({})\n",
        fmt::quantity(t.volume.avg_volume_20),
        fmt::quantity(t.volume.avg_volume_50),
        t.volume.trend.as_str(),
    ));
    md.push_str(&format!(
        "- **52-Week Range:** {} - {}\n",
        fmt::currency(t.support_resistance.low_52_week),
        fmt::currency(t.support_resistance.high_52_week),
    ));
    md.push_str(&format!(
        "- **20-Day Support/Resistance:** {} / {}\n",
        fmt::currency(t.support_resistance.low_20_day),
        fmt::currency(t.support_resistance.high_20_day),
    ));

    if !t.signals.is_empty() {
        md.push_str("\n**Signals:**\n\n");
        for signal in &t.signals {
            let marker = match signal.direction {
                TrendDirection::Bullish => "[+]",
                TrendDirection::Bearish => "[-]",
                TrendDirection::Neutral => "[=]",
            };
            md.push_str(&format!("- {} {}\n", marker, signal.label));
        }
    }
    md.push('\n');
}

fn risk_section(md: &mut String, inputs: &ReportInputs) {
    md.push_str("## Risk\n\n");
    let r = match &inputs.risk {
        Some(r) => r,
        None => {
            md.push_str("Risk analysis unavailable.\n\n");
            return;
        }
    };

    md.push_str(&format!("- **Risk Rating:** {}\n", r.rating.as_str()));
    md.push_str(&format!(
        "- **Annualized Volatility:** {}\n",
        fmt::percent(r.annual_volatility)
    ));
    md.push_str(&format!("- **Beta:** {}\n", fmt::ratio(r.beta)));
    md.push_str(&format!(
        "- **Sharpe Ratio:** {} | **Sortino Ratio:** {}\n",
        fmt::ratio(r.sharpe_ratio),
        fmt::ratio(r.sortino_ratio),
    ));
    md.push_str(&format!(
        "- **Max Drawdown:** {}\n",
        fmt::percent(r.max_drawdown)
    ));
    md.push_str(&format!(
        "- **VaR 95% (1-day):** {} historical, {} parametric\n",
        fmt::percent(r.var_historical_95),
        fmt::percent(r.var_parametric_95),
    ));
    md.push('\n');
}

fn sentiment_section(md: &mut String, inputs: &ReportInputs) {
    md.push_str("## Sentiment\n\n");
    let s = match &inputs.sentiment {
        Some(s) if !s.no_data => s,
        _ => {
            md.push_str("No recent news coverage available.\n\n");
            return;
        }
    };

    md.push_str(&format!(
        "- **Overall Sentiment:** {} ({:.3})\n",
        s.label.as_str(),
        s.average_compound
    ));
    md.push_str(&format!(
        "- **Articles Analyzed:** {} ({} positive, {} negative, {} neutral)\n",
        s.analyzed_count, s.positive_count, s.negative_count, s.neutral_count,
    ));
    md.push('\n');
}

fn recommendation_section(md: &mut String, recommendation: &Recommendation) {
    md.push_str("## Recommendation\n\n");
    md.push_str(&format!(
        "**{}** (confidence: {}%)\n\n",
        recommendation.action.as_str(),
        recommendation.confidence
    ));
    md.push_str("---\n\n");
    md.push_str(
        "*This report is generated automatically from public market data and \
         does not constitute investment advice.*\n",
    );
}
