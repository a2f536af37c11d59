//! Deterministic recommendation from valuation upside, risk rating and news
//! sentiment. Same inputs always produce the same action and confidence.

use risk_analysis::RiskRating;
use sentiment_analysis::SentimentLabel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationAction {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl RecommendationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationAction::StrongBuy => "Strong Buy",
            RecommendationAction::Buy => "Buy",
            RecommendationAction::Hold => "Hold",
            RecommendationAction::Sell => "Sell",
            RecommendationAction::StrongSell => "Strong Sell",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: RecommendationAction,
    /// Confidence in [10, 95].
    pub confidence: u8,
}

/// Upside thresholds and confidence adjustments are fixed so repeated runs
/// over the same snapshot agree.
pub fn recommend(
    upside: Option<f64>,
    risk: RiskRating,
    sentiment: &SentimentLabel,
    sentiment_has_data: bool,
) -> Recommendation {
    let mut confidence: i32 = 50;

    let action = match upside {
        Some(u) if u > 0.20 => {
            confidence += 20;
            RecommendationAction::StrongBuy
        }
        Some(u) if u > 0.05 => {
            confidence += 10;
            RecommendationAction::Buy
        }
        Some(u) if u < -0.20 => {
            confidence += 15;
            RecommendationAction::StrongSell
        }
        Some(u) if u < -0.05 => {
            confidence += 5;
            RecommendationAction::Sell
        }
        // In-band upside or no valuation at all
        _ => RecommendationAction::Hold,
    };

    match risk {
        RiskRating::High | RiskRating::VeryHigh => confidence -= 10,
        RiskRating::Low => confidence += 5,
        RiskRating::Moderate | RiskRating::Unknown => {}
    }

    if sentiment_has_data {
        match sentiment {
            SentimentLabel::Positive => confidence += 5,
            SentimentLabel::Negative => confidence -= 5,
            SentimentLabel::Neutral => {}
        }
    }

    Recommendation {
        action,
        confidence: confidence.clamp(10, 95) as u8,
    }
}
