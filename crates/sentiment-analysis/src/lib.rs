//! Word-list news sentiment.
//!
//! Each article gets a raw score from lexicon hits (title counted double,
//! negation within a three-word window flips polarity), normalized to a
//! compound value in [-1, 1]. Article compounds are averaged into a summary
//! with per-bucket counts.

use analysis_core::NewsArticle;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const POSITIVE_WORDS: &[&str] = &[
    "bullish", "rally", "surge", "gain", "profit", "growth", "beat",
    "upgrade", "outperform", "strong", "positive", "rise", "increase",
    "breakthrough", "innovation", "success", "exceed", "momentum",
    "buy", "recommend", "optimistic", "record", "high", "advance",
    "dividend", "buyback", "repurchase", "accretive", "upside",
    "recovery", "rebound", "expansion", "robust", "accelerating",
    "overweight", "raised", "upgraded", "outpacing", "tailwind",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bearish", "decline", "loss", "fall", "plunge", "crash", "miss",
    "downgrade", "underperform", "weak", "negative", "drop", "decrease",
    "concern", "risk", "fail", "disappoint", "slump", "sell",
    "warning", "pessimistic", "low", "retreat", "fear", "trouble",
    "dilution", "dilutive", "headwind", "lawsuit", "litigation",
    "recall", "investigation", "probe", "default", "bankruptcy",
    "restructuring", "layoff", "downside", "overvalued", "bubble",
    "underweight", "lowered", "suspended",
];

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without",
];

const NEGATION_WINDOW: usize = 3;

/// Compound threshold separating neutral articles from polar ones.
const NEUTRAL_BAND: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    fn from_compound(compound: f64) -> Self {
        if compound > NEUTRAL_BAND {
            SentimentLabel::Positive
        } else if compound < -NEUTRAL_BAND {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentSummary {
    /// Mean compound score across analyzed articles, in [-1, 1].
    pub average_compound: f64,
    pub label: SentimentLabel,
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub analyzed_count: usize,
    /// True when no articles were available; the summary is then a neutral
    /// sentinel rather than a measurement.
    pub no_data: bool,
}

impl Default for SentimentSummary {
    fn default() -> Self {
        SentimentSummary {
            average_compound: 0.0,
            label: SentimentLabel::Neutral,
            positive_count: 0,
            negative_count: 0,
            neutral_count: 0,
            analyzed_count: 0,
            no_data: true,
        }
    }
}

pub struct SentimentAnalysisEngine {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    negation: HashSet<&'static str>,
}

impl SentimentAnalysisEngine {
    pub fn new() -> Self {
        SentimentAnalysisEngine {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            negation: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    pub fn analyze(&self, news: &[NewsArticle]) -> SentimentSummary {
        if news.is_empty() {
            tracing::debug!("No news articles to analyze");
            return SentimentSummary::default();
        }

        let mut positive_count = 0;
        let mut negative_count = 0;
        let mut neutral_count = 0;
        let mut compound_sum = 0.0;

        for article in news {
            let compound = self.article_compound(article);
            compound_sum += compound;
            match SentimentLabel::from_compound(compound) {
                SentimentLabel::Positive => positive_count += 1,
                SentimentLabel::Negative => negative_count += 1,
                SentimentLabel::Neutral => neutral_count += 1,
            }
        }

        let average = compound_sum / news.len() as f64;
        SentimentSummary {
            average_compound: average,
            label: SentimentLabel::from_compound(average),
            positive_count,
            negative_count,
            neutral_count,
            analyzed_count: news.len(),
            no_data: false,
        }
    }

    /// Raw score for one article: title hits weighted double, description
    /// hits at full weight, then normalized to [-1, 1].
    pub fn article_compound(&self, article: &NewsArticle) -> f64 {
        let mut score = self.score_text(&article.title) * 2.0;
        if let Some(desc) = &article.description {
            score += self.score_text(desc);
        }
        normalize(score)
    }

    fn score_text(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | '!' | '?' | ':'))
            .filter(|w| !w.is_empty())
            .collect();

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| self.negation.contains(*w))
            .map(|(i, _)| i)
            .collect();

        let mut score = 0.0;
        for (i, word) in words.iter().enumerate() {
            let polarity = if self.positive.contains(word) {
                1.0
            } else if self.negative.contains(word) {
                -1.0
            } else {
                continue;
            };

            let negated = negation_positions
                .iter()
                .any(|&pos| pos < i && i - pos <= NEGATION_WINDOW);

            score += if negated { -polarity } else { polarity };
        }
        score
    }
}

impl Default for SentimentAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an unbounded word-hit score into [-1, 1]: s / sqrt(s^2 + 15).
fn normalize(score: f64) -> f64 {
    score / (score * score + 15.0).sqrt()
}
