//! Analytics payload sent by the dashboard.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Structured analytics the relay turns into a prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsData {
    pub restaurant_name: Option<String>,
    /// Free-form reporting period label, e.g. "Last 30 days".
    pub period: Option<String>,
    /// Product sales, best seller first.
    pub product_sales: Vec<ProductSales>,
    pub session_metrics: Option<SessionMetrics>,
    pub feedback: Option<FeedbackSummary>,
    pub top_seller_low_rating: Option<LowRatedTopSeller>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub name: String,
    #[serde(default)]
    pub quantity: u64,
    #[serde(default)]
    pub revenue: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionMetrics {
    pub total_sessions: u64,
    pub total_orders: u64,
    pub average_session_minutes: f64,
    /// Percentage, 0–100.
    pub conversion_rate: f64,
    pub average_order_value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedbackSummary {
    /// Star rating ("1".."5") → number of responses.
    pub rating_distribution: HashMap<String, u64>,
    pub average_rating: Option<f64>,
    pub total_responses: Option<u64>,
    pub comments: Vec<FeedbackComment>,
}

impl FeedbackSummary {
    /// Responses with the given star rating.
    pub fn count_for(&self, stars: u8) -> u64 {
        self.rating_distribution
            .get(&stars.to_string())
            .copied()
            .unwrap_or(0)
    }

    /// Reported total, or the histogram sum when none was sent. Saturates.
    pub fn total(&self) -> u64 {
        self.total_responses.unwrap_or_else(|| self.counted())
    }

    /// Sum of the 1..5 star buckets, saturating at `u64::MAX`.
    pub fn counted(&self) -> u64 {
        (1..=5).fold(0u64, |acc, s| acc.saturating_add(self.count_for(s)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackComment {
    /// Stars given with the comment; half stars are allowed.
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(alias = "text")]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LowRatedTopSeller {
    pub name: String,
    #[serde(default)]
    pub quantity: u64,
    pub average_rating: f64,
}
