//! Fixed-template prompt rendering.
//!
//! The output depends only on the payload: identical data renders to an
//! identical prompt. Lists are capped and comments truncated so the size of
//! the upstream request stays bounded.

use crate::prompt::analytics::{AnalyticsData, FeedbackSummary, SessionMetrics};

/// Products listed in the prompt, taken in input order.
pub const MAX_PRODUCTS: usize = 10;
/// Feedback comments included in the prompt.
pub const MAX_COMMENTS: usize = 20;
/// Characters kept from each comment.
pub const MAX_COMMENT_CHARS: usize = 200;

/// System prompt sent alongside analytics prompts.
pub const ANALYTICS_SYSTEM_PROMPT: &str = "You are a restaurant business analyst. \
Base every statement on the data provided and keep recommendations practical for a small restaurant team.";

/// Render the analytics prompt.
pub fn render_analytics_prompt(data: &AnalyticsData) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(
        "Analyze the following restaurant performance data and give the owner concise, actionable recommendations."
            .to_string(),
    );
    lines.push(String::new());

    if let Some(name) = non_blank(data.restaurant_name.as_deref()) {
        lines.push(format!("Restaurant: {}", name));
    }
    if let Some(period) = non_blank(data.period.as_deref()) {
        lines.push(format!("Period: {}", period));
    }

    lines.push(String::new());
    lines.push(format!("## Top products (up to {})", MAX_PRODUCTS));
    if data.product_sales.is_empty() {
        lines.push("No sales recorded.".to_string());
    }
    for (rank, product) in data.product_sales.iter().take(MAX_PRODUCTS).enumerate() {
        lines.push(format!(
            "{}. {}: {} sold, ${:.2} revenue",
            rank + 1,
            single_line(&product.name),
            product.quantity,
            product.revenue
        ));
    }

    lines.push(String::new());
    lines.push("## Session metrics".to_string());
    match &data.session_metrics {
        Some(metrics) => push_session_metrics(&mut lines, metrics),
        None => lines.push("No session data available.".to_string()),
    }

    lines.push(String::new());
    lines.push("## Customer feedback".to_string());
    match &data.feedback {
        Some(feedback) => push_feedback(&mut lines, feedback),
        None => lines.push("No feedback collected.".to_string()),
    }

    if let Some(callout) = &data.top_seller_low_rating {
        lines.push(String::new());
        lines.push("## Attention".to_string());
        lines.push(format!(
            "\"{}\" is a top seller ({} sold) but has a low average rating of {:.1}/5. \
             Suggest how to improve it without hurting sales.",
            single_line(&callout.name),
            callout.quantity,
            callout.average_rating
        ));
    }

    lines.push(String::new());
    lines.push("## Instructions".to_string());
    lines.push("Provide:".to_string());
    lines.push("1. Key insights about sales performance".to_string());
    lines.push("2. Recommendations to improve conversion and average order value".to_string());
    lines.push("3. Actions to address customer feedback".to_string());
    lines.push("Use short bullet points and keep the answer under 400 words.".to_string());

    lines.join("\n")
}

fn push_session_metrics(lines: &mut Vec<String>, metrics: &SessionMetrics) {
    lines.push(format!("- Total sessions: {}", metrics.total_sessions));
    lines.push(format!("- Total orders: {}", metrics.total_orders));
    lines.push(format!(
        "- Average session duration: {:.1} minutes",
        metrics.average_session_minutes
    ));
    lines.push(format!("- Conversion rate: {:.1}%", metrics.conversion_rate));
    lines.push(format!("- Average order value: ${:.2}", metrics.average_order_value));
}

fn push_feedback(lines: &mut Vec<String>, feedback: &FeedbackSummary) {
    let total = feedback.total();
    match average_rating(feedback) {
        Some(avg) => lines.push(format!("- Average rating: {:.1}/5 ({} responses)", avg, total)),
        None => lines.push(format!("- Responses: {}", total)),
    }

    for stars in (1..=5u8).rev() {
        let label = if stars == 1 { "star" } else { "stars" };
        lines.push(format!("- {} {}: {}", stars, label, feedback.count_for(stars)));
    }

    let comments: Vec<_> = feedback
        .comments
        .iter()
        .filter(|c| !c.comment.trim().is_empty())
        .take(MAX_COMMENTS)
        .collect();

    if comments.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("## Customer comments (up to {})", MAX_COMMENTS));
    for comment in comments {
        let text = truncate_chars(&single_line(comment.comment.trim()), MAX_COMMENT_CHARS);
        match comment.rating {
            Some(rating) => lines.push(format!("- ({:.1}/5) \"{}\"", rating, text)),
            None => lines.push(format!("- \"{}\"", text)),
        }
    }
}

/// Reported average, or the histogram's weighted mean.
fn average_rating(feedback: &FeedbackSummary) -> Option<f64> {
    if let Some(avg) = feedback.average_rating {
        return Some(avg);
    }
    // Summed in f64 so huge buckets cannot overflow.
    let counted: f64 = (1..=5).map(|s| feedback.count_for(s) as f64).sum();
    if counted == 0.0 {
        return None;
    }
    let weighted: f64 = (1..=5u8)
        .map(|s| f64::from(s) * feedback.count_for(s) as f64)
        .sum();
    Some(weighted / counted)
}

/// Keep at most `max` characters, never splitting a character.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
