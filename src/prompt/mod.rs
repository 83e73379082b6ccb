//! Server-side prompt generation for the analytics variant.
//!
//! The dashboard sends structured numbers instead of free text; the relay
//! renders them into a bounded, deterministic prompt so callers cannot
//! inflate upstream token usage.

pub mod analytics;
pub mod template;

pub use analytics::{AnalyticsData, FeedbackComment, FeedbackSummary, LowRatedTopSeller, ProductSales, SessionMetrics};
pub use template::{render_analytics_prompt, ANALYTICS_SYSTEM_PROMPT, MAX_COMMENTS, MAX_COMMENT_CHARS, MAX_PRODUCTS};
