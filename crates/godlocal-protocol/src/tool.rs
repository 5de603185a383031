//! Display labels for backend tool invocations.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Longest tool argument summary shown in a transcript entry.
pub const TOOL_QUERY_MAX: usize = 60;

static TOOL_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("web_search", "🌐 поиск в интернете"),
        ("fetch_url", "📄 читаю страницу"),
        ("get_market_data", "📊 данные рынка"),
        ("post_tweet", "𝕏 публикую твит"),
        ("send_telegram", "✈️ отправляю в Telegram"),
        ("create_github_issue", "⌥ создаю issue"),
        ("remember", "🧠 запоминаю"),
        ("recall", "🧠 вспоминаю"),
    ])
});

/// Human label for a tool invocation; unknown tools get a generic wrench.
pub fn tool_label(name: &str) -> String {
    TOOL_LABELS
        .get(name)
        .map_or_else(|| format!("🔧 {name}"), |label| (*label).to_string())
}

/// One-line transcript entry for a tool event: label plus a truncated
/// argument summary when the query is non-empty.
pub fn tool_summary(name: &str, query: &str) -> String {
    let label = tool_label(name);
    if query.is_empty() {
        return label;
    }
    let clipped: String = query.chars().take(TOOL_QUERY_MAX).collect();
    format!("{label}: {clipped}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tools_use_table_labels() {
        assert_eq!(tool_label("web_search"), "🌐 поиск в интернете");
        assert_eq!(tool_label("recall"), "🧠 вспоминаю");
    }

    #[test]
    fn unknown_tools_fall_back_to_generic_label() {
        assert_eq!(tool_label("quantum_sync"), "🔧 quantum_sync");
    }

    #[test]
    fn summary_appends_query_only_when_present() {
        assert_eq!(tool_summary("recall", ""), "🧠 вспоминаю");
        assert_eq!(
            tool_summary("web_search", "btc price"),
            "🌐 поиск в интернете: btc price"
        );
    }

    #[test]
    fn summary_truncates_long_queries() {
        let query = "x".repeat(TOOL_QUERY_MAX + 40);
        let summary = tool_summary("fetch_url", &query);
        assert!(summary.ends_with(&"x".repeat(TOOL_QUERY_MAX)));
        assert_eq!(
            summary.chars().count(),
            "📄 читаю страницу: ".chars().count() + TOOL_QUERY_MAX
        );
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        let query = "я".repeat(TOOL_QUERY_MAX * 2);
        let summary = tool_summary("remember", &query);
        let tail: String = summary
            .chars()
            .skip("🧠 запоминаю: ".chars().count())
            .collect();
        assert_eq!(tail.chars().count(), TOOL_QUERY_MAX);
    }
}
