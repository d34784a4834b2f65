use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One search result record as returned by the search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// The transient record that flows through a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    /// The user's topic.
    pub question: String,
    /// The snippet list rendered as text, set by the retriever.
    pub search_results: String,
    /// The generated breakdown, set by the narrator.
    pub final_story: String,
}

/// Everything a surface needs to display a finished request.
#[derive(Debug, Clone)]
pub struct Report {
    pub state: PipelineState,
    /// The records the retriever returned, in provider order.
    pub sources: Vec<Snippet>,
    pub completed_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Renders snippets as the numbered text block handed to the narrator.
pub fn render_snippets(snippets: &[Snippet]) -> String {
    if snippets.is_empty() {
        return String::from("No results found.");
    }

    snippets
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] {}\nURL: {}\n{}", i + 1, s.title, s.url, s.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_snippets() {
        let snippets = vec![
            Snippet {
                title: "Launch day".to_string(),
                url: "https://example.com/a".to_string(),
                content: "The phone ships Friday.".to_string(),
            },
            Snippet {
                title: "Reviews".to_string(),
                url: "https://example.com/b".to_string(),
                content: "Battery life is great.".to_string(),
            },
        ];

        assert_eq!(
            render_snippets(&snippets),
            "[1] Launch day\nURL: https://example.com/a\nThe phone ships Friday.\n\n\
             [2] Reviews\nURL: https://example.com/b\nBattery life is great."
        );
    }

    #[test]
    fn test_render_no_snippets() {
        assert_eq!(render_snippets(&[]), "No results found.");
    }

    #[test]
    fn test_snippet_missing_fields_default() {
        let snippet: Snippet =
            serde_json::from_str(r#"{"url": "https://example.com", "score": 0.9}"#).unwrap();

        assert_eq!(snippet.url, "https://example.com");
        assert!(snippet.title.is_empty());
        assert!(snippet.content.is_empty());
    }
}
