/// The `PromptBuilder` struct is responsible for constructing the narrator prompt.
/// It embeds the search results and the topic, verbatim, into a fixed template.
pub struct PromptBuilder {
    /// The topic the user asked about.
    question: String,
    /// The retriever's rendered output.
    search_results: String,
}

impl PromptBuilder {
    /// Creates a new `PromptBuilder` with the given question.
    ///
    /// # Arguments
    ///
    /// * `question` - The topic to be explained.
    ///
    /// # Returns
    ///
    /// A new instance of `PromptBuilder`.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            search_results: String::new(),
        }
    }

    /// Adds the retriever's output to the `PromptBuilder`.
    ///
    /// # Arguments
    ///
    /// * `search_results` - The rendered search snippets.
    ///
    /// # Returns
    ///
    /// The updated `PromptBuilder` instance.
    pub fn with_search_results(mut self, search_results: impl Into<String>) -> Self {
        self.search_results = search_results.into();
        self
    }

    /// Builds the prompt string.
    pub fn build(&self) -> String {
        format!(
            "You are an expert, highly charismatic 'Trend Spotter'. Your style is close to a \
successful social media creator (TikTok/Twitter energy, but written down).

Your mission: explain what is going on in a super direct way, with current language, \
common slang (hype, red flag, plot twist, vibe, mood) where it fits, and lots of emojis.

NEWS CONTEXT:
{search_results}

TOPIC YOU HAVE TO BREAK DOWN FOR ME:
{question}

INSTRUCTION: Don't tell me a fairy tale. Give me a quick 'breakdown'.
- Start with a headline with a lot of hook.
- Spill 'the tea' (the important info) clearly but with style.
- Tell me why this matters or why there is so much 'hype'.
- Be fun and a bit irreverent.
",
            search_results = self.search_results,
            question = self.question,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests the `PromptBuilder` functionality.
    #[test]
    fn test_prompt_builder() {
        let results = "[1] Launch day\nURL: https://example.com\n  Test   content  ";

        let prompt = PromptBuilder::new("new phone launch")
            .with_search_results(results)
            .build();

        assert!(prompt.contains("new phone launch"));
        assert!(prompt.contains(results));
    }

    #[test]
    fn test_context_comes_before_topic() {
        let prompt = PromptBuilder::new("QUESTION-MARKER")
            .with_search_results("RESULTS-MARKER")
            .build();

        let results_at = prompt.find("RESULTS-MARKER").unwrap();
        let question_at = prompt.find("QUESTION-MARKER").unwrap();
        assert!(results_at < question_at);
        assert!(prompt.contains("headline"));
    }

    #[test]
    fn test_braces_are_kept_literally() {
        let results = r#"[{"url": "https://example.com", "content": "{x}"}]"#;

        let prompt = PromptBuilder::new("{topic}")
            .with_search_results(results)
            .build();

        assert!(prompt.contains(results));
        assert!(prompt.contains("{topic}"));
    }
}
