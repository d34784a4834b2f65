use std::time::Instant;

use crate::config::{AppConfig, Credentials};
use crate::llm::{GeminiNarrator, Narrator};
use crate::search::{Retriever, TavilyRetriever};
use crate::types::render_snippets;
use crate::{PipelineError, PipelineState, Report, Result};
use reqwest::Client;
use tracing::{info, instrument};

/// The `Pipeline` struct runs the retriever and then the narrator for one topic.
pub struct Pipeline<R, N> {
    retriever: R,
    narrator: N,
}

impl Pipeline<TavilyRetriever, GeminiNarrator> {
    /// Builds the production pipeline: Tavily search followed by Gemini,
    /// both sharing one HTTP client.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .gzip(true)
            .build()?;

        Ok(Self::new(
            TavilyRetriever::new(client.clone(), config.search.clone()),
            GeminiNarrator::new(client, config.llm.clone()),
        ))
    }
}

impl<R: Retriever, N: Narrator> Pipeline<R, N> {
    pub fn new(retriever: R, narrator: N) -> Self {
        Self {
            retriever,
            narrator,
        }
    }

    /// Searches for `question`, then narrates the results.
    ///
    /// Nothing is returned from a failed run: if the narrator fails, the
    /// search results are dropped along with it.
    #[instrument(skip(self, credentials))]
    pub async fn run(&self, credentials: &Credentials, question: &str) -> Result<Report> {
        if question.trim().is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }
        let tavily_key = credentials.tavily()?;
        let google_key = credentials.google()?;

        let start_time = Instant::now();

        let sources = self.retriever.search(tavily_key, question).await?;
        let search_results = render_snippets(&sources);
        info!(sources = sources.len(), "Search results ready");

        let final_story = self
            .narrator
            .narrate(google_key, question, &search_results)
            .await?;

        let elapsed = start_time.elapsed();
        info!(elapsed = ?elapsed, "Breakdown ready");

        Ok(Report {
            state: PipelineState {
                question: question.to_string(),
                search_results,
                final_story,
            },
            sources,
            completed_at: chrono::Utc::now(),
            elapsed,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::ApiKey;
    use crate::Snippet;
    use std::sync::{Arc, Mutex};

    /// Records every call so tests can check ordering and arguments.
    pub(crate) type CallLog = Arc<Mutex<Vec<String>>>;

    pub(crate) struct FakeRetriever {
        pub(crate) calls: CallLog,
        pub(crate) snippets: Vec<Snippet>,
        pub(crate) fail: bool,
    }

    impl Retriever for FakeRetriever {
        async fn search(&self, _api_key: &ApiKey, query: &str) -> Result<Vec<Snippet>> {
            self.calls.lock().unwrap().push(format!("search:{query}"));
            if self.fail {
                return Err(PipelineError::SearchError("HTTP 432: plan limit".to_string()));
            }
            Ok(self.snippets.clone())
        }
    }

    pub(crate) struct FakeNarrator {
        pub(crate) calls: CallLog,
        pub(crate) fail: bool,
    }

    impl Narrator for FakeNarrator {
        async fn narrate(&self, _api_key: &ApiKey, question: &str, search_results: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("narrate:{question}|{search_results}"));
            if self.fail {
                return Err(PipelineError::LLMError("API error (500): boom".to_string()));
            }
            Ok(format!("🔥 HEADLINE about {question}"))
        }
    }

    pub(crate) fn snippets(n: usize) -> Vec<Snippet> {
        (1..=n)
            .map(|i| Snippet {
                title: format!("Title {i}"),
                url: format!("https://news{i}.example/story"),
                content: format!("Content number {i}"),
            })
            .collect()
    }

    pub(crate) fn fake_pipeline(
        calls: &CallLog,
        snippets: Vec<Snippet>,
        retriever_fails: bool,
        narrator_fails: bool,
    ) -> Pipeline<FakeRetriever, FakeNarrator> {
        Pipeline::new(
            FakeRetriever {
                calls: calls.clone(),
                snippets,
                fail: retriever_fails,
            },
            FakeNarrator {
                calls: calls.clone(),
                fail: narrator_fails,
            },
        )
    }

    fn credentials() -> Credentials {
        Credentials::new("g-key", "tvly-key")
    }

    #[tokio::test]
    async fn test_retriever_runs_before_narrator() {
        let calls = CallLog::default();
        let pipeline = fake_pipeline(&calls, snippets(3), false, false);

        let report = pipeline.run(&credentials(), "new phone launch").await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], "search:new phone launch");
        assert_eq!(
            calls[1],
            format!("narrate:new phone launch|{}", report.state.search_results)
        );
        assert_eq!(report.state.question, "new phone launch");
        assert_eq!(report.state.final_story, "🔥 HEADLINE about new phone launch");
        assert_eq!(report.sources, snippets(3));
    }

    #[tokio::test]
    async fn test_question_is_passed_verbatim() {
        let calls = CallLog::default();
        let pipeline = fake_pipeline(&calls, snippets(1), false, false);

        let report = pipeline.run(&credentials(), "  new phone  ").await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], "search:  new phone  ");
        assert!(calls[1].starts_with("narrate:  new phone  |"));
        assert_eq!(report.state.question, "  new phone  ");
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_both_steps() {
        let calls = CallLog::default();
        let pipeline = fake_pipeline(&calls, snippets(3), false, false);

        let result = pipeline
            .run(&Credentials::new("g-key", ""), "new phone launch")
            .await;

        assert!(matches!(result, Err(PipelineError::MissingCredentials)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let calls = CallLog::default();
        let pipeline = fake_pipeline(&calls, snippets(3), false, false);

        let result = pipeline.run(&credentials(), "   ").await;

        assert!(matches!(result, Err(PipelineError::EmptyQuestion)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retriever_failure_stops_pipeline() {
        let calls = CallLog::default();
        let pipeline = fake_pipeline(&calls, snippets(3), true, false);

        let result = pipeline.run(&credentials(), "topic").await;

        assert!(matches!(result, Err(PipelineError::SearchError(_))));
        assert_eq!(*calls.lock().unwrap(), vec!["search:topic".to_string()]);
    }

    #[tokio::test]
    async fn test_narrator_failure_discards_results() {
        let calls = CallLog::default();
        let pipeline = fake_pipeline(&calls, snippets(2), false, true);

        let result = pipeline.run(&credentials(), "topic").await;

        assert!(matches!(result, Err(PipelineError::LLMError(_))));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }
}
