use std::sync::Arc;

use crate::backends::LlmBackend;
use crate::conversations::{ConversationError, ConversationMessage};

const SUMMARY_PROMPT: &str = r#"Summarize the following JSON representation of a conversation between
a human and a chatbot. The summary MUST be under 1024 tokens in length.
This will be used as a reference for an infinitely long running
conversation. Please be sure to keep anything you think would be
important in the future of this conversation. Return your results as a
JSON. Use the following example as a reference for what schema to
return the JSON as:

{
    "summary": [
        {"role": "system", "content": "The conversation's messages before the final assistant response have been summarized."},
        {"role": "assistant", "content": "I asked the user how I may help them."},
        {"role": "user", "content": "write djikstra's algorithm in 5 different programming languages."},
        {"role": "assistant", "content": "I shared code snippets for Dijkstra's algorithm in the specified languages, noting that actual data structures might require additional code."},
        {"role": "user", "content": "Now write it in GDScript."}
    ]
}"#;

#[derive(serde::Deserialize)]
struct SummaryEnvelope {
    summary: Vec<ConversationMessage>,
}

/// Compresses older conversation turns into a short synthetic transcript
/// by asking the model itself, in structured-output mode.
#[derive(Clone)]
pub struct MessageSummarizer {
    backend: Arc<dyn LlmBackend>,
}

impl MessageSummarizer {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    /// One-shot summarization of `messages`. The reply must be a JSON
    /// object with a `summary` array of role/content turns; anything else
    /// is a MalformedSummary error, never a silent fallback.
    pub async fn summarize(
        &self,
        messages: &[ConversationMessage],
    ) -> Result<Vec<ConversationMessage>, ConversationError> {
        let transcript =
            serde_json::to_string(messages).map_err(crate::backends::BackendError::from)?;

        let reply = self
            .backend
            .one_shot(SUMMARY_PROMPT, &transcript, true)
            .await?;

        let envelope: SummaryEnvelope =
            serde_json::from_str(&reply).map_err(|e| ConversationError::MalformedSummary {
                detail: e.to_string(),
            })?;

        Ok(envelope.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackend;
    use crate::conversations::Role;

    fn fixture_messages() -> Vec<ConversationMessage> {
        vec![
            ConversationMessage::new(Role::User, "hi, how are you?"),
            ConversationMessage::new(Role::Assistant, "Doing well, how can I help?"),
        ]
    }

    #[tokio::test]
    async fn test_summarize_parses_well_formed_reply() {
        let backend = Arc::new(MockBackend::new().with_one_shot_reply(
            r#"{"summary": [{"role": "system", "content": "The user greeted the assistant."}]}"#,
        ));
        let summarizer = MessageSummarizer::new(backend);

        let summary = summarizer.summarize(&fixture_messages()).await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].role, Role::System);
        assert_eq!(summary[0].content, "The user greeted the assistant.");
    }

    #[tokio::test]
    async fn test_summarize_rejects_missing_summary_field() {
        let backend =
            Arc::new(MockBackend::new().with_one_shot_reply(r#"{"recap": "not the schema"}"#));
        let summarizer = MessageSummarizer::new(backend);

        let err = summarizer.summarize(&fixture_messages()).await.unwrap_err();
        assert!(matches!(err, ConversationError::MalformedSummary { .. }));
    }

    #[tokio::test]
    async fn test_summarize_rejects_non_json_reply() {
        let backend = Arc::new(MockBackend::new().with_one_shot_reply("Sure! Here's a summary:"));
        let summarizer = MessageSummarizer::new(backend);

        let err = summarizer.summarize(&fixture_messages()).await.unwrap_err();
        assert!(matches!(err, ConversationError::MalformedSummary { .. }));
    }

    #[tokio::test]
    async fn test_summarize_rejects_unknown_role_in_summary() {
        let backend = Arc::new(MockBackend::new().with_one_shot_reply(
            r#"{"summary": [{"role": "moderator", "content": "irrelevant"}]}"#,
        ));
        let summarizer = MessageSummarizer::new(backend);

        let err = summarizer.summarize(&fixture_messages()).await.unwrap_err();
        assert!(matches!(err, ConversationError::MalformedSummary { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_as_backend_error() {
        let backend = Arc::new(MockBackend::new().failing("connection refused"));
        let summarizer = MessageSummarizer::new(backend);

        let err = summarizer.summarize(&fixture_messages()).await.unwrap_err();
        assert!(matches!(err, ConversationError::Backend(_)));
    }
}
