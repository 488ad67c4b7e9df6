//! Classification gateway.
//!
//! Normalizes submitted content into the provider's call shape and makes
//! exactly one call per classification. Failures are logged and returned;
//! retrying is left to the task layer.

use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use crate::content::Content;
use crate::error::Result;
use crate::provider::{ModerationInput, ModerationProvider};

/// Adapter between submissions and a [`ModerationProvider`].
#[derive(Clone)]
pub struct ClassificationGateway {
    provider: Arc<dyn ModerationProvider>,
}

impl std::fmt::Debug for ClassificationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationGateway")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl ClassificationGateway {
    /// Creates a gateway over the given provider.
    pub fn new(provider: Arc<dyn ModerationProvider>) -> Self {
        Self { provider }
    }

    /// Returns the provider name.
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Builds the provider input for the content.
    ///
    /// Text stays a single string; item sequences become a batch of their
    /// payloads in submission order.
    pub fn normalize(content: &Content) -> ModerationInput {
        match content {
            Content::Text(text) => ModerationInput::Single(text.clone()),
            Content::Items(items) => {
                ModerationInput::Batch(items.iter().map(|i| i.payload().to_string()).collect())
            }
        }
    }

    /// Classifies the content with one provider call.
    pub async fn classify(&self, content: &Content) -> Result<Value> {
        let input = Self::normalize(content);

        self.provider.moderate(input).await.map_err(|e| {
            error!(provider = self.provider.name(), "Moderation API call failed: {}", e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentItem;
    use crate::error::ClassificationError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every input it receives.
    #[derive(Default)]
    struct RecordingProvider {
        calls: Mutex<Vec<ModerationInput>>,
        fail: bool,
    }

    #[async_trait]
    impl ModerationProvider for RecordingProvider {
        async fn moderate(&self, input: ModerationInput) -> Result<Value> {
            self.calls.lock().unwrap().push(input);
            if self.fail {
                return Err(ClassificationError::Api {
                    status: 429,
                    message: "rate limited".to_string(),
                });
            }
            Ok(json!({"results": [{"flagged": false}]}))
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    #[test]
    fn test_normalize_text() {
        let input = ClassificationGateway::normalize(&Content::text("hello"));
        assert_eq!(input, ModerationInput::Single("hello".to_string()));
    }

    #[test]
    fn test_normalize_items_in_order() {
        let content = Content::Items(vec![
            ContentItem::image_url("https://a/1.png"),
            ContentItem::text("caption"),
        ]);
        let input = ClassificationGateway::normalize(&content);
        assert_eq!(
            input,
            ModerationInput::Batch(vec!["https://a/1.png".into(), "caption".into()])
        );
    }

    #[tokio::test]
    async fn test_classify_single_call() {
        let provider = Arc::new(RecordingProvider::default());
        let gateway = ClassificationGateway::new(provider.clone());

        let result = gateway
            .classify(&Content::Items(vec![
                ContentItem::text("a"),
                ContentItem::text("b"),
            ]))
            .await
            .unwrap();

        assert_eq!(result["results"][0]["flagged"], false);
        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 2);
    }

    #[tokio::test]
    async fn test_classify_propagates_failure() {
        let provider = Arc::new(RecordingProvider {
            fail: true,
            ..Default::default()
        });
        let gateway = ClassificationGateway::new(provider.clone());

        let err = gateway.classify(&Content::text("x")).await.unwrap_err();
        assert!(matches!(err, ClassificationError::Api { status: 429, .. }));
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }
}
