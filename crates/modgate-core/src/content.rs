//! Submitted content.
//!
//! A submission is either a plain string or an ordered list of typed items.
//! Items are a closed set: an unknown `type` tag fails deserialization
//! instead of being silently skipped.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::ContentError;
use crate::keying::SubmissionKey;

/// Schemes accepted for image references.
pub const IMAGE_REFERENCE_PREFIXES: [&str; 3] = ["http://", "https://", "data:image/"];

/// One typed piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    /// Plain text.
    Text { text: String },
    /// A URL or `data:image/` URI pointing at an image.
    ImageUrl { image_url: String },
}

impl ContentItem {
    /// Creates a text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates an image item.
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: url.into(),
        }
    }

    /// Returns the string handed to the classifier for this item.
    pub fn payload(&self) -> &str {
        match self {
            ContentItem::Text { text } => text,
            ContentItem::ImageUrl { image_url } => image_url,
        }
    }
}

/// The content of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Content {
    /// A single string.
    Text(String),
    /// An ordered sequence of typed items.
    Items(Vec<ContentItem>),
}

impl Content {
    /// Creates text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates content from an image submission.
    ///
    /// The text item, when present, precedes the image item. The image
    /// reference is validated before anything is built.
    pub fn from_parts(
        text: Option<String>,
        image_url: Option<String>,
    ) -> Result<Self, ContentError> {
        let text = text.filter(|t| !t.is_empty());
        let image_url = image_url.filter(|u| !u.is_empty());

        if text.is_none() && image_url.is_none() {
            return Err(ContentError::Empty);
        }

        let mut items = Vec::with_capacity(2);
        if let Some(text) = text {
            items.push(ContentItem::text(text));
        }
        if let Some(url) = image_url {
            validate_image_reference(&url)?;
            items.push(ContentItem::image_url(url));
        }

        Ok(Self::Items(items))
    }

    /// Flattens the content into classifier payloads, preserving order.
    pub fn payloads(&self) -> Vec<&str> {
        match self {
            Content::Text(text) => vec![text.as_str()],
            Content::Items(items) => items.iter().map(ContentItem::payload).collect(),
        }
    }

    /// Returns the key this submission is cached and persisted under.
    ///
    /// Plain text and a lone item key by their raw payload. Longer item
    /// sequences key by the JSON array of their payloads, in a namespace of
    /// their own.
    pub fn key(&self) -> SubmissionKey<'_> {
        match self {
            Content::Text(text) => SubmissionKey::Text(Cow::Borrowed(text)),
            Content::Items(items) if items.len() == 1 => {
                SubmissionKey::Text(Cow::Borrowed(items[0].payload()))
            }
            Content::Items(_) => {
                SubmissionKey::Batch(serde_json::Value::from(self.payloads()).to_string())
            }
        }
    }

    /// Returns true if there is nothing to classify.
    pub fn is_empty(&self) -> bool {
        match self {
            Content::Text(text) => text.is_empty(),
            Content::Items(items) => items.is_empty(),
        }
    }
}

/// Checks that an image reference uses a supported scheme.
pub fn validate_image_reference(reference: &str) -> Result<(), ContentError> {
    if IMAGE_REFERENCE_PREFIXES
        .iter()
        .any(|prefix| reference.starts_with(prefix))
    {
        Ok(())
    } else {
        Err(ContentError::InvalidImageReference(reference.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_tagging() {
        let item: ContentItem =
            serde_json::from_value(json!({"type": "image_url", "image_url": "https://x/y.png"}))
                .unwrap();
        assert_eq!(item, ContentItem::image_url("https://x/y.png"));

        let value = serde_json::to_value(ContentItem::text("hi")).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "hi"}));
    }

    #[test]
    fn test_unknown_item_type_rejected() {
        let result: std::result::Result<ContentItem, _> =
            serde_json::from_value(json!({"type": "video", "url": "https://x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_payloads_preserve_order() {
        let content = Content::Items(vec![
            ContentItem::text("first"),
            ContentItem::image_url("https://example.com/a.jpg"),
            ContentItem::text("third"),
        ]);

        assert_eq!(
            content.payloads(),
            vec!["first", "https://example.com/a.jpg", "third"]
        );
    }

    #[test]
    fn test_key() {
        assert_eq!(Content::text("hello").key().as_str(), "hello");

        let image_only = Content::Items(vec![ContentItem::image_url("https://x/a.png")]);
        assert_eq!(image_only.key(), Content::text("https://x/a.png").key());

        let mixed = Content::Items(vec![
            ContentItem::text("caption"),
            ContentItem::image_url("https://x/a.png"),
        ]);
        assert!(mixed.key().is_batch());
        assert_eq!(mixed.key().as_str(), r#"["caption","https://x/a.png"]"#);
    }

    #[test]
    fn test_batch_key_differs_from_joined_text() {
        let mixed = Content::Items(vec![
            ContentItem::text("caption"),
            ContentItem::image_url("https://x/a.png"),
        ]);
        let joined = Content::text("caption\nhttps://x/a.png");
        let as_json = Content::text(r#"["caption","https://x/a.png"]"#);

        assert_ne!(mixed.key().cache_key(), joined.key().cache_key());
        assert_ne!(mixed.key().cache_key(), as_json.key().cache_key());
        assert_ne!(mixed.key(), as_json.key());
    }

    #[test]
    fn test_from_parts() {
        let content = Content::from_parts(
            Some("caption".to_string()),
            Some("data:image/png;base64,AAAA".to_string()),
        )
        .unwrap();
        assert_eq!(content.payloads(), vec!["caption", "data:image/png;base64,AAAA"]);

        let text_only = Content::from_parts(Some("just text".to_string()), None).unwrap();
        assert_eq!(text_only.payloads(), vec!["just text"]);
    }

    #[test]
    fn test_from_parts_requires_something() {
        assert_eq!(Content::from_parts(None, None), Err(ContentError::Empty));
        assert_eq!(
            Content::from_parts(Some(String::new()), Some(String::new())),
            Err(ContentError::Empty)
        );
    }

    #[test]
    fn test_from_parts_rejects_bad_scheme() {
        let err = Content::from_parts(None, Some("ftp://bad".to_string())).unwrap_err();
        assert!(matches!(err, ContentError::InvalidImageReference(_)));
    }

    #[test]
    fn test_validate_image_reference() {
        assert!(validate_image_reference("http://a/b.png").is_ok());
        assert!(validate_image_reference("https://a/b.png").is_ok());
        assert!(validate_image_reference("data:image/jpeg;base64,xx").is_ok());
        assert!(validate_image_reference("data:text/plain,xx").is_err());
        assert!(validate_image_reference("HTTPS://a/b.png").is_err());
    }

    #[test]
    fn test_content_serde() {
        let content = Content::Items(vec![ContentItem::text("a")]);
        let json = serde_json::to_string(&content).unwrap();
        let back: Content = serde_json::from_str(&json).unwrap();
        assert_eq!(back, content);

        let text: Content = serde_json::from_value(json!({"text": "plain"})).unwrap();
        assert_eq!(text, Content::text("plain"));
    }
}
