//! In-memory transcript used to restore the panel

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    Agent,
    Human,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub text: String,
    pub author: Author,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_agent(&mut self, text: impl Into<String>) {
        self.entries.push(ConversationEntry {
            text: text.into(),
            author: Author::Agent,
            images: None,
        });
    }

    pub fn push_human(&mut self, text: impl Into<String>, images: Vec<String>) {
        self.entries.push(ConversationEntry {
            text: text.into(),
            author: Author::Human,
            images: (!images.is_empty()).then_some(images),
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_in_order_and_clears() {
        let mut log = ConversationLog::new();
        log.push_agent("question?");
        log.push_human("answer", vec![]);
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].author, Author::Agent);
        assert_eq!(log.entries()[1].text, "answer");

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn images_only_serialized_when_present() {
        let mut log = ConversationLog::new();
        log.push_human("plain", vec![]);
        log.push_human("with image", vec!["AAAA".into()]);

        let value = serde_json::to_value(log.entries()).unwrap();
        assert_eq!(value[0], json!({ "text": "plain", "author": "human" }));
        assert_eq!(value[1]["images"], json!(["AAAA"]));
    }
}
