//! The single ask-the-human tool

use parley_channel::{ConfigSnapshot, FeedbackReply};
use parley_protocol::{CallToolParams, CallToolResult, Content, Tool};
use serde_json::json;

/// Argument carrying the question or progress report.
pub const DESCRIPTION_ARGUMENT: &str = "description";

/// Prompt shown when the agent sends no description.
pub const DEFAULT_PROMPT: &str = "The agent is waiting for your feedback.";

/// Tool descriptor named after the current config snapshot.
pub fn descriptor(config: &ConfigSnapshot) -> Tool {
    Tool {
        name: config.tool_name.clone(),
        description: config.tool_description.clone(),
        input_schema: json!({
            "type": "object",
            "properties": {
                DESCRIPTION_ARGUMENT: {
                    "type": "string",
                    "description": "Question for the human, or a summary of progress so far"
                }
            },
            "required": [DESCRIPTION_ARGUMENT]
        }),
    }
}

pub fn prompt_from(params: &CallToolParams) -> String {
    match params.str_argument(DESCRIPTION_ARGUMENT) {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => DEFAULT_PROMPT.to_string(),
    }
}

/// Text block first, then one image block per attached image.
pub fn reply_content(reply: &FeedbackReply) -> CallToolResult {
    let mut content = Vec::with_capacity(1 + reply.images.len());
    content.push(Content::text(reply.text.clone()));
    content.extend(reply.images.iter().map(|image| Content::Image {
        data: image.to_base64(),
        mime_type: image.mime_type.clone(),
    }));
    CallToolResult {
        content,
        is_error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_channel::{ImagePayload, WaitOutcome};

    #[test]
    fn descriptor_uses_configured_name() {
        let config = ConfigSnapshot {
            tool_name: "foo".into(),
            ..ConfigSnapshot::default()
        };
        let tool = descriptor(&config);
        assert_eq!(tool.name, "foo");
        assert_eq!(tool.input_schema["required"][0], DESCRIPTION_ARGUMENT);
    }

    #[test]
    fn blank_description_gets_default_prompt() {
        let params: CallToolParams = serde_json::from_value(json!({
            "name": "run_auto_tester",
            "arguments": { "description": "  " }
        }))
        .unwrap();
        assert_eq!(prompt_from(&params), DEFAULT_PROMPT);

        let params: CallToolParams =
            serde_json::from_value(json!({ "name": "run_auto_tester" })).unwrap();
        assert_eq!(prompt_from(&params), DEFAULT_PROMPT);
    }

    #[test]
    fn description_is_passed_through() {
        let params: CallToolParams = serde_json::from_value(json!({
            "name": "run_auto_tester",
            "arguments": { "description": "Tests pass. Merge?" }
        }))
        .unwrap();
        assert_eq!(prompt_from(&params), "Tests pass. Merge?");
    }

    #[test]
    fn reply_content_orders_text_before_images() {
        let reply = FeedbackReply {
            outcome: WaitOutcome::Fulfilled,
            text: "done".into(),
            images: vec![ImagePayload {
                bytes: b"GIF8".to_vec(),
                mime_type: "image/gif".into(),
            }],
            image_paths: vec![],
        };
        let result = reply_content(&reply);
        assert_eq!(result.content.len(), 2);
        assert_eq!(result.content[0], Content::text("done"));
        assert!(matches!(
            &result.content[1],
            Content::Image { mime_type, .. } if mime_type == "image/gif"
        ));
    }

    #[test]
    fn timeout_reply_is_a_single_text_block() {
        let result = reply_content(&FeedbackReply::timed_out());
        assert_eq!(
            result.content,
            vec![Content::text(parley_channel::TIMEOUT_SENTINEL)]
        );
    }
}
