//! Logging utilities
//!
//! Helpers for summarizing requests in debug logs without dumping full
//! conversation content

use crate::models::chat::ChatMessage;

/// Set to true to include full message content in debug logs
/// Default is false to reduce log verbosity
pub const VERBOSE_REQUEST_LOGGING: bool = false;

/// Truncate a string with a note about original length
fn truncate_content(s: &str, max_len: usize) -> String {
    if s.len() > max_len {
        let cut = s
            .char_indices()
            .take_while(|(i, _)| *i < max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}... ({} chars truncated)", &s[..cut], s.len() - cut)
    } else {
        s.to_string()
    }
}

/// Create a filtered summary of a completion request for logging
///
/// Keeps the message structure but truncates verbose content. System
/// messages are truncated more aggressively than turns.
pub fn create_completion_log_summary(messages: &[ChatMessage], model_id: &str) -> serde_json::Value {
    if VERBOSE_REQUEST_LOGGING {
        serde_json::json!({
            "model": model_id,
            "messages": messages,
        })
    } else {
        let filtered: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| {
                let max_len = match msg.role {
                    crate::models::chat::Role::System => 100,
                    _ => 200,
                };
                serde_json::json!({
                    "role": msg.role.as_str(),
                    "content": truncate_content(&msg.content, max_len),
                })
            })
            .collect();

        serde_json::json!({
            "model": model_id,
            "message_count": messages.len(),
            "messages": filtered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_content() {
        assert_eq!(truncate_content("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_content() {
        let long = "a".repeat(300);
        let truncated = truncate_content(&long, 200);
        assert!(truncated.starts_with(&"a".repeat(200)));
        assert!(truncated.contains("100 chars truncated"));
    }

    #[test]
    fn test_summary_shape() {
        let messages = vec![
            ChatMessage::system("You are a helpful assistant."),
            ChatMessage::user("Hi"),
        ];
        let summary = create_completion_log_summary(&messages, "deepseek/deepseek-chat-v3-0324:free");

        assert_eq!(summary["model"], "deepseek/deepseek-chat-v3-0324:free");
        assert_eq!(summary["message_count"], 2);
        assert_eq!(summary["messages"][0]["role"], "system");
        assert_eq!(summary["messages"][1]["content"], "Hi");
    }
}
