//! Prompt templates and builders for chat replies and session summaries.

use crate::models::ConversationTurn;
use crate::services::providers::{ChatMessage, PromptRequest};

/// Placeholder in [`SYSTEM_PROMPT_TEMPLATE`] replaced by the FAQ knowledge block.
pub const FAQ_KNOWLEDGE_PLACEHOLDER: &str = "{faq_knowledge}";

pub const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a helpful customer support assistant. Your goal is to provide accurate, friendly, and efficient support to customers.

Guidelines:
1. Always be polite and professional
2. Try to resolve customer issues using the provided FAQ knowledge
3. If you cannot answer a question confidently, suggest escalation to a human agent
4. Keep responses concise but complete
5. Ask clarifying questions when needed
6. Show empathy for customer concerns

{faq_knowledge}

If you encounter any of these situations, indicate that the conversation should be escalated:
- Customer is angry or frustrated beyond what you can handle
- Technical issues that require specialized knowledge
- Billing disputes or refund requests
- Account security concerns
- Complex troubleshooting that hasn't been resolved after 3 attempts
- Customer specifically requests to speak with a human

Always end your response with [ESCALATE] if escalation is needed, otherwise end with [CONTINUE]."#;

pub const SUMMARY_PROMPT: &str = r#"Summarize this customer support conversation. Include:
1. Main customer issue or question
2. Key points discussed
3. Resolution status
4. Any unresolved concerns

Keep the summary concise but comprehensive."#;

/// Substitute the FAQ knowledge block into a system prompt template.
pub fn render_system_prompt(template: &str, faq_knowledge: &str) -> String {
    template
        .replace(FAQ_KNOWLEDGE_PLACEHOLDER, faq_knowledge)
        .trim()
        .to_string()
}

/// Build the reply prompt: system prompt, the last `history_limit` turns as
/// alternating user/assistant messages, then the new user message.
///
/// `history` must be chronological; only its tail is used.
pub fn build_chat_prompt(
    template: &str,
    faq_knowledge: &str,
    history: &[ConversationTurn],
    history_limit: usize,
    user_message: &str,
) -> PromptRequest {
    let start = history.len().saturating_sub(history_limit);
    let mut messages = Vec::with_capacity((history.len() - start) * 2 + 1);

    for turn in &history[start..] {
        messages.push(ChatMessage::user(&turn.user_message));
        messages.push(ChatMessage::assistant(&turn.bot_response));
    }
    messages.push(ChatMessage::user(user_message));

    PromptRequest {
        system: Some(render_system_prompt(template, faq_knowledge)),
        messages,
    }
}

/// Build the summarisation prompt over the full transcript.
pub fn build_summary_prompt(history: &[ConversationTurn]) -> PromptRequest {
    let transcript = history
        .iter()
        .map(|turn| format!("User: {}\nBot: {}", turn.user_message, turn.bot_response))
        .collect::<Vec<_>>()
        .join("\n");

    PromptRequest {
        system: Some(SUMMARY_PROMPT.to_string()),
        messages: vec![ChatMessage::user(format!(
            "Conversation to summarize:\n{}",
            transcript
        ))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::Role;
    use chrono::Utc;
    use uuid::Uuid;

    fn turns(n: usize) -> Vec<ConversationTurn> {
        let session_id = Uuid::new_v4();
        (0..n)
            .map(|i| ConversationTurn {
                turn_id: i as i64 + 1,
                session_id,
                user_message: format!("question {}", i),
                bot_response: format!("answer {}", i),
                matched_faq_id: None,
                escalated: false,
                created_utc: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn faq_knowledge_is_substituted() {
        let prompt = render_system_prompt(SYSTEM_PROMPT_TEMPLATE, "Q: a\nA: b");
        assert!(prompt.contains("Q: a\nA: b"));
        assert!(!prompt.contains(FAQ_KNOWLEDGE_PLACEHOLDER));
        assert!(prompt.ends_with("otherwise end with [CONTINUE]."));
    }

    #[test]
    fn history_is_truncated_to_most_recent_turns_in_order() {
        let history = turns(30);
        let prompt = build_chat_prompt(SYSTEM_PROMPT_TEMPLATE, "", &history, 20, "new question");

        assert_eq!(prompt.messages.len(), 20 * 2 + 1);
        assert_eq!(prompt.messages[0].content, "question 10");
        assert_eq!(prompt.messages[1].content, "answer 10");
        assert_eq!(prompt.messages[38].content, "question 29");
        assert_eq!(prompt.messages[39].content, "answer 29");

        let last = prompt.messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, "new question");
    }

    #[test]
    fn roles_alternate() {
        let prompt = build_chat_prompt(SYSTEM_PROMPT_TEMPLATE, "", &turns(3), 20, "next");
        for (i, message) in prompt.messages.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(message.role, expected);
        }
    }

    #[test]
    fn short_history_is_kept_whole() {
        let prompt = build_chat_prompt(SYSTEM_PROMPT_TEMPLATE, "", &turns(2), 20, "next");
        assert_eq!(prompt.messages.len(), 5);
        assert_eq!(prompt.messages[0].content, "question 0");
    }

    #[test]
    fn summary_prompt_contains_transcript() {
        let prompt = build_summary_prompt(&turns(3));
        assert_eq!(prompt.system.as_deref(), Some(SUMMARY_PROMPT));
        assert_eq!(prompt.messages.len(), 1);
        let body = &prompt.messages[0].content;
        assert!(body.contains("User: question 0\nBot: answer 0"));
        assert!(body.contains("User: question 2\nBot: answer 2"));
    }
}
