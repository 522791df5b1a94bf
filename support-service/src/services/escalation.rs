//! Rule-based escalation classifier.
//!
//! A conversation is handed to a human when the model tags its reply with
//! [`ESCALATE_TAG`] or the customer's message contains one of a fixed set of
//! keywords. Both checks are plain case-insensitive substring tests.

/// Tag the model appends when it wants a human to take over.
pub const ESCALATE_TAG: &str = "[ESCALATE]";

/// Tag the model appends when it can keep handling the conversation.
pub const CONTINUE_TAG: &str = "[CONTINUE]";

/// Keywords in the customer's message that force an escalation.
pub const DEFAULT_ESCALATION_KEYWORDS: &[&str] = &[
    // anger
    "angry",
    "frustrated",
    "terrible",
    "awful",
    "horrible",
    // explicit human requests
    "manager",
    "supervisor",
    "human",
    "agent",
    "representative",
    // billing
    "refund",
    "cancel",
    "billing",
    "charge",
    "payment",
    // security
    "security",
    "hacked",
    "breach",
    "unauthorized",
];

/// What caused an escalation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationTrigger {
    /// The model's reply carried [`ESCALATE_TAG`].
    ModelTag,
    /// The customer's message contained this keyword.
    Keyword(String),
}

impl EscalationTrigger {
    /// Human-readable reason stored in the escalation log.
    pub fn reason(&self) -> String {
        match self {
            EscalationTrigger::ModelTag => "Assistant requested human handoff".to_string(),
            EscalationTrigger::Keyword(keyword) => {
                format!("Escalation keyword detected: {}", keyword)
            }
        }
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            EscalationTrigger::ModelTag => "model_tag",
            EscalationTrigger::Keyword(_) => "keyword",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EscalationClassifier {
    keywords: Vec<String>,
}

impl Default for EscalationClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_ESCALATION_KEYWORDS.iter().copied())
    }
}

impl EscalationClassifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn should_escalate(&self, user_message: &str, bot_reply: &str) -> bool {
        self.classify(user_message, bot_reply).is_some()
    }

    /// Returns the first trigger that fires. The model tag is checked first.
    pub fn classify(&self, user_message: &str, bot_reply: &str) -> Option<EscalationTrigger> {
        if contains_tag(bot_reply, ESCALATE_TAG) {
            return Some(EscalationTrigger::ModelTag);
        }

        let user_lower = user_message.to_lowercase();
        self.keywords
            .iter()
            .find(|keyword| user_lower.contains(keyword.as_str()))
            .map(|keyword| EscalationTrigger::Keyword(keyword.clone()))
    }
}

fn contains_tag(text: &str, tag: &str) -> bool {
    text.to_lowercase().contains(&tag.to_lowercase())
}

/// Removes the routing tags from a model reply before it is shown to the
/// customer.
pub fn strip_control_tags(reply: &str) -> String {
    let mut cleaned = reply.to_string();
    for tag in [ESCALATE_TAG, CONTINUE_TAG] {
        cleaned = remove_case_insensitive(&cleaned, tag);
    }
    cleaned.trim().to_string()
}

fn remove_case_insensitive(haystack: &str, needle: &str) -> String {
    let needle_lower = needle.to_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;

    // Match against the original bytes: lowercasing non-ASCII text can shift offsets.
    while !rest.is_empty() {
        match find_ascii_case_insensitive(rest, &needle_lower) {
            Some(idx) => {
                out.push_str(&rest[..idx]);
                rest = &rest[idx + needle.len()..];
            }
            None => {
                out.push_str(rest);
                break;
            }
        }
    }
    out
}

fn find_ascii_case_insensitive(haystack: &str, needle_lower: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle_lower.as_bytes();
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| {
        haystack.is_char_boundary(i)
            && hay[i..i + needle.len()]
                .iter()
                .zip(needle)
                .all(|(a, b)| a.to_ascii_lowercase() == *b)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_keyword_escalates_regardless_of_reply() {
        let classifier = EscalationClassifier::default();
        for keyword in DEFAULT_ESCALATION_KEYWORDS {
            let message = format!("well, {} please", keyword.to_uppercase());
            assert!(
                classifier.should_escalate(&message, "Happy to help! [CONTINUE]"),
                "keyword {} did not escalate",
                keyword
            );
        }
    }

    #[test]
    fn model_tag_escalates_neutral_text() {
        let classifier = EscalationClassifier::default();
        assert!(classifier.should_escalate(
            "What are your opening hours?",
            "Let me connect you with someone. [ESCALATE]"
        ));
        assert!(classifier.should_escalate("hi", "[escalate]"));
        assert_eq!(
            classifier.classify("hi", "ok [Escalate]"),
            Some(EscalationTrigger::ModelTag)
        );
    }

    #[test]
    fn neutral_exchange_does_not_escalate() {
        let classifier = EscalationClassifier::default();
        assert!(!classifier.should_escalate(
            "How do I reset my password?",
            "Click 'Forgot password' on the login page. [CONTINUE]"
        ));
    }

    #[test]
    fn keyword_trigger_carries_reason() {
        let classifier = EscalationClassifier::default();
        let trigger = classifier
            .classify("I want a refund now!", "Sure. [CONTINUE]")
            .unwrap();
        assert_eq!(trigger, EscalationTrigger::Keyword("refund".to_string()));
        assert!(!trigger.reason().is_empty());
        assert!(trigger.reason().contains("refund"));
    }

    #[test]
    fn custom_keywords_replace_defaults() {
        let classifier = EscalationClassifier::new(["lawyer"]);
        assert!(classifier.should_escalate("I will call my LAWYER", ""));
        assert!(!classifier.should_escalate("I want a refund", ""));
    }

    #[test]
    fn control_tags_are_stripped() {
        assert_eq!(
            strip_control_tags("Try resetting it. [CONTINUE]"),
            "Try resetting it."
        );
        assert_eq!(
            strip_control_tags("A human will follow up. [escalate]"),
            "A human will follow up."
        );
        assert_eq!(strip_control_tags("Grüße! [CONTINUE]"), "Grüße!");
        assert_eq!(strip_control_tags("no tags"), "no tags");
    }
}
