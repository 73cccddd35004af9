/// Canned reply chosen for a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseTemplate {
    pub full_text: String,
    pub memory_tags: Option<Vec<String>>,
}

impl ResponseTemplate {
    pub fn new(full_text: impl Into<String>) -> Self {
        Self {
            full_text: full_text.into(),
            memory_tags: None,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.memory_tags = Some(tags.iter().map(|tag| tag.to_string()).collect());
        self
    }
}

/// A trigger rule: any of `triggers` appearing in the lowercased prompt selects the reply
struct ResponseRule {
    triggers: &'static [&'static str],
    text: &'static str,
    tags: &'static [&'static str],
}

// Order matters, first match wins.
const RULES: &[ResponseRule] = &[
    ResponseRule {
        triggers: &["hi", "hello"],
        text: GREETING_REPLY,
        tags: &[],
    },
    ResponseRule {
        triggers: &["startup", "company"],
        text: CAREER_REPLY,
        tags: &["career"],
    },
    ResponseRule {
        triggers: &["help", "advice"],
        text: ASSISTANCE_REPLY,
        tags: &[],
    },
];

pub const GREETING_REPLY: &str = "Hey! Good to see you again. What's on your mind?";

pub const CAREER_REPLY: &str = "I remember you're building AiRA. How's that going?";

pub const ASSISTANCE_REPLY: &str = "I'm here to help! I can assist you with questions, provide advice, help with problem-solving, or just have a conversation. What would you like to explore today?";

pub const FALLBACK_REPLY: &str = "That's interesting. Tell me more about that.";

/// Pick the canned reply for a prompt.
///
/// Matching is a case-insensitive substring test, so "this" triggers the
/// greeting just like "hi" does.
pub fn select_response(prompt: &str) -> ResponseTemplate {
    let prompt = prompt.to_lowercase();

    RULES
        .iter()
        .find(|rule| rule.triggers.iter().any(|trigger| prompt.contains(trigger)))
        .map(|rule| {
            let template = ResponseTemplate::new(rule.text);
            if rule.tags.is_empty() {
                template
            } else {
                template.with_tags(rule.tags)
            }
        })
        .unwrap_or_else(|| ResponseTemplate::new(FALLBACK_REPLY))
}
