//! Per-agent context compression.
//!
//! Keeps the most recent messages verbatim and trims older ones, oldest
//! first, until the composed context fits the configured token budget.
//! Token counts are a rough heuristic, not an exact tokenizer count.

use dialogue_config::MemoryConfig;
use dialogue_core::Message;

pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Select the subset of `messages` that should go into a stage prompt,
/// given `config`'s budget. Always keeps at least the last
/// `recent_messages_kept` messages even if that alone exceeds the budget
/// (the budget trims further history, not the recent window itself).
pub fn select_context<'a>(messages: &'a [Message], config: &MemoryConfig) -> Vec<&'a Message> {
    let total = messages.len();
    let recent_start = total.saturating_sub(config.recent_messages_kept);
    let recent: Vec<&Message> = messages[recent_start..].iter().collect();

    let mut budget_used: usize = recent.iter().map(|m| estimate_tokens(&m.content)).sum();
    let mut older: Vec<&Message> = Vec::new();

    for message in messages[..recent_start].iter().rev() {
        let cost = estimate_tokens(&message.content);
        if budget_used + cost > config.token_budget {
            break;
        }
        budget_used += cost;
        older.push(message);
    }
    older.reverse();
    older.into_iter().chain(recent).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_core::MessageRole;

    fn message(content: &str, seq: u32) -> Message {
        Message::new("agent-a", content, MessageRole::Agent, seq)
    }

    #[test]
    fn keeps_all_when_under_budget() {
        let messages: Vec<Message> = (0..5).map(|i| message("short", i)).collect();
        let config = MemoryConfig { recent_messages_kept: 3, token_budget: 1000 };
        let selected = select_context(&messages, &config);
        assert_eq!(selected.len(), 5);
    }

    #[test]
    fn always_keeps_recent_window_even_over_budget() {
        let messages: Vec<Message> = (0..5).map(|i| message(&"x".repeat(400), i)).collect();
        let config = MemoryConfig { recent_messages_kept: 3, token_budget: 1 };
        let selected = select_context(&messages, &config);
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn trims_oldest_first_beyond_budget() {
        let messages = vec![
            message(&"x".repeat(40), 0),
            message(&"x".repeat(40), 1),
            message("recent", 2),
        ];
        let config = MemoryConfig { recent_messages_kept: 1, token_budget: 15 };
        let selected = select_context(&messages, &config);
        // Only the recent window fits; the two padded older messages don't.
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].content, "recent");
    }
}
