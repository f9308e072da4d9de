//! Parser for the stage summarizer's LM output.
//!
//! The preferred format is a dashed list (`- <name>: <text>`), but real
//! model output drifts toward markdown: headed sections, bolded names,
//! and parenthesized furigana. This parser tolerates all of those and
//! resolves each section back to a canonical agent id.

use dialogue_core::AgentProfile;
use regex::Regex;
use std::sync::OnceLock;

static BULLET_LINE: OnceLock<Regex> = OnceLock::new();
static HEADER_LINE: OnceLock<Regex> = OnceLock::new();
static FURIGANA: OnceLock<Regex> = OnceLock::new();
static MARKUP: OnceLock<Regex> = OnceLock::new();

fn bullet_line() -> &'static Regex {
    BULLET_LINE.get_or_init(|| Regex::new(r"^\s*[-*•]\s+(.+)$").unwrap())
}

fn header_line() -> &'static Regex {
    HEADER_LINE.get_or_init(|| Regex::new(r"^\s*#{1,4}\s+(.+?)\s*$").unwrap())
}

fn furigana() -> &'static Regex {
    FURIGANA.get_or_init(|| Regex::new(r"\([^)]*\)").unwrap())
}

fn markup() -> &'static Regex {
    MARKUP.get_or_init(|| Regex::new(r"[*`_]").unwrap())
}

/// Strip bold/backtick/italic markers and parenthesized furigana, then trim.
fn clean_label(raw: &str) -> String {
    let no_furigana = furigana().replace_all(raw, "");
    markup().replace_all(&no_furigana, "").trim().to_string()
}

/// One raw `(label, text)` section extracted before name resolution.
struct RawSection {
    label: String,
    text: String,
}

fn extract_sections(content: &str) -> Vec<RawSection> {
    let mut sections: Vec<RawSection> = Vec::new();
    let mut current: Option<RawSection> = None;

    for line in content.lines() {
        if let Some(caps) = bullet_line().captures(line) {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            let rest = caps.get(1).unwrap().as_str();
            if let Some((label, text)) = rest.split_once(':') {
                current = Some(RawSection { label: clean_label(label), text: text.trim().to_string() });
            } else {
                current = Some(RawSection { label: clean_label(rest), text: String::new() });
            }
            continue;
        }

        if let Some(caps) = header_line().captures(line) {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            let label = caps.get(1).unwrap().as_str();
            current = Some(RawSection { label: clean_label(label), text: String::new() });
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(section) = current.as_mut() {
            if !section.text.is_empty() {
                section.text.push(' ');
            }
            section.text.push_str(trimmed);
        }
    }
    if let Some(section) = current.take() {
        sections.push(section);
    }
    sections
}

/// Resolve a raw label to a registered agent, by exact name, exact id, or
/// case-insensitive containment of the label in the agent's name.
fn resolve_agent<'a>(label: &str, agents: &'a [AgentProfile]) -> Option<&'a AgentProfile> {
    let label_lower = label.to_lowercase();
    agents
        .iter()
        .find(|a| a.name.to_lowercase() == label_lower || a.id.to_lowercase() == label_lower)
        .or_else(|| {
            agents.iter().find(|a| {
                let name_lower = a.name.to_lowercase();
                !name_lower.is_empty() && (label_lower.contains(&name_lower) || name_lower.contains(&label_lower))
            })
        })
}

/// Parse the summarizer's LM output into one position per participating
/// agent, in first-appearance order, dropping duplicates and
/// unresolvable sections.
pub fn parse_positions(content: &str, agents: &[AgentProfile]) -> Vec<(String, String)> {
    let mut seen = std::collections::HashSet::new();
    let mut positions = Vec::new();

    for section in extract_sections(content) {
        if section.label.is_empty() || section.text.is_empty() {
            continue;
        }
        let Some(agent) = resolve_agent(&section.label, agents) else {
            tracing::warn!(label = %section.label, "stage summary section did not resolve to a registered agent");
            continue;
        };
        if !seen.insert(agent.id.clone()) {
            continue;
        }
        positions.push((agent.id.clone(), section.text));
    }
    positions
}
