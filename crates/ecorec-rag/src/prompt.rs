//! Prompt assembly for grounded answers.

use ecorec_core::types::{ChatTurn, MetaValue, Role, SearchHit};

pub const SYSTEM_PROMPT: &str = "You are a careful retrieval assistant for an Indonesian audience. \
Answer only from the provided context and reply in Indonesian. \
Cite every fact you use as (source, p.X). \
If the context is not enough, say you don't know and suggest uploading a relevant document. \
Keep answers short; use bullets for steps or lists. \
Copy links from the facts section exactly as written.";

/// Most recent turns carried into the prompt.
pub const HISTORY_TURNS: usize = 6;
pub const HISTORY_CHARS: usize = 300;
pub const CONTEXT_CHARS: usize = 900;

/// Collapses runs of whitespace to single spaces and cuts to `max` chars.
pub fn condense(text: &str, max: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(max) {
        Some((byte, _)) => collapsed[..byte].to_string(),
        None => collapsed,
    }
}

fn history_block(history: &[ChatTurn]) -> String {
    let start = history.len().saturating_sub(HISTORY_TURNS);
    let mut out = String::new();
    for turn in &history[start..] {
        let who = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        out.push_str(&format!("{who}: {}\n", condense(&turn.content, HISTORY_CHARS)));
    }
    out
}

fn context_block(hits: &[SearchHit]) -> String {
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("[{}] ({} p.{})\n", i + 1, hit.source, hit.page));
        out.push_str(&condense(&hit.text, CONTEXT_CHARS));
        out.push('\n');
    }
    out
}

/// `- <place_name>: <map_url or image>` for every hit that carries both.
fn facts_block(hits: &[SearchHit]) -> String {
    let text_of = |hit: &SearchHit, key: &str| {
        hit.metadata
            .get(key)
            .and_then(MetaValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let mut out = String::new();
    for hit in hits {
        let Some(name) = text_of(hit, "place_name") else { continue };
        if let Some(link) = text_of(hit, "map_url").or_else(|| text_of(hit, "image")) {
            out.push_str(&format!("- {name}: {link}\n"));
        }
    }
    out
}

/// User-side prompt: history, numbered context, link facts, then the question.
pub fn build_user_prompt(query: &str, hits: &[SearchHit], history: &[ChatTurn]) -> String {
    let mut prompt = String::new();

    let history = history_block(history);
    if !history.is_empty() {
        prompt.push_str(&format!("# Conversation so far\n{history}\n"));
    }

    prompt.push_str("# Context\n");
    if hits.is_empty() {
        prompt.push_str("(no matching documents)\n");
    } else {
        prompt.push_str(&context_block(hits));
    }

    let facts = facts_block(hits);
    if !facts.is_empty() {
        prompt.push_str(&format!("\n# Facts\n{facts}"));
    }

    prompt.push_str(&format!("\n# Question\n{}\n", query.trim()));
    prompt
}
