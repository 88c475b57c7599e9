use std::collections::BTreeSet;

use crate::script::Script;

/// Common English words that carry no topical signal in question text.
const STOP_WORDS: &[&str] = &[
    "have", "been", "your", "what", "when", "where", "were", "with", "that", "this", "they",
    "them", "from", "about", "would", "could", "should", "after", "before", "during", "since",
];

/// Synonym expansions keyed by tokens of a section identifier. An id like
/// `pregnancy_history` contributes both token tables.
fn synonyms_for_token(token: &str) -> &'static [&'static str] {
    match token {
        "pregnancy" => &[
            "pregnant",
            "pregnancies",
            "birth",
            "delivery",
            "gestational",
            "obstetric",
        ],
        "fertility" => &[
            "fertility",
            "genetic",
            "carrier",
            "screening",
            "diagnostic",
            "testing",
        ],
        "lifestyle" => &[
            "lifestyle",
            "substance",
            "smoking",
            "alcohol",
            "drug",
            "tobacco",
        ],
        "interview" => &[
            "interview",
            "complete",
            "completion",
            "thank",
            "recorded",
            "review",
        ],
        "history" => &["history", "medical", "health"],
        "testing" => &["testing", "test", "tests", "screening", "screen"],
        _ => &[],
    }
}

/// Keywords contributed by the section identifier itself: its `_`-tokens
/// plus their synonym expansions.
pub fn section_synonyms(section_id: &str) -> Vec<String> {
    let mut keywords = Vec::new();
    for token in section_id.split('_') {
        let token = token.to_lowercase();
        for synonym in synonyms_for_token(&token) {
            keywords.push((*synonym).to_string());
        }
        keywords.push(token);
    }
    keywords
}

fn meaningful_tokens(text: &str, out: &mut BTreeSet<String>) {
    for word in text.to_lowercase().split_whitespace() {
        if word.len() <= 3 || STOP_WORDS.contains(&word) {
            continue;
        }
        let stripped: String = word.chars().filter(|c| c.is_ascii_alphabetic()).collect();
        if stripped.len() > 2 {
            out.insert(stripped);
        }
    }
}

/// Derive the keyword set for one section: meaningful tokens from its
/// questions' text, title, and category fields, plus the synonym table
/// keyed by the section identifier. Runs once per script load.
pub fn derive_keywords(script: &Script, section_id: &str) -> Vec<String> {
    let mut keywords = BTreeSet::new();

    for question in script.questions.values() {
        if question.section != section_id {
            continue;
        }
        meaningful_tokens(&question.question, &mut keywords);
        if let Some(title) = &question.title {
            meaningful_tokens(title, &mut keywords);
        }
        meaningful_tokens(&question.category, &mut keywords);
    }

    for keyword in section_synonyms(section_id) {
        keywords.insert(keyword);
    }

    keywords.into_iter().collect()
}
