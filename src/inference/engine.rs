use serde::Serialize;

use super::keywords::derive_keywords;
use crate::script::Script;
use crate::session::{Message, Role};

/// How many of the most recent assistant utterances the active-section
/// heuristic looks at.
const RECENT_WINDOW: usize = 3;

/// Runtime progress state derived from one script section.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    /// First `_`-token of the section id.
    pub id: String,
    /// Section title.
    pub name: String,
    /// 1-based position in the script's interview order.
    pub order: u32,
    pub keywords: Vec<String>,
    pub is_active: bool,
    pub is_completed: bool,
}

/// Build one category per script section, keywords derived up front.
pub fn extract_categories(script: &Script) -> Vec<Category> {
    let mut categories = Vec::new();

    for (order, section_id) in script.section_order().iter().enumerate() {
        let Some(section) = script.sections.get(section_id) else {
            continue;
        };
        let main_category = section_id.split('_').next().unwrap_or(section_id);

        categories.push(Category {
            id: main_category.to_string(),
            name: section.title.clone(),
            order: order as u32 + 1,
            keywords: derive_keywords(script, section_id),
            is_active: false,
            is_completed: false,
        });
    }

    categories
}

fn recent_assistant_text(messages: &[Message]) -> Option<String> {
    let recent: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .rev()
        .take(RECENT_WINDOW)
        .map(|m| m.content.as_str())
        .collect();

    if recent.is_empty() {
        return None;
    }

    // Chronological order, lowercased, joined for substring scoring.
    Some(
        recent
            .iter()
            .rev()
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
    )
}

fn score_category(text: &str, category: &Category) -> u32 {
    category
        .keywords
        .iter()
        .filter(|keyword| text.contains(keyword.as_str()))
        .map(|keyword| if keyword.len() > 5 { 2 } else { 1 })
        .sum()
}

/// The category id judged to be the current topic, from the most recent
/// assistant utterances. `None` when nothing matches or there are no
/// assistant messages.
///
/// Ties resolve to the highest order: the section most recently reachable
/// in the script's natural progression.
pub fn detect_active(messages: &[Message], categories: &[Category]) -> Option<String> {
    if messages.is_empty() || categories.is_empty() {
        return None;
    }

    let text = recent_assistant_text(messages)?;

    let mut best: Option<(&Category, u32)> = None;
    for category in categories {
        let score = score_category(&text, category);
        if score == 0 {
            continue;
        }
        let better = match best {
            None => true,
            Some((best_cat, best_score)) => {
                score > best_score || (score == best_score && category.order > best_cat.order)
            }
        };
        if better {
            best = Some((category, score));
        }
    }

    best.map(|(category, _)| category.id.clone())
}

/// Category ids judged already traversed: keyword-matched at least once in
/// any assistant message AND ordered strictly before the active category.
/// When the final section is active, every earlier section is completed
/// regardless of match history.
pub fn detect_completed(messages: &[Message], categories: &[Category]) -> Vec<String> {
    let mut completed = Vec::new();

    let assistant_texts: Vec<String> = messages
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .map(|m| m.content.to_lowercase())
        .collect();

    if assistant_texts.is_empty() {
        return completed;
    }

    let active = detect_active(messages, categories);
    let current_order = active
        .as_deref()
        .and_then(|id| categories.iter().find(|c| c.id == id))
        .map(|c| c.order)
        .unwrap_or(0);

    for category in categories {
        let matched = assistant_texts.iter().any(|text| {
            category
                .keywords
                .iter()
                .any(|keyword| text.contains(keyword.as_str()))
        });
        if matched && category.order < current_order {
            completed.push(category.id.clone());
        }
    }

    // Reaching the final section is taken as proof that every prior
    // section was traversed.
    let max_order = categories.iter().map(|c| c.order).max().unwrap_or(0);
    let final_active = active
        .as_deref()
        .and_then(|id| categories.iter().find(|c| c.id == id))
        .map(|c| c.order == max_order)
        .unwrap_or(false);

    if final_active {
        for category in categories {
            if category.order < max_order && !completed.contains(&category.id) {
                completed.push(category.id.clone());
            }
        }
    }

    completed
}

/// Full recomputation of category state from the transcript and script.
/// Pure: mutates neither input, holds no state between calls. At most one
/// category comes back active.
pub fn compute_progress(messages: &[Message], script: &Script) -> Vec<Category> {
    let mut categories = extract_categories(script);
    if categories.is_empty() {
        return categories;
    }

    let active = detect_active(messages, &categories);
    let completed = detect_completed(messages, &categories);

    for category in &mut categories {
        category.is_active = active.as_deref() == Some(category.id.as_str());
        category.is_completed = completed.contains(&category.id);
    }

    categories
}
