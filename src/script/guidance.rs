use super::model::{Question, Section};

/// Natural-language guidance for conducting one section.
///
/// Script-provided guidance wins; otherwise guidance is generated from
/// the section's structure so any script that follows the section shape
/// gets sensible conversational direction.
pub fn section_guidance(section_name: &str, section: &Section, questions: &[&Question]) -> String {
    if let Some(guidance) = &section.conversation_guidance {
        return guidance.clone();
    }

    let has_branching = questions
        .iter()
        .any(|q| q.question_type.as_deref() == Some("branching"));
    let has_detail = questions
        .iter()
        .any(|q| q.question_type.as_deref() == Some("detail"));

    let mut guidance = format!(
        "You are now in the '{}' section ({}). Work through its {} question(s) conversationally rather than as a checklist.",
        section.title,
        section_name,
        questions.len()
    );

    if !section.description.is_empty() {
        guidance.push(' ');
        guidance.push_str(&section.description);
    }

    if has_branching {
        guidance.push_str(
            " Some questions branch on the answer; only follow a branch when the response calls for it.",
        );
    }
    if has_detail {
        guidance.push_str(
            " Detail questions are follow-ups; ask them only after the broader question is answered.",
        );
    }
    if !section.estimated_time.is_empty() {
        guidance.push_str(&format!(
            " Aim to keep this section within about {}.",
            section.estimated_time
        ));
    }

    guidance
}
