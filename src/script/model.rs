use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ScriptError;

/// The full interview script. Section declaration order is significant:
/// it defines the interview's natural progression unless the metadata
/// carries an explicit `section_order`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub metadata: ScriptMetadata,
    #[serde(default)]
    pub sections: IndexMap<String, Section>,
    #[serde(default)]
    pub questions: IndexMap<String, Question>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptMetadata {
    #[serde(default)]
    pub title: Option<String>,
    /// Explicit section ordering; overrides declaration order when set.
    #[serde(default)]
    pub section_order: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub base_questions: Vec<String>,
    #[serde(default)]
    pub estimated_time: String,
    /// Hand-authored guidance text; wins over generated guidance.
    #[serde(default)]
    pub conversation_guidance: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub section: String,
    pub question: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub question_type: Option<String>,
}

impl Script {
    pub fn parse(yaml: &str) -> Result<Self, ScriptError> {
        serde_yaml::from_str(yaml).map_err(|e| ScriptError::Unavailable(e.to_string()))
    }

    /// Section ids in interview order: explicit metadata order when
    /// present, declaration order otherwise.
    pub fn section_order(&self) -> Vec<String> {
        match &self.metadata.section_order {
            Some(order) => order.clone(),
            None => self.sections.keys().cloned().collect(),
        }
    }

    pub fn section(&self, name: &str) -> Result<&Section, ScriptError> {
        self.sections
            .get(name)
            .ok_or_else(|| ScriptError::SectionNotFound {
                name: name.to_string(),
                available: self.sections.keys().cloned().collect(),
            })
    }

    /// The section after `name` in interview order, if any.
    pub fn next_section(&self, name: &str) -> Option<String> {
        let order = self.section_order();
        let idx = order.iter().position(|s| s == name)?;
        order.get(idx + 1).cloned()
    }

    /// Questions belonging to one section, in declaration order.
    pub fn questions_for(&self, section_id: &str) -> Vec<&Question> {
        self.questions
            .values()
            .filter(|q| q.section == section_id)
            .collect()
    }

    pub fn question_by_id(&self, id: u32) -> Result<&Question, ScriptError> {
        self.questions
            .values()
            .find(|q| q.id == id)
            .ok_or(ScriptError::QuestionNotFound(id))
    }
}
