//! Worksheet data model: the JSON object the completion API returns.
//!
//! The model is instructed with [`crate::prompts::JSON_FORMAT_SPEC`] but is
//! free to omit anything, so every field is optional and every list defaults
//! to empty. Nothing here is validated beyond what serde does; the renderers
//! check for presence section by section.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Title used when the model did not return one.
pub const DEFAULT_TITLE: &str = "Worksheet";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Worksheet {
    #[serde(deserialize_with = "opt_string_or_number")]
    pub title: Option<String>,
    pub metadata: Option<Metadata>,
    pub design: Option<Design>,
    pub student_worksheet: Option<StudentWorksheet>,
    pub teacher_guide: Option<TeacherGuide>,
    pub quality_check: Option<QualityCheck>,
}

impl Worksheet {
    /// The title, or [`DEFAULT_TITLE`] when missing or blank.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(deserialize_with = "opt_string_or_number")]
    pub grade: Option<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub subject: Option<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub duration: Option<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub level: Option<String>,
}

// ── Design notes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Design {
    #[serde(deserialize_with = "null_as_default")]
    pub core_concepts: Vec<CoreConcept>,
    #[serde(deserialize_with = "null_as_default")]
    pub key_terms: Vec<KeyTerm>,
    #[serde(deserialize_with = "string_list")]
    pub misconceptions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConcept {
    #[serde(deserialize_with = "string_or_number")]
    pub concept: String,
    #[serde(deserialize_with = "string_or_number")]
    pub definition: String,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyTerm {
    #[serde(deserialize_with = "string_or_number")]
    pub term: String,
    #[serde(deserialize_with = "string_or_number")]
    pub definition: String,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub page: Option<String>,
}

// ── Student section ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentWorksheet {
    pub lesson_info: Option<LessonInfo>,
    #[serde(deserialize_with = "null_as_default")]
    pub concept_explanations: Vec<ConceptExplanation>,
    pub activities: Option<Activities>,
    pub application_task: Option<ApplicationTask>,
    pub assessment: Option<Assessment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LessonInfo {
    #[serde(deserialize_with = "opt_string_or_number")]
    pub title: Option<String>,
    #[serde(deserialize_with = "string_list")]
    pub objectives: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptExplanation {
    #[serde(deserialize_with = "string_or_number")]
    pub concept: String,
    #[serde(deserialize_with = "string_or_number")]
    pub definition: String,
    #[serde(deserialize_with = "string_or_number")]
    pub explanation: String,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub example: Option<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub page: Option<String>,
    pub check_question: Option<CheckQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckQuestion {
    #[serde(deserialize_with = "string_or_number")]
    pub question: String,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Activities {
    #[serde(deserialize_with = "null_as_default")]
    pub fill_blanks: Vec<QuestionItem>,
    #[serde(deserialize_with = "null_as_default")]
    pub ox_questions: Vec<QuestionItem>,
    #[serde(deserialize_with = "null_as_default")]
    pub short_answers: Vec<QuestionItem>,
    pub find_evidence: Option<FindEvidence>,
}

/// A question with a textual answer and a page citation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionItem {
    #[serde(deserialize_with = "string_or_number")]
    pub question: String,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub answer: Option<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindEvidence {
    #[serde(deserialize_with = "string_or_number")]
    pub instruction: String,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationTask {
    #[serde(deserialize_with = "string_or_number")]
    pub description: String,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub output_format: Option<String>,
    #[serde(deserialize_with = "string_list")]
    pub guidelines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Assessment {
    #[serde(deserialize_with = "null_as_default")]
    pub multiple_choice: Vec<MultipleChoice>,
    #[serde(deserialize_with = "null_as_default")]
    pub short_answer: Vec<QuestionItem>,
    #[serde(deserialize_with = "null_as_default")]
    pub essay: Vec<EssayQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultipleChoice {
    #[serde(deserialize_with = "string_or_number")]
    pub question: String,
    #[serde(deserialize_with = "string_list")]
    pub options: Vec<String>,
    pub answer: Option<Answer>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub page: Option<String>,
}

/// Multiple-choice answers arrive as an option number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Index(i64),
    Text(String),
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Index(n) => write!(f, "{n}"),
            Answer::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EssayQuestion {
    #[serde(deserialize_with = "string_or_number")]
    pub question: String,
    #[serde(deserialize_with = "string_list")]
    pub rubric_elements: Vec<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub page: Option<String>,
}

// ── Teacher section ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeacherGuide {
    #[serde(deserialize_with = "opt_string_or_number")]
    pub answer_key: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub explanations: Vec<Explanation>,
    #[serde(deserialize_with = "null_as_default")]
    pub rubric: Vec<RubricEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub feedback_tips: Vec<FeedbackTip>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Explanation {
    /// Models send this as `"1"` or `1`; both are accepted.
    #[serde(deserialize_with = "string_or_number")]
    pub question_num: String,
    #[serde(deserialize_with = "string_or_number")]
    pub explanation: String,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub question: String,
    #[serde(deserialize_with = "string_or_number")]
    pub high: String,
    #[serde(deserialize_with = "string_or_number")]
    pub mid: String,
    #[serde(deserialize_with = "string_or_number")]
    pub low: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackTip {
    #[serde(deserialize_with = "string_or_number")]
    pub misconception: String,
    #[serde(deserialize_with = "string_or_number")]
    pub feedback: String,
}

// ── Quality checklist ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityCheck {
    #[serde(deserialize_with = "null_as_default")]
    pub no_external_content: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub all_pages_cited: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub no_ambiguous_questions: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub time_appropriate: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub difficulty_met: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub no_answer_leak: bool,
}

impl QualityCheck {
    /// `(label, passed)` pairs in display order.
    pub fn items(&self) -> [(&'static str, bool); 6] {
        [
            ("No content from outside the PDF", self.no_external_content),
            ("Every concept and question cites a page", self.all_pages_cited),
            ("No ambiguous questions", self.no_ambiguous_questions),
            ("Fits within the lesson time", self.time_appropriate),
            ("Difficulty distribution met", self.difficulty_met),
            ("No answers exposed in the student section", self.no_answer_leak),
        ]
    }
}

// ── Lenient field parsing ────────────────────────────────────────────────
//
// Models send `null` for fields they have nothing for and numbers where a
// string was asked for. Both are accepted: `null` reads as the default and
// numbers are kept as their decimal text.

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn scalar_text<E: serde::de::Error>(value: serde_json::Value) -> Result<Option<String>, E> {
    match value {
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        serde_json::Value::Bool(b) => Ok(Some(b.to_string())),
        serde_json::Value::Null => Ok(None),
        other => Err(E::custom(format!("expected string or number, got {other}"))),
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(scalar_text(serde_json::Value::deserialize(deserializer)?)?.unwrap_or_default())
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    scalar_text(serde_json::Value::deserialize(deserializer)?)
}

/// Null entries are dropped.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    let mut out = Vec::new();
    for value in values.unwrap_or_default() {
        if let Some(text) = scalar_text(value)? {
            out.push(text);
        }
    }
    Ok(out)
}
