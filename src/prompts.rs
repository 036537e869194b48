//! Prompt text for worksheet generation.
//!
//! The persona/task part ([`DEFAULT_SYSTEM_PROMPT`]) is user-editable via
//! [`crate::config::WorksheetConfig::system_prompt`]. The output-format
//! part ([`JSON_FORMAT_SPEC`]) is always appended; the renderers depend on
//! its exact shape.

/// Default persona and task description.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an experienced teacher and instructional designer. Your task is to turn the supplied source material into a complete lesson worksheet.

Follow these rules precisely:

1. SOURCE FIDELITY
   - Use ONLY the supplied source material; do not add outside facts
   - Cite the page of every concept, term and question as "p.N"

2. STUDENT SECTION
   - Explain concepts in clear, age-appropriate language
   - Order activities from recall to application
   - Never reveal answers in the student section

3. TEACHER SECTION
   - Provide a complete answer key with explanations
   - Give a three-level rubric for every essay question
   - Anticipate common misconceptions and give ready-to-use feedback

4. FORMAT
   - Keep the lesson achievable within the stated duration
   - Balance easy, medium and hard questions"#;

/// Output-format instruction appended to every system prompt.
///
/// Mirrors [`crate::worksheet::Worksheet`] field for field.
pub const JSON_FORMAT_SPEC: &str = r#"

---
**IMPORTANT: OUTPUT FORMAT**
Based on the material above, respond with a single JSON object with the structure below.

Quality requirements (mandatory):
- Every explanation is detailed: at least 3-5 sentences
- Core concepts: at least 8-12 (2-3+ sentences each)
- Key terms: at least 15-20 (1-2+ sentences each)
- Concept explanations: definition (2+ sentences), explanation (3-5+ sentences), example (2-3+ sentences)
- Activities: at least 6 fill-in-the-blank, 5 O/X and 4 short-answer questions
- Explanations: at least 3-4 concrete sentences per question
- Rubric: 2-3 sentences per level (high/mid/low)

{
  "title": "Worksheet title",
  "metadata": {
    "grade": "Target grade",
    "subject": "Subject / unit",
    "duration": "Lesson duration",
    "level": "Student level"
  },
  "design": {
    "core_concepts": [
      {"concept": "Concept name", "definition": "2-3 sentence definition", "page": "p.X"}
    ],
    "key_terms": [
      {"term": "Term", "definition": "1-2 sentence explanation", "page": "p.X"}
    ],
    "misconceptions": ["Misconception and why it is confusing", "Misconception 2"]
  },
  "student_worksheet": {
    "lesson_info": {
      "title": "Lesson title",
      "objectives": ["Objective with a concrete action verb (3-5)"],
      "keywords": ["Keyword (5-8)"]
    },
    "concept_explanations": [
      {
        "concept": "Concept name",
        "definition": "2 sentences: short, precise definition",
        "explanation": "3-5 sentences: accessible, detailed explanation",
        "example": "2-3 sentences: concrete example from the PDF",
        "page": "p.X",
        "check_question": {"question": "Check question", "answer": "Answer"}
      }
    ],
    "activities": {
      "fill_blanks": [{"question": "Question", "answer": "Answer", "page": "p.X"}],
      "ox_questions": [{"question": "Question", "answer": "O or X", "page": "p.X"}],
      "short_answers": [{"question": "Question", "answer": "Answer", "page": "p.X"}],
      "find_evidence": {"instruction": "Evidence-finding instruction", "page": "p.X"}
    },
    "application_task": {
      "description": "3-5 sentence task description",
      "output_format": "Clear deliverable",
      "guidelines": ["Concrete guideline (3-5)"]
    },
    "assessment": {
      "multiple_choice": [
        {"question": "Question", "options": ["Option 1", "Option 2", "Option 3", "Option 4"], "answer": 1, "page": "p.X"}
      ],
      "short_answer": [
        {"question": "Question", "answer": "Answer", "page": "p.X"}
      ],
      "essay": [
        {"question": "Question", "rubric_elements": ["Scoring element 1", "Element 2"], "page": "p.X"}
      ]
    }
  },
  "teacher_guide": {
    "answer_key": "At-a-glance answer table (2-3 sentences)",
    "explanations": [
      {"question_num": "1", "explanation": "3-4 sentences: why this is the answer", "page": "p.X"}
    ],
    "rubric": [
      {
        "question": "Essay question",
        "high": "2-3 sentences: high-level criteria",
        "mid": "2-3 sentences: mid-level criteria",
        "low": "2-3 sentences: low-level criteria"
      }
    ],
    "feedback_tips": [
      {"misconception": "Wrong-answer pattern", "feedback": "2-3 sentences of feedback a teacher can use immediately"}
    ]
  },
  "quality_check": {
    "no_external_content": true,
    "all_pages_cited": true,
    "no_ambiguous_questions": true,
    "time_appropriate": true,
    "difficulty_met": true,
    "no_answer_leak": true
  }
}"#;

/// Heading placed before the source text in the user message.
pub const SOURCE_HEADING: &str = "[Source material]";

/// Heading placed before the free-text customisation in the user message.
pub const USER_REQUEST_HEADING: &str = "[Additional requirements from the user]";

/// Full system message: editable template followed by the schema.
pub fn system_message(template: &str) -> String {
    format!("{template}{JSON_FORMAT_SPEC}")
}

/// User message: the source text, then the optional customisation.
pub fn user_message(source_text: &str, user_request: Option<&str>) -> String {
    let mut msg = format!("\n{SOURCE_HEADING}\n{source_text}");
    if let Some(request) = user_request.map(str::trim).filter(|r| !r.is_empty()) {
        msg.push_str(&format!("\n\n{USER_REQUEST_HEADING}\n{request}\n"));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_appended_to_custom_template() {
        let msg = system_message("You are a strict chemistry teacher.");
        assert!(msg.starts_with("You are a strict chemistry teacher."));
        assert!(msg.ends_with(JSON_FORMAT_SPEC));
    }

    #[test]
    fn schema_example_is_valid_worksheet_json() {
        let start = JSON_FORMAT_SPEC.find('{').unwrap();
        let parsed: crate::worksheet::Worksheet =
            serde_json::from_str(&JSON_FORMAT_SPEC[start..]).expect("schema example parses");
        assert_eq!(parsed.title.as_deref(), Some("Worksheet title"));
        let qc = parsed.quality_check.expect("quality_check present");
        assert!(qc.no_answer_leak);
    }

    #[test]
    fn user_message_without_request() {
        let msg = user_message("Photosynthesis converts light.", None);
        assert_eq!(msg, "\n[Source material]\nPhotosynthesis converts light.");
    }

    #[test]
    fn user_message_with_request() {
        let msg = user_message("text", Some("  Make it for grade 5  "));
        assert!(msg.contains(USER_REQUEST_HEADING));
        assert!(msg.ends_with("Make it for grade 5\n"));
    }

    #[test]
    fn blank_request_is_ignored() {
        assert!(!user_message("text", Some("   ")).contains(USER_REQUEST_HEADING));
    }
}
