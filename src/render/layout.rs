//! Worksheet → block list.
//!
//! This is the only place that knows the worksheet's reading order and
//! labels. Every back-end consumes the same `Vec<Block>`, so DOCX, PDF and
//! HTML always agree on what appears and in which order.
//!
//! Each section is emitted only when present: an absent object or an empty
//! list produces no heading. Answers (`answer`, `check_question.answer`,
//! multiple-choice `answer`) are never emitted in the student part.

use crate::worksheet::{
    Activities, ApplicationTask, Assessment, Design, LessonInfo, Metadata, QualityCheck,
    StudentWorksheet, TeacherGuide, Worksheet,
};

// ── Labels ───────────────────────────────────────────────────────────────

pub const DESIGN_HEADING: &str = "1. Evidence-Based Design";
pub const CORE_CONCEPTS: &str = "Core Concepts";
pub const KEY_TERMS: &str = "Key Terms";
pub const MISCONCEPTIONS: &str = "Common Misconceptions";

pub const STUDENT_HEADING: &str = "Student Worksheet";
pub const LESSON_TITLE_FALLBACK: &str = "Lesson";
pub const OBJECTIVES: &str = "Learning Objectives";
pub const KEYWORDS: &str = "Keywords: ";
pub const SECTION_CONCEPTS: &str = "[A] Key Concepts";
pub const SECTION_ACTIVITIES: &str = "[B] Concept Check Activities";
pub const SECTION_APPLICATION: &str = "[C] Application Task";
pub const SECTION_ASSESSMENT: &str = "[D] Formative Assessment";
pub const FILL_BLANKS: &str = "1. Fill in the Blanks";
pub const OX_QUIZ: &str = "2. O/X Quiz";
pub const SHORT_ANSWERS: &str = "3. Short Answer";
pub const FIND_EVIDENCE: &str = "4. Find the Evidence";
pub const MULTIPLE_CHOICE: &str = "Multiple Choice";
pub const SHORT_ANSWER: &str = "Short Answer";
pub const ESSAY: &str = "Essay";

pub const TEACHER_HEADING: &str = "Teacher Guide (Answers and Explanations)";
pub const ANSWER_KEY: &str = "Answer Key";
pub const EXPLANATIONS: &str = "Explanations";
pub const RUBRIC: &str = "Essay Rubric";
pub const FEEDBACK: &str = "Misconception Feedback";

pub const QUALITY_HEADING: &str = "Quality Checklist";

// ── Block model ──────────────────────────────────────────────────────────

/// Colour role of a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Plain,
    /// Page citations.
    Muted,
    /// Check questions.
    Accent,
    /// Misconceptions, failed checks.
    Alert,
    /// Passed checks.
    Success,
}

impl Tone {
    /// RGB hex without `#`, or `None` for the default text colour.
    pub fn hex(self) -> Option<&'static str> {
        match self {
            Tone::Plain => None,
            Tone::Muted => Some("666666"),
            Tone::Accent => Some("0066CC"),
            Tone::Alert => Some("CC0000"),
            Tone::Success => Some("008000"),
        }
    }
}

/// A styled run of text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub tone: Tone,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            ..Self::default()
        }
    }

    /// Italic grey page reference.
    pub fn cite(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            italic: true,
            tone: Tone::Muted,
            ..Self::default()
        }
    }

    pub fn toned(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            bold: true,
            tone,
            ..Self::default()
        }
    }
}

/// One layout element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Centred, largest heading.
    Title(String),
    /// Centred bold line (document metadata).
    Centered(Vec<Span>),
    Heading1(String),
    Heading2(String),
    Paragraph(Vec<Span>),
    /// Bulleted list item; the renderer draws the bullet.
    Bullet(Vec<Span>),
    /// Indented line under a question (multiple-choice options).
    Indented(String),
    /// Horizontal separator.
    Rule,
    PageBreak,
}

impl Block {
    /// Plain text of the block, without styling.
    pub fn text(&self) -> String {
        match self {
            Block::Title(t) | Block::Heading1(t) | Block::Heading2(t) | Block::Indented(t) => {
                t.clone()
            }
            Block::Centered(spans) | Block::Paragraph(spans) | Block::Bullet(spans) => {
                spans.iter().map(|s| s.text.as_str()).collect()
            }
            Block::Rule | Block::PageBreak => String::new(),
        }
    }
}

// ── Walk ─────────────────────────────────────────────────────────────────

/// Lay out a worksheet in reading order.
pub fn layout(ws: &Worksheet) -> Vec<Block> {
    let mut out = Vec::new();

    out.push(Block::Title(ws.display_title().to_string()));
    if let Some(ref meta) = ws.metadata {
        out.push(metadata_line(meta));
    }

    out.push(Block::Rule);
    out.push(Block::Heading1(DESIGN_HEADING.into()));
    if let Some(ref design) = ws.design {
        design_section(design, &mut out);
    }

    out.push(Block::PageBreak);
    out.push(Block::Rule);
    out.push(Block::Title(STUDENT_HEADING.into()));
    if let Some(ref sw) = ws.student_worksheet {
        student_section(sw, &mut out);
    }

    out.push(Block::PageBreak);
    out.push(Block::Rule);
    out.push(Block::Title(TEACHER_HEADING.into()));
    if let Some(ref tg) = ws.teacher_guide {
        teacher_section(tg, &mut out);
    }

    if let Some(ref qc) = ws.quality_check {
        quality_section(qc, &mut out);
    }

    out
}

fn metadata_line(meta: &Metadata) -> Block {
    let field = |v: &Option<String>| v.clone().unwrap_or_default();
    Block::Centered(vec![
        Span::bold(format!("Grade: {} | ", field(&meta.grade))),
        Span::bold(format!("Subject: {} | ", field(&meta.subject))),
        Span::bold(format!("Duration: {} | ", field(&meta.duration))),
        Span::bold(format!("Level: {}", field(&meta.level))),
    ])
}

/// `" (p.3)"`, or nothing when the page is missing.
fn cite(page: &Option<String>) -> Option<Span> {
    page.as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| Span::cite(format!(" ({p})")))
}

fn with_cite(mut spans: Vec<Span>, page: &Option<String>) -> Vec<Span> {
    spans.extend(cite(page));
    spans
}

fn design_section(design: &Design, out: &mut Vec<Block>) {
    if !design.core_concepts.is_empty() {
        out.push(Block::Heading2(CORE_CONCEPTS.into()));
        for c in &design.core_concepts {
            out.push(Block::Bullet(with_cite(
                vec![Span::bold(format!("{}: ", c.concept)), Span::plain(&c.definition)],
                &c.page,
            )));
        }
    }
    if !design.key_terms.is_empty() {
        out.push(Block::Heading2(KEY_TERMS.into()));
        for t in &design.key_terms {
            out.push(Block::Bullet(with_cite(
                vec![Span::bold(format!("{}: ", t.term)), Span::plain(&t.definition)],
                &t.page,
            )));
        }
    }
    if !design.misconceptions.is_empty() {
        out.push(Block::Heading2(MISCONCEPTIONS.into()));
        for m in &design.misconceptions {
            out.push(Block::Bullet(vec![Span::plain(m)]));
        }
    }
}

fn student_section(sw: &StudentWorksheet, out: &mut Vec<Block>) {
    if let Some(ref info) = sw.lesson_info {
        lesson_info(info, out);
    }

    if !sw.concept_explanations.is_empty() {
        out.push(Block::Heading1(SECTION_CONCEPTS.into()));
        for (idx, ce) in sw.concept_explanations.iter().enumerate() {
            out.push(Block::Paragraph(vec![Span::bold(format!(
                "Concept {}. {}",
                idx + 1,
                ce.concept
            ))]));
            out.push(Block::Paragraph(vec![
                Span::bold("[Definition] "),
                Span::plain(&ce.definition),
            ]));
            out.push(Block::Paragraph(vec![
                Span::bold("[Explanation] "),
                Span::plain(&ce.explanation),
            ]));
            if let Some(example) = ce.example.as_deref().filter(|e| !e.trim().is_empty()) {
                out.push(Block::Paragraph(vec![
                    Span::bold("[Example] "),
                    Span::plain(example),
                ]));
            }
            if let Some(page) = ce.page.as_deref().filter(|p| !p.trim().is_empty()) {
                out.push(Block::Paragraph(vec![Span::cite(format!("Evidence: {page}"))]));
            }
            if let Some(ref cq) = ce.check_question {
                out.push(Block::Paragraph(vec![
                    Span::toned("✓ Check question: ", Tone::Accent),
                    Span::plain(&cq.question),
                ]));
            }
        }
    }

    if let Some(ref activities) = sw.activities {
        activities_section(activities, out);
    }
    if let Some(ref task) = sw.application_task {
        application_section(task, out);
    }
    if let Some(ref assessment) = sw.assessment {
        assessment_section(assessment, out);
    }
}

fn lesson_info(info: &LessonInfo, out: &mut Vec<Block>) {
    let title = info
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(LESSON_TITLE_FALLBACK);
    out.push(Block::Heading1(title.to_string()));

    if !info.objectives.is_empty() {
        out.push(Block::Heading2(OBJECTIVES.into()));
        for obj in &info.objectives {
            out.push(Block::Bullet(vec![Span::plain(obj)]));
        }
    }
    if !info.keywords.is_empty() {
        out.push(Block::Paragraph(vec![
            Span::bold(KEYWORDS),
            Span::plain(info.keywords.join(", ")),
        ]));
    }
}

fn activities_section(a: &Activities, out: &mut Vec<Block>) {
    out.push(Block::Heading1(SECTION_ACTIVITIES.into()));

    for (label, items) in [
        (FILL_BLANKS, &a.fill_blanks),
        (OX_QUIZ, &a.ox_questions),
        (SHORT_ANSWERS, &a.short_answers),
    ] {
        if items.is_empty() {
            continue;
        }
        out.push(Block::Heading2(label.into()));
        for (idx, q) in items.iter().enumerate() {
            out.push(Block::Paragraph(with_cite(
                vec![Span::plain(format!("{}) {}", idx + 1, q.question))],
                &q.page,
            )));
        }
    }

    if let Some(ref fe) = a.find_evidence {
        out.push(Block::Heading2(FIND_EVIDENCE.into()));
        out.push(Block::Paragraph(with_cite(
            vec![Span::plain(&fe.instruction)],
            &fe.page,
        )));
    }
}

fn application_section(task: &ApplicationTask, out: &mut Vec<Block>) {
    out.push(Block::Heading1(SECTION_APPLICATION.into()));
    out.push(Block::Paragraph(vec![Span::plain(&task.description)]));
    if let Some(format) = task.output_format.as_deref().filter(|f| !f.trim().is_empty()) {
        out.push(Block::Paragraph(vec![
            Span::bold("Deliverable: "),
            Span::plain(format),
        ]));
    }
    if !task.guidelines.is_empty() {
        out.push(Block::Paragraph(vec![Span::bold("Guidelines:")]));
        for g in &task.guidelines {
            out.push(Block::Bullet(vec![Span::plain(g)]));
        }
    }
}

fn assessment_section(a: &Assessment, out: &mut Vec<Block>) {
    out.push(Block::Heading1(SECTION_ASSESSMENT.into()));
    // Numbering runs through all three lists.
    let mut question_num = 1;

    if !a.multiple_choice.is_empty() {
        out.push(Block::Heading2(MULTIPLE_CHOICE.into()));
        for mc in &a.multiple_choice {
            out.push(Block::Paragraph(with_cite(
                vec![Span::bold(format!("{}. {}", question_num, mc.question))],
                &mc.page,
            )));
            for (idx, opt) in mc.options.iter().enumerate() {
                out.push(Block::Indented(format!("{}) {}", idx + 1, opt)));
            }
            question_num += 1;
        }
    }
    if !a.short_answer.is_empty() {
        out.push(Block::Heading2(SHORT_ANSWER.into()));
        for sa in &a.short_answer {
            out.push(Block::Paragraph(with_cite(
                vec![Span::bold(format!("{}. {}", question_num, sa.question))],
                &sa.page,
            )));
            question_num += 1;
        }
    }
    if !a.essay.is_empty() {
        out.push(Block::Heading2(ESSAY.into()));
        for es in &a.essay {
            out.push(Block::Paragraph(with_cite(
                vec![Span::bold(format!("{}. {}", question_num, es.question))],
                &es.page,
            )));
            question_num += 1;
        }
    }
}

fn teacher_section(tg: &TeacherGuide, out: &mut Vec<Block>) {
    if let Some(key) = tg.answer_key.as_deref().filter(|k| !k.trim().is_empty()) {
        out.push(Block::Heading1(ANSWER_KEY.into()));
        for line in key.lines().filter(|l| !l.trim().is_empty()) {
            out.push(Block::Paragraph(vec![Span::plain(line.trim())]));
        }
    }

    if !tg.explanations.is_empty() {
        out.push(Block::Heading1(EXPLANATIONS.into()));
        for exp in &tg.explanations {
            out.push(Block::Paragraph(with_cite(
                vec![
                    Span::bold(format!("Question {}: ", exp.question_num)),
                    Span::plain(&exp.explanation),
                ],
                &exp.page,
            )));
        }
    }

    if !tg.rubric.is_empty() {
        out.push(Block::Heading1(RUBRIC.into()));
        for r in &tg.rubric {
            out.push(Block::Paragraph(vec![Span::bold(format!("[{}]", r.question))]));
            out.push(Block::Paragraph(vec![Span::plain(format!("High: {}", r.high))]));
            out.push(Block::Paragraph(vec![Span::plain(format!("Mid: {}", r.mid))]));
            out.push(Block::Paragraph(vec![Span::plain(format!("Low: {}", r.low))]));
        }
    }

    if !tg.feedback_tips.is_empty() {
        out.push(Block::Heading1(FEEDBACK.into()));
        for tip in &tg.feedback_tips {
            out.push(Block::Paragraph(vec![
                Span::toned(format!("[{}] ", tip.misconception), Tone::Alert),
                Span::plain(&tip.feedback),
            ]));
        }
    }
}

fn quality_section(qc: &QualityCheck, out: &mut Vec<Block>) {
    out.push(Block::Rule);
    out.push(Block::Heading1(QUALITY_HEADING.into()));
    for (label, passed) in qc.items() {
        let (icon, tone) = if passed {
            ("✓ ", Tone::Success)
        } else {
            ("✗ ", Tone::Alert)
        };
        out.push(Block::Paragraph(vec![
            Span::toned(icon, tone),
            Span::plain(label),
        ]));
    }
}
