//! Survey answer schema and validation
//!
//! Validation runs in two stages:
//! 1. Field checks: presence, type, enum membership, trimmed length.
//! 2. Cross-field check: `q1 == "yes"` requires a `q1_follow` answer.
//!
//! A submission with field problems still gets the cross-field check when
//! `q1` parsed and `q1_follow` had no problem of its own, so one failure names
//! every rejected field.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum characters in `q1_follow` after trimming
pub const Q1_FOLLOW_MAX_CHARS: usize = 120;

/// Maximum characters in `q15` after trimming
pub const Q15_MAX_CHARS: usize = 2000;

/// Keys of the thirteen Likert-scale questions, in question order
pub const LIKERT_KEYS: [&str; 13] = [
    "q2", "q3", "q4", "q5", "q6", "q7", "q8", "q9", "q10", "q11", "q12", "q13", "q14",
];

/// Five-point agreement scale used by q2..q14
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Likert {
    #[serde(rename = "Strongly Disagree")]
    StronglyDisagree,
    Disagree,
    Neutral,
    Agree,
    #[serde(rename = "Strongly Agree")]
    StronglyAgree,
}

impl Likert {
    pub const ALL: [Likert; 5] = [
        Likert::StronglyDisagree,
        Likert::Disagree,
        Likert::Neutral,
        Likert::Agree,
        Likert::StronglyAgree,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Likert::StronglyDisagree => "Strongly Disagree",
            Likert::Disagree => "Disagree",
            Likert::Neutral => "Neutral",
            Likert::Agree => "Agree",
            Likert::StronglyAgree => "Strongly Agree",
        }
    }

    /// Exact, case-sensitive label match
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == label)
    }
}

impl fmt::Display for Likert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer to q1 ("have you programmed before?")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Experience {
    Yes,
    No,
}

impl Experience {
    pub fn as_str(self) -> &'static str {
        match self {
            Experience::Yes => "yes",
            Experience::No => "no",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "yes" => Some(Experience::Yes),
            "no" => Some(Experience::No),
            _ => None,
        }
    }
}

/// A validated, normalized answer set
///
/// Serializes to exactly the schema keys (`q1`, `q1_follow`, `q2`..`q14`,
/// `q15`); this serialization is what gets stored as `raw_json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyAnswers {
    pub q1: Experience,
    pub q1_follow: Option<String>,
    pub q2: Likert,
    pub q3: Likert,
    pub q4: Likert,
    pub q5: Likert,
    pub q6: Likert,
    pub q7: Likert,
    pub q8: Likert,
    pub q9: Likert,
    pub q10: Likert,
    pub q11: Likert,
    pub q12: Likert,
    pub q13: Likert,
    pub q14: Likert,
    pub q15: Option<String>,
}

impl SurveyAnswers {
    /// q2..q14 in question order
    pub fn likert(&self) -> [Likert; 13] {
        [
            self.q2, self.q3, self.q4, self.q5, self.q6, self.q7, self.q8, self.q9, self.q10,
            self.q11, self.q12, self.q13, self.q14,
        ]
    }
}

/// Why a single field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldIssue {
    Required,
    InvalidEnumValue,
    ExpectedString,
    TooLong { max: usize },
    RequiredWhenExperienced,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::Required => f.write_str("required"),
            FieldIssue::InvalidEnumValue => f.write_str("invalid enum value"),
            FieldIssue::ExpectedString => f.write_str("expected string"),
            FieldIssue::TooLong { max } => write!(f, "too long (max {} characters)", max),
            FieldIssue::RequiredWhenExperienced => {
                f.write_str("q1_follow is required when q1 is yes")
            }
        }
    }
}

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub issue: FieldIssue,
}

/// Aggregated validation failure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    /// Problems with the request as a whole (not an object, bad JSON)
    pub form_errors: Vec<String>,
    pub field_errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn form(message: impl Into<String>) -> Self {
        Self {
            form_errors: vec![message.into()],
            field_errors: Vec::new(),
        }
    }

    fn push(&mut self, field: &str, issue: FieldIssue) {
        self.field_errors.push(FieldError {
            field: field.to_string(),
            issue,
        });
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.field_errors.iter().any(|e| e.field == field)
    }

    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    /// Names of every rejected field, in detection order
    pub fn fields(&self) -> Vec<&str> {
        self.field_errors.iter().map(|e| e.field.as_str()).collect()
    }

    /// Client-facing breakdown: `{formErrors: [..], fieldErrors: {field: [..]}}`
    pub fn details(&self) -> Value {
        let mut by_field: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for err in &self.field_errors {
            by_field
                .entry(err.field.as_str())
                .or_default()
                .push(err.issue.to_string());
        }
        json!({
            "formErrors": self.form_errors,
            "fieldErrors": by_field,
        })
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.form_errors.clone();
        parts.extend(
            self.field_errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.issue)),
        );
        write!(f, "validation failed: {}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate an arbitrary JSON value as a survey submission
pub fn validate(input: &Value) -> Result<SurveyAnswers, ValidationErrors> {
    let answers = check_fields(input)?;
    check_conditional(answers)
}

/// Stage 1: per-field checks, aggregated
///
/// Unknown keys are ignored and never reach the normalized answers. When
/// any field fails, the follow-up rule is folded into the same failure.
pub fn check_fields(input: &Value) -> Result<SurveyAnswers, ValidationErrors> {
    let Some(obj) = input.as_object() else {
        return Err(ValidationErrors::form("Expected a JSON object"));
    };

    let mut errors = ValidationErrors::default();

    let q1 = enum_field(obj, "q1", Experience::parse, &mut errors);
    let q1_follow = text_field(obj, "q1_follow", Q1_FOLLOW_MAX_CHARS, &mut errors);
    let likert: Vec<Option<Likert>> = LIKERT_KEYS
        .iter()
        .map(|key| enum_field(obj, key, Likert::parse, &mut errors))
        .collect();
    let q15 = text_field(obj, "q15", Q15_MAX_CHARS, &mut errors);

    if !errors.is_empty() {
        if let Some(q1) = q1 {
            if !errors.has_field("q1_follow") {
                if let Some(issue) = follow_up_issue(q1, q1_follow.as_deref()) {
                    errors.push("q1_follow", issue);
                }
            }
        }
        return Err(errors);
    }

    // Every field passed, so each Option above is populated
    let likert: Vec<Likert> = likert.into_iter().flatten().collect();
    match (q1, <[Likert; 13]>::try_from(likert)) {
        (Some(q1), Ok(lk)) => Ok(SurveyAnswers {
            q1,
            q1_follow,
            q2: lk[0],
            q3: lk[1],
            q4: lk[2],
            q5: lk[3],
            q6: lk[4],
            q7: lk[5],
            q8: lk[6],
            q9: lk[7],
            q10: lk[8],
            q11: lk[9],
            q12: lk[10],
            q13: lk[11],
            q14: lk[12],
            q15,
        }),
        _ => Err(ValidationErrors::form("Incomplete answer set")),
    }
}

/// Stage 2: cross-field rule
///
/// Only the yes-without-follow direction is rejected; a "no" answer that
/// still carries `q1_follow` is kept as submitted.
pub fn check_conditional(answers: SurveyAnswers) -> Result<SurveyAnswers, ValidationErrors> {
    if let Some(issue) = follow_up_issue(answers.q1, answers.q1_follow.as_deref()) {
        let mut errors = ValidationErrors::default();
        errors.push("q1_follow", issue);
        return Err(errors);
    }
    Ok(answers)
}

fn follow_up_issue(q1: Experience, q1_follow: Option<&str>) -> Option<FieldIssue> {
    match (q1, q1_follow) {
        (Experience::Yes, None) => Some(FieldIssue::RequiredWhenExperienced),
        _ => None,
    }
}

fn enum_field<T>(
    obj: &Map<String, Value>,
    key: &str,
    parse: fn(&str) -> Option<T>,
    errors: &mut ValidationErrors,
) -> Option<T> {
    match obj.get(key) {
        None | Some(Value::Null) => {
            errors.push(key, FieldIssue::Required);
            None
        }
        Some(Value::String(s)) => {
            let parsed = parse(s);
            if parsed.is_none() {
                errors.push(key, FieldIssue::InvalidEnumValue);
            }
            parsed
        }
        Some(_) => {
            errors.push(key, FieldIssue::InvalidEnumValue);
            None
        }
    }
}

/// Optional free text: trimmed, length-checked, empty normalized to None
fn text_field(
    obj: &Map<String, Value>,
    key: &str,
    max_chars: usize,
    errors: &mut ValidationErrors,
) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.chars().count() > max_chars {
                errors.push(key, FieldIssue::TooLong { max: max_chars });
                None
            } else if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(_) => {
            errors.push(key, FieldIssue::ExpectedString);
            None
        }
    }
}
