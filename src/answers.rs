//! Named-entity answer check.
//!
//! For a few picked queries, the evidence sentences of the judged documents
//! are sent to an LLM, which extracts the entities of the query's
//! `answer_type` and says which of the `exact_answers` occur in the text.

use crate::error::{EvalError, Result};
use crate::gold::{GoldStandard, Query};
use crate::llm::Completion;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

/// Maximum number of characters of evidence sent per query.
pub const SUPPORT_TEXT_LIMIT: usize = 6000;

const TRUNCATION_MARKER: &str = "\n...[truncated]...";

const SYSTEM_PROMPT: &str = "You are an information extraction assistant. \
Return ONLY valid JSON, without markdown.";

/// Upper-cased answer type label (`PERSON`, `GPE`, `DATE`...). A missing or
/// non-text value gives an empty label.
pub fn normalize_answer_type(raw: Option<&Value>) -> String {
    raw.and_then(Value::as_str)
        .map(|t| t.trim().to_uppercase())
        .unwrap_or_default()
}

/// The expected answers of a query as text.
pub fn exact_answers(query: &Query) -> Vec<String> {
    match &query.exact_answers {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Evidence sentences of every judged document, one paragraph per document,
/// cut to `max_chars` characters.
pub fn supporting_text(query: &Query, max_chars: usize) -> String {
    let parts: Vec<String> = query
        .matches
        .iter()
        .filter_map(|m| {
            let sentences: Vec<&str> = m
                .evidence
                .get("sentences")
                .and_then(Value::as_array)?
                .iter()
                .filter_map(Value::as_str)
                .collect();
            (!sentences.is_empty())
                .then(|| format!("[DocID {}] {}", m.docid, sentences.join(" ")))
        })
        .collect();

    let text = parts.join("\n\n").trim().to_string();
    if text.chars().count() > max_chars {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push_str(TRUNCATION_MARKER);
        cut
    } else {
        text
    }
}

/// Prompt asking for the entities of `answer_type` in `text`.
pub fn build_prompt(answer_type: &str, exact_answers: &[String], text: &str) -> String {
    format!(
        r#"Task:
1) Extract all named entities of type {answer_type} from the text.
2) Return ONLY valid JSON (no markdown).
3) JSON schema:
{{
  "entities": ["..."],
  "matches_exact_answers": true/false,
  "matched_answers": ["..."]
}}

Rules:
- "entities" must be unique strings in order of appearance.
- "matched_answers" should include items from exact_answers that appear in the text (case-insensitive substring match is OK).
- matches_exact_answers is true iff matched_answers is non-empty.

exact_answers: {answers}

TEXT:
{text}
"#,
        answer_type = answer_type,
        answers = Value::from(exact_answers.to_vec()),
        text = text,
    )
}

/// Entities reported by the LLM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityReply {
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub matches_exact_answers: bool,
    #[serde(default)]
    pub matched_answers: Vec<String>,
}

/// Parse an LLM reply, falling back to the outermost `{...}` block when the
/// model wrapped its JSON in prose or code fences.
pub fn parse_reply(text: &str) -> Result<EntityReply> {
    if let Ok(reply) = serde_json::from_str(text.trim()) {
        return Ok(reply);
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&text[start..=end])
            .map_err(|e| EvalError::MalformedReply(e.to_string())),
        _ => Err(EvalError::MalformedReply(
            "reply is not JSON and holds no JSON object".to_string(),
        )),
    }
}

/// Result of checking one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// No judged document carries evidence sentences; nothing was sent.
    NoSupport,
    /// The reply parsed. `auto_correct` is set when at least one exact
    /// answer was matched.
    Checked { reply: EntityReply, auto_correct: bool },
    /// The reply held no usable JSON.
    Unparsable { raw: String, error: String },
}

/// One row of the answer check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerCheck {
    pub number: u32,
    pub original_query: String,
    pub answer_type: String,
    pub exact_answers: Vec<String>,
    pub support_chars: usize,
    #[serde(flatten)]
    pub outcome: AnswerOutcome,
}

impl AnswerCheck {
    pub fn auto_correct(&self) -> bool {
        matches!(
            self.outcome,
            AnswerOutcome::Checked {
                auto_correct: true,
                ..
            }
        )
    }
}

impl fmt::Display for AnswerCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Q{}: {}", self.number, self.original_query)?;
        writeln!(f, "answer_type: {}", self.answer_type)?;
        writeln!(f, "exact_answers: {:?}", self.exact_answers)?;
        writeln!(f, "supporting_text_chars: {}", self.support_chars)?;

        match &self.outcome {
            AnswerOutcome::NoSupport => write!(
                f,
                "No supporting sentences in the gold standard for this query. Skipped."
            ),
            AnswerOutcome::Checked {
                reply,
                auto_correct,
            } => {
                writeln!(f, "Entities: {:?}", reply.entities)?;
                writeln!(f, "Matched answers: {:?}", reply.matched_answers)?;
                writeln!(f, "matches_exact_answers: {}", reply.matches_exact_answers)?;
                write!(f, "Auto-judgement (has matched answer): {}", auto_correct)
            }
            AnswerOutcome::Unparsable { raw, error } => {
                writeln!(f, "Unparsable reply: {}", error)?;
                write!(f, "RAW OUTPUT:\n{}", raw)
            }
        }
    }
}

/// Runs the answer check over picked gold-standard queries.
pub struct AnswerChecker<'a> {
    gold: &'a GoldStandard,
    llm: &'a dyn Completion,
    max_chars: usize,
}

impl<'a> AnswerChecker<'a> {
    pub fn new(gold: &'a GoldStandard, llm: &'a dyn Completion) -> Self {
        Self {
            gold,
            llm,
            max_chars: SUPPORT_TEXT_LIMIT,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Resolve every picked number before any LLM call.
    fn select(&self, pick: &[u32]) -> Result<Vec<&'a Query>> {
        if pick.is_empty() {
            return Err(EvalError::InvalidConfig(
                "At least one query number must be picked".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        pick.iter()
            .filter(|&&n| seen.insert(n))
            .map(|&n| {
                self.gold
                    .get(n)
                    .ok_or_else(|| EvalError::unknown_query(n, "picked for the answer check"))
            })
            .collect()
    }

    /// Check the picked queries in order. LLM API failures abort the run;
    /// an unparsable reply is recorded and the run continues.
    pub async fn check(&self, pick: &[u32]) -> Result<Vec<AnswerCheck>> {
        let queries = self.select(pick)?;
        let mut checks = Vec::with_capacity(queries.len());

        for query in queries {
            let answer_type = normalize_answer_type(query.answer_type.as_ref());
            let exact_answers = exact_answers(query);
            let text = supporting_text(query, self.max_chars);

            let outcome = if text.is_empty() {
                info!(query = query.number, "No supporting sentences, skipping");
                AnswerOutcome::NoSupport
            } else {
                let prompt = build_prompt(&answer_type, &exact_answers, &text);
                let raw = self.llm.complete(Some(SYSTEM_PROMPT), &prompt).await?;
                match parse_reply(&raw) {
                    Ok(reply) => {
                        let auto_correct = !reply.matched_answers.is_empty();
                        AnswerOutcome::Checked {
                            reply,
                            auto_correct,
                        }
                    }
                    Err(e) => {
                        warn!(query = query.number, error = %e, "Unparsable LLM reply");
                        AnswerOutcome::Unparsable {
                            raw,
                            error: e.to_string(),
                        }
                    }
                }
            };

            checks.push(AnswerCheck {
                number: query.number,
                original_query: query.original_query.clone().unwrap_or_default(),
                answer_type,
                exact_answers,
                support_chars: text.chars().count(),
                outcome,
            });
        }

        Ok(checks)
    }
}
