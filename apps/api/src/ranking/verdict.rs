//! Verdict data model: validation of untrusted classifier output, the
//! fallback verdict, priority assignment and the interview split.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::classifier::RawVerdict;
use crate::models::ranking::{InterviewSplit, NewRanking, RankingWithCandidate};

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;
pub const FALLBACK_REASONING: &str = "Could not be evaluated by AI — please re-run ranking.";
pub const DEFAULT_CRITERIA: &str = "Software Engineering Position";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictOrigin {
    FirstPass,
    RetryPass,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub candidate_id: Uuid,
    pub score: i32,
    pub reasoning: String,
    pub should_interview: bool,
    pub origin: VerdictOrigin,
}

impl Verdict {
    /// Zero-confidence verdict for a candidate the classifier never covered.
    pub fn fallback(candidate_id: Uuid) -> Self {
        Self {
            candidate_id,
            score: MIN_SCORE,
            reasoning: FALLBACK_REASONING.to_string(),
            should_interview: false,
            origin: VerdictOrigin::Fallback,
        }
    }
}

/// Why a raw verdict was rejected. A rejected verdict counts as absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerdictDefect {
    #[error("verdict is not a JSON object")]
    NotAnObject,
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("candidate id '{0}' is not a UUID")]
    InvalidId(String),
    #[error("unparseable score {0}")]
    InvalidScore(String),
    #[error("interview flag is not a boolean")]
    InvalidInterviewFlag,
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| obj.get(*name))
        .filter(|v| !v.is_null())
}

fn parse_score(value: &Value) -> Result<i32, VerdictDefect> {
    let raw = match value {
        Value::Number(n) => n
            .as_i64()
            .map(|i| i as f64)
            .or_else(|| n.as_f64())
            .filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
    .ok_or_else(|| VerdictDefect::InvalidScore(value.to_string()))?;

    Ok(raw.round().clamp(MIN_SCORE as f64, MAX_SCORE as f64) as i32)
}

fn parse_flag(value: &Value) -> Result<bool, VerdictDefect> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(VerdictDefect::InvalidInterviewFlag),
    }
}

/// Validates one raw verdict. Scores are rounded and clamped to
/// `MIN_SCORE..=MAX_SCORE`; anything else malformed is a defect.
pub fn parse_verdict(raw: &RawVerdict, origin: VerdictOrigin) -> Result<Verdict, VerdictDefect> {
    let obj = raw.as_object().ok_or(VerdictDefect::NotAnObject)?;

    let id = field(obj, &["id", "candidateId", "candidate_id"])
        .ok_or(VerdictDefect::MissingField("id"))?;
    let id_text = id.as_str().ok_or_else(|| VerdictDefect::InvalidId(id.to_string()))?;
    let candidate_id =
        Uuid::parse_str(id_text.trim()).map_err(|_| VerdictDefect::InvalidId(id_text.to_string()))?;

    let score = parse_score(field(obj, &["score"]).ok_or(VerdictDefect::MissingField("score"))?)?;

    let reasoning = field(obj, &["reasoning"])
        .and_then(Value::as_str)
        .ok_or(VerdictDefect::MissingField("reasoning"))?
        .trim()
        .to_string();

    let should_interview = parse_flag(
        field(obj, &["shouldInterview", "should_interview"])
            .ok_or(VerdictDefect::MissingField("shouldInterview"))?,
    )?;

    Ok(Verdict {
        candidate_id,
        score,
        reasoning,
        should_interview,
        origin,
    })
}

/// Priority is the verdict's position: 1 for the first, no gaps, no repeats.
pub fn assign_priorities(verdicts: &[Verdict]) -> Vec<NewRanking> {
    verdicts
        .iter()
        .enumerate()
        .map(|(i, v)| NewRanking {
            candidate_id: v.candidate_id,
            score: v.score,
            reasoning: v.reasoning.clone(),
            should_interview: v.should_interview,
            priority: i as i32 + 1,
        })
        .collect()
}

/// Empty or blank criteria fall back to the generic position label.
pub fn resolve_criteria(criteria: Option<&str>) -> String {
    criteria
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CRITERIA)
        .to_string()
}

/// Partitions every ranking into exactly one list: interviewees by ascending
/// priority, the rest by descending score (ties by priority).
pub fn split_by_interview(rankings: Vec<RankingWithCandidate>) -> InterviewSplit {
    let (mut should_interview, mut should_not_interview): (Vec<_>, Vec<_>) = rankings
        .into_iter()
        .partition(|r| r.ranking.should_interview);

    should_interview.sort_by_key(|r| r.ranking.priority);
    should_not_interview.sort_by(|a, b| {
        b.ranking
            .score
            .cmp(&a.ranking.score)
            .then(a.ranking.priority.cmp(&b.ranking.priority))
    });

    InterviewSplit {
        should_interview,
        should_not_interview,
    }
}
