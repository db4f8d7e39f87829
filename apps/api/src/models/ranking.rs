use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::candidate::CandidateWithSkills;

/// One verdict inside one committed ranking epoch.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    pub id: Uuid,
    pub epoch_id: i64,
    pub candidate_id: Uuid,
    pub score: i32,
    pub reasoning: String,
    pub criteria: String,
    pub should_interview: bool,
    /// 1 is the best candidate of the epoch; values form a permutation of 1..=N.
    pub priority: i32,
    pub ranked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingWithCandidate {
    #[serde(flatten)]
    pub ranking: RankingRow,
    pub candidate: CandidateWithSkills,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRanking {
    pub candidate_id: Uuid,
    pub score: i32,
    pub reasoning: String,
    pub should_interview: bool,
    pub priority: i32,
}

/// A fully reconciled ranking run, ready to replace the current epoch.
#[derive(Debug, Clone)]
pub struct NewEpoch {
    pub criteria: String,
    pub rankings: Vec<NewRanking>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSplit {
    /// Ascending priority.
    pub should_interview: Vec<RankingWithCandidate>,
    /// Descending score.
    pub should_not_interview: Vec<RankingWithCandidate>,
}
