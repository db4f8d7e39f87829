use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::ranking::RankingRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Unique across the store, compared case-insensitively.
    pub email: String,
    pub phone: Option<String>,
    pub years_of_exp: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CandidateRow {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SkillRow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CvRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub content: String,
    pub prompt: String,
    pub generated_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateWithSkills {
    #[serde(flatten)]
    pub candidate: CandidateRow,
    pub skills: Vec<SkillRow>,
}

impl CandidateWithSkills {
    pub fn skill_names(&self) -> Vec<String> {
        self.skills.iter().map(|s| s.name.clone()).collect()
    }
}

/// Row shape for the paginated candidate list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateListItem {
    #[serde(flatten)]
    pub candidate: CandidateRow,
    pub skills: Vec<SkillRow>,
    /// "The CV" for display purposes: the newest one.
    pub latest_cv: Option<CvRow>,
    pub current_ranking: Option<RankingRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDetail {
    #[serde(flatten)]
    pub candidate: CandidateRow,
    pub skills: Vec<SkillRow>,
    /// Newest first.
    pub cvs: Vec<CvRow>,
    pub current_ranking: Option<RankingRow>,
}

#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub years_of_exp: i32,
}

#[derive(Debug, Clone)]
pub struct NewCv {
    pub candidate_id: Uuid,
    pub content: String,
    pub prompt: String,
    pub generated_by: String,
}
