//! Classifier Gateway: the capability boundary around the external LLM.
//!
//! Pure request/response: no retries, no reconciliation. Callers get raw
//! verdicts back and decide what to trust. `AppState` carries an
//! `Arc<dyn ClassifierGateway>`; tests swap in `scripted::ScriptedClassifier`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::CandidateWithSkills;

pub mod claude;
pub mod prompts;
#[cfg(test)]
pub mod scripted;

pub const MAX_YEARS_OF_EXP: i32 = 20;
pub const MAX_PROFILE_SKILLS: usize = 8;

/// A candidate invented by the classifier. The email is only best-effort unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub years_of_exp: i32,
    pub skills: Vec<String>,
}

impl CandidateProfile {
    /// Trims text fields, clamps experience to 0..=20 and dedups skills
    /// case-insensitively (first spelling wins, at most eight kept).
    pub fn normalized(self) -> Self {
        let mut skills: Vec<String> = Vec::with_capacity(self.skills.len());
        for skill in self.skills {
            let skill = skill.trim().to_string();
            if skill.is_empty() || skills.iter().any(|s| s.eq_ignore_ascii_case(&skill)) {
                continue;
            }
            skills.push(skill);
        }
        skills.truncate(MAX_PROFILE_SKILLS);

        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            years_of_exp: self.years_of_exp.clamp(0, MAX_YEARS_OF_EXP),
            skills,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// What the classifier sees of a candidate when ranking.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    pub id: Uuid,
    pub name: String,
    pub experience: i32,
    pub skills: Vec<String>,
}

impl From<&CandidateWithSkills> for CandidateSummary {
    fn from(c: &CandidateWithSkills) -> Self {
        Self {
            id: c.candidate.id,
            name: c.candidate.full_name(),
            experience: c.candidate.years_of_exp,
            skills: c.skill_names(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedCv {
    pub content: String,
    /// The prompt that produced `content`, stored alongside the CV.
    pub prompt: String,
}

/// One untrusted verdict object, validated by `ranking::verdict`.
pub type RawVerdict = serde_json::Value;

#[async_trait]
pub trait ClassifierGateway: Send + Sync {
    /// Identifier recorded on every generated CV.
    fn model_id(&self) -> &str;

    async fn generate_profiles(&self, count: u32) -> Result<Vec<CandidateProfile>, AppError>;

    async fn generate_cv(&self, profile: &CandidateProfile) -> Result<GeneratedCv, AppError>;

    async fn rank_candidates(
        &self,
        candidates: &[CandidateSummary],
        criteria: &str,
    ) -> Result<Vec<RawVerdict>, AppError>;
}
