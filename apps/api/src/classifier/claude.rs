use async_trait::async_trait;
use tracing::info;

use crate::classifier::prompts::{
    CV_PROMPT_TEMPLATE, PROFILES_PROMPT_TEMPLATE, RANKING_PROMPT_TEMPLATE,
};
use crate::classifier::{
    CandidateProfile, CandidateSummary, ClassifierGateway, GeneratedCv, RawVerdict,
};
use crate::errors::AppError;
use crate::llm_client::prompts::{JSON_ARRAY_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{LlmClient, Prompt};

const PROFILES_MAX_TOKENS: u32 = 4096;
const CV_MAX_TOKENS: u32 = 2000;
const RANKING_BASE_TOKENS: u32 = 512;
const RANKING_TOKENS_PER_CANDIDATE: u32 = 160;
const RANKING_MAX_TOKENS: u32 = 8192;

/// `ClassifierGateway` backed by Claude through `LlmClient`.
pub struct ClaudeClassifier {
    llm: LlmClient,
    cv_language: String,
}

impl ClaudeClassifier {
    pub fn new(llm: LlmClient, cv_language: String) -> Self {
        Self { llm, cv_language }
    }
}

pub fn build_profiles_prompt(count: u32) -> String {
    PROFILES_PROMPT_TEMPLATE
        .replace("{count}", &count.to_string())
        .replace("{json_array_instruction}", JSON_ARRAY_INSTRUCTION)
}

pub fn build_cv_prompt(profile: &CandidateProfile, language: &str) -> String {
    CV_PROMPT_TEMPLATE
        .replace("{language}", language)
        .replace("{name}", &profile.full_name())
        .replace("{years}", &profile.years_of_exp.to_string())
        .replace("{skills}", &profile.skills.join(", "))
}

pub fn build_ranking_prompt(
    candidates: &[CandidateSummary],
    criteria: &str,
) -> Result<String, AppError> {
    let candidates_json = serde_json::to_string_pretty(candidates)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize candidates: {e}")))?;

    Ok(RANKING_PROMPT_TEMPLATE
        .replace("{criteria}", criteria)
        .replace("{candidates_json}", &candidates_json)
        .replace("{json_array_instruction}", JSON_ARRAY_INSTRUCTION))
}

/// The verdict list grows with the population.
fn ranking_token_budget(candidates: usize) -> u32 {
    let per = RANKING_TOKENS_PER_CANDIDATE.saturating_mul(candidates as u32);
    RANKING_BASE_TOKENS
        .saturating_add(per)
        .min(RANKING_MAX_TOKENS)
}

#[async_trait]
impl ClassifierGateway for ClaudeClassifier {
    fn model_id(&self) -> &str {
        self.llm.model()
    }

    async fn generate_profiles(&self, count: u32) -> Result<Vec<CandidateProfile>, AppError> {
        let prompt = build_profiles_prompt(count);
        info!(count, "Requesting candidate profiles");

        self.llm
            .complete_json::<Vec<CandidateProfile>>(Prompt {
                system: Some(JSON_ONLY_SYSTEM),
                user: &prompt,
                max_tokens: PROFILES_MAX_TOKENS,
            })
            .await
            .map_err(|e| AppError::Classifier(format!("Profile generation failed: {e}")))
    }

    async fn generate_cv(&self, profile: &CandidateProfile) -> Result<GeneratedCv, AppError> {
        let prompt = build_cv_prompt(profile, &self.cv_language);
        info!(name = %profile.full_name(), "Generating CV");

        let content = self
            .llm
            .complete_text(Prompt {
                system: None,
                user: &prompt,
                max_tokens: CV_MAX_TOKENS,
            })
            .await
            .map_err(|e| AppError::Classifier(format!("CV generation failed: {e}")))?;

        Ok(GeneratedCv { content, prompt })
    }

    async fn rank_candidates(
        &self,
        candidates: &[CandidateSummary],
        criteria: &str,
    ) -> Result<Vec<RawVerdict>, AppError> {
        let prompt = build_ranking_prompt(candidates, criteria)?;
        info!(candidates = candidates.len(), criteria, "Requesting ranking verdicts");

        self.llm
            .complete_json::<Vec<RawVerdict>>(Prompt {
                system: Some(JSON_ONLY_SYSTEM),
                user: &prompt,
                max_tokens: ranking_token_budget(candidates.len()),
            })
            .await
            .map_err(|e| AppError::Classifier(format!("Ranking call failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_ranking_prompt_carries_ids_and_criteria() {
        let id = Uuid::new_v4();
        let candidates = vec![CandidateSummary {
            id,
            name: "Maya Katz".to_string(),
            experience: 6,
            skills: vec!["Rust".to_string(), "Kafka".to_string()],
        }];
        let prompt = build_ranking_prompt(&candidates, "Backend Engineer").unwrap();
        assert!(prompt.contains(&id.to_string()));
        assert!(prompt.contains("\"Backend Engineer\""));
        assert!(prompt.contains("Kafka"));
        assert!(!prompt.contains("{candidates_json}"));
        assert!(!prompt.contains("{json_array_instruction}"));
    }

    #[test]
    fn test_profiles_prompt_demands_heterogeneous_batch() {
        let prompt = build_profiles_prompt(4);
        assert!(prompt.contains("Invent 4 fictional"));
        assert!(prompt.contains("at least one clearly strong"));
        assert!(prompt.contains("at least one clearly weak"));
    }

    #[test]
    fn test_cv_prompt_uses_language_and_profile() {
        let profile = CandidateProfile {
            first_name: "Omer".to_string(),
            last_name: "Bar".to_string(),
            email: "omer@example.com".to_string(),
            phone: None,
            years_of_exp: 9,
            skills: vec!["Java".to_string(), "Spring".to_string()],
        };
        let prompt = build_cv_prompt(&profile, "Hebrew");
        assert!(prompt.contains("CV in Hebrew"));
        assert!(prompt.contains("Omer Bar"));
        assert!(prompt.contains("Years of experience: 9"));
        assert!(prompt.contains("Java, Spring"));
    }

    #[test]
    fn test_ranking_token_budget_is_capped() {
        assert_eq!(ranking_token_budget(0), RANKING_BASE_TOKENS);
        assert_eq!(ranking_token_budget(10), 512 + 1600);
        assert_eq!(ranking_token_budget(10_000), RANKING_MAX_TOKENS);
    }
}
