//! Scripted `ClassifierGateway` for tests: every call pops the next scripted
//! response, so a test states exactly what each pass returns.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::classifier::{
    CandidateProfile, CandidateSummary, ClassifierGateway, GeneratedCv, RawVerdict,
};
use crate::errors::AppError;

type RankPass =
    Box<dyn Fn(&[CandidateSummary]) -> Result<Vec<RawVerdict>, AppError> + Send + Sync>;

pub const SCRIPTED_MODEL: &str = "scripted-model";

#[derive(Default)]
pub struct ScriptedClassifier {
    profile_batches: Mutex<VecDeque<Result<Vec<CandidateProfile>, AppError>>>,
    rank_passes: Mutex<VecDeque<RankPass>>,
    /// `generate_cv` fails once this many CVs were produced.
    cv_fail_after: Option<usize>,
    rank_calls: AtomicUsize,
    cv_calls: AtomicUsize,
    criteria_seen: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(self, profiles: Vec<CandidateProfile>) -> Self {
        self.profile_batches.lock().unwrap().push_back(Ok(profiles));
        self
    }

    pub fn with_profile_error(self, message: &str) -> Self {
        self.profile_batches
            .lock()
            .unwrap()
            .push_back(Err(AppError::Classifier(message.to_string())));
        self
    }

    pub fn with_rank_pass<F>(self, pass: F) -> Self
    where
        F: Fn(&[CandidateSummary]) -> Result<Vec<RawVerdict>, AppError> + Send + Sync + 'static,
    {
        self.rank_passes.lock().unwrap().push_back(Box::new(pass));
        self
    }

    /// A pass that scores every candidate, best first in fetch order.
    pub fn with_full_rank_pass(self) -> Self {
        self.with_rank_pass(|candidates| {
            Ok(candidates
                .iter()
                .enumerate()
                .map(|(i, c)| verdict(c.id, 90 - i as i64, true))
                .collect())
        })
    }

    pub fn with_rank_error(self, message: &'static str) -> Self {
        self.with_rank_pass(move |_| Err(AppError::Classifier(message.to_string())))
    }

    pub fn failing_cv_after(mut self, successes: usize) -> Self {
        self.cv_fail_after = Some(successes);
        self
    }

    pub fn rank_calls(&self) -> usize {
        self.rank_calls.load(Ordering::SeqCst)
    }

    pub fn criteria_seen(&self) -> Vec<String> {
        self.criteria_seen.lock().unwrap().clone()
    }
}

/// A well-formed verdict object as the real classifier would return it.
pub fn verdict(id: Uuid, score: i64, should_interview: bool) -> RawVerdict {
    json!({
        "id": id.to_string(),
        "score": score,
        "reasoning": format!("scored {score}"),
        "shouldInterview": should_interview,
    })
}

pub fn profile(first: &str, last: &str, email: &str, skills: &[&str]) -> CandidateProfile {
    CandidateProfile {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: email.to_string(),
        phone: Some("050-000-0000".to_string()),
        years_of_exp: 4,
        skills: skills.iter().map(|s| s.to_string()).collect(),
    }
}

#[async_trait]
impl ClassifierGateway for ScriptedClassifier {
    fn model_id(&self) -> &str {
        SCRIPTED_MODEL
    }

    async fn generate_profiles(&self, _count: u32) -> Result<Vec<CandidateProfile>, AppError> {
        self.profile_batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Classifier("no scripted profiles".to_string())))
    }

    async fn generate_cv(&self, profile: &CandidateProfile) -> Result<GeneratedCv, AppError> {
        let calls = self.cv_calls.fetch_add(1, Ordering::SeqCst);
        if self.cv_fail_after.is_some_and(|limit| calls >= limit) {
            return Err(AppError::Classifier("scripted CV failure".to_string()));
        }
        Ok(GeneratedCv {
            content: format!("# {}\n\n{} years", profile.full_name(), profile.years_of_exp),
            prompt: format!("cv for {}", profile.full_name()),
        })
    }

    async fn rank_candidates(
        &self,
        candidates: &[CandidateSummary],
        criteria: &str,
    ) -> Result<Vec<RawVerdict>, AppError> {
        self.rank_calls.fetch_add(1, Ordering::SeqCst);
        self.criteria_seen.lock().unwrap().push(criteria.to_string());
        let pass = self.rank_passes.lock().unwrap().pop_front();
        match pass {
            Some(pass) => pass(candidates),
            None => Err(AppError::Classifier("no scripted ranking pass".to_string())),
        }
    }
}
