//! Batch Generation Pipeline.
//!
//! Per profile: resolve identity -> persist candidate + skills -> generate CV
//! -> persist CV -> record. Any failure aborts the batch and removes every
//! candidate the batch already wrote.

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::classifier::{CandidateProfile, ClassifierGateway};
use crate::errors::AppError;
use crate::generation::identity::IdentityResolver;
use crate::models::candidate::{CandidateRow, CvRow, NewCandidate, NewCv};
use crate::store::CandidateStore;

pub const MIN_BATCH_SIZE: u32 = 1;
pub const MAX_BATCH_SIZE: u32 = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub candidate_id: Uuid,
    pub name: String,
    pub cv_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGenerationResult {
    pub generated: usize,
    pub candidates: Vec<GenerationRecord>,
}

/// Persists one candidate with its skills and a freshly generated CV.
/// If anything after the candidate insert fails, the candidate is removed
/// again before the error is returned.
pub async fn create_with_cv(
    store: &dyn CandidateStore,
    classifier: &dyn ClassifierGateway,
    profile: &CandidateProfile,
) -> Result<(CandidateRow, CvRow), AppError> {
    let candidate = store
        .create_candidate(&NewCandidate {
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            years_of_exp: profile.years_of_exp,
        })
        .await?;

    match attach_skills_and_cv(store, classifier, candidate.id, profile).await {
        Ok(cv) => Ok((candidate, cv)),
        Err(e) => {
            discard(store, candidate.id).await;
            Err(e)
        }
    }
}

async fn attach_skills_and_cv(
    store: &dyn CandidateStore,
    classifier: &dyn ClassifierGateway,
    candidate_id: Uuid,
    profile: &CandidateProfile,
) -> Result<CvRow, AppError> {
    for skill in &profile.skills {
        store.link_skill(candidate_id, skill).await?;
    }

    let generated = classifier.generate_cv(profile).await?;

    store
        .create_cv(&NewCv {
            candidate_id,
            content: generated.content,
            prompt: generated.prompt,
            generated_by: classifier.model_id().to_string(),
        })
        .await
}

async fn discard(store: &dyn CandidateStore, candidate_id: Uuid) {
    if let Err(e) = store.delete_candidate(candidate_id).await {
        error!(%candidate_id, error = %e, "Failed to remove candidate from aborted creation");
    }
}

pub struct GenerationPipeline<'a> {
    store: &'a dyn CandidateStore,
    classifier: &'a dyn ClassifierGateway,
}

impl<'a> GenerationPipeline<'a> {
    pub fn new(store: &'a dyn CandidateStore, classifier: &'a dyn ClassifierGateway) -> Self {
        Self { store, classifier }
    }

    pub async fn generate(&self, count: u32) -> Result<BatchGenerationResult, AppError> {
        if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&count) {
            return Err(AppError::Validation(format!(
                "count must be between {MIN_BATCH_SIZE} and {MAX_BATCH_SIZE}"
            )));
        }

        let mut profiles = self.classifier.generate_profiles(count).await?;
        if profiles.is_empty() {
            return Err(AppError::Classifier(
                "Classifier returned no candidate profiles".to_string(),
            ));
        }
        if profiles.len() < count as usize {
            warn!(requested = count, returned = profiles.len(), "Classifier returned fewer profiles than requested");
        }
        profiles.truncate(count as usize);

        let requested = profiles.len();
        info!(profiles = requested, "Creating candidates from generated profiles");

        let mut resolver = IdentityResolver::new(self.store);
        let mut records: Vec<GenerationRecord> = Vec::with_capacity(requested);

        for profile in profiles {
            match self.create_one(&mut resolver, profile).await {
                Ok(record) => records.push(record),
                Err(cause) => {
                    warn!(completed = records.len(), requested, error = %cause, "Batch aborted, removing its candidates");
                    for record in &records {
                        discard(self.store, record.candidate_id).await;
                    }
                    return Err(AppError::PartialBatch {
                        completed: records.len(),
                        requested,
                        cause: Box::new(cause),
                    });
                }
            }
        }

        info!(generated = records.len(), "Batch generation complete");

        Ok(BatchGenerationResult {
            generated: records.len(),
            candidates: records,
        })
    }

    async fn create_one(
        &self,
        resolver: &mut IdentityResolver<'_>,
        profile: CandidateProfile,
    ) -> Result<GenerationRecord, AppError> {
        let profile = resolver.resolve(profile.normalized()).await?;
        let (candidate, cv) = create_with_cv(self.store, self.classifier, &profile).await?;

        Ok(GenerationRecord {
            candidate_id: candidate.id,
            name: candidate.full_name(),
            cv_id: cv.id,
        })
    }
}
