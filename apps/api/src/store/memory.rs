//! In-memory `CandidateStore` for tests. A single `RwLock` guards all tables,
//! so an epoch swap is atomic with respect to readers.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{
    CandidateDetail, CandidateListItem, CandidateRow, CandidateWithSkills, CvRow, NewCandidate,
    NewCv, SkillRow,
};
use crate::models::ranking::{NewEpoch, RankingRow, RankingWithCandidate};
use crate::store::{CandidateStore, PageParams, Paginated, DEFAULT_SKILL_CATEGORY};

#[derive(Default)]
struct Tables {
    candidates: Vec<CandidateRow>,
    skills: Vec<SkillRow>,
    links: Vec<(Uuid, Uuid)>,
    cvs: Vec<CvRow>,
    rankings: Vec<RankingRow>,
    last_epoch: i64,
}

impl Tables {
    fn with_skills(&self, candidate: &CandidateRow) -> CandidateWithSkills {
        let mut skills: Vec<SkillRow> = self
            .links
            .iter()
            .filter(|(cid, _)| *cid == candidate.id)
            .filter_map(|(_, sid)| self.skills.iter().find(|s| s.id == *sid).cloned())
            .collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        CandidateWithSkills {
            candidate: candidate.clone(),
            skills,
        }
    }

    fn ranking_for(&self, candidate_id: Uuid) -> Option<RankingRow> {
        self.rankings
            .iter()
            .find(|r| r.candidate_id == candidate_id && r.epoch_id == self.last_epoch)
            .cloned()
    }

    fn current_rankings(&self) -> Vec<RankingWithCandidate> {
        let mut rows: Vec<RankingRow> = self
            .rankings
            .iter()
            .filter(|r| r.epoch_id == self.last_epoch)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.priority);
        rows.into_iter()
            .filter_map(|ranking| {
                self.candidates
                    .iter()
                    .find(|c| c.id == ranking.candidate_id)
                    .map(|c| RankingWithCandidate {
                        candidate: self.with_skills(c),
                        ranking,
                    })
            })
            .collect()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    /// Makes `create_cv` fail once this many CVs exist.
    fail_cv_after: Option<usize>,
    cv_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_cv_after(successes: usize) -> Self {
        Self {
            fail_cv_after: Some(successes),
            ..Self::default()
        }
    }

    /// Inserts a candidate with skills directly, bypassing the pipeline.
    pub async fn seed(&self, first: &str, last: &str, email: &str, skills: &[&str]) -> Uuid {
        let candidate = self
            .create_candidate(&NewCandidate {
                first_name: first.to_string(),
                last_name: last.to_string(),
                email: email.to_string(),
                phone: None,
                years_of_exp: 3,
            })
            .await
            .expect("seed candidate");
        for skill in skills {
            self.link_skill(candidate.id, skill).await.expect("seed skill");
        }
        candidate.id
    }

    pub async fn candidate_count(&self) -> usize {
        self.tables.read().await.candidates.len()
    }

    pub async fn cv_count(&self) -> usize {
        self.tables.read().await.cvs.len()
    }

    pub async fn emails(&self) -> Vec<String> {
        self.tables
            .read()
            .await
            .candidates
            .iter()
            .map(|c| c.email.clone())
            .collect()
    }

    /// Every stored ranking row, including any leftover from older epochs.
    pub async fn all_ranking_rows(&self) -> Vec<RankingRow> {
        self.tables.read().await.rankings.clone()
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn find_all_with_skills(&self) -> Result<Vec<CandidateWithSkills>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .candidates
            .iter()
            .map(|c| tables.with_skills(c))
            .collect())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<CandidateRow>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .candidates
            .iter()
            .find(|c| c.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_candidate(&self, data: &NewCandidate) -> Result<CandidateRow, AppError> {
        let mut tables = self.tables.write().await;
        if tables
            .candidates
            .iter()
            .any(|c| c.email.eq_ignore_ascii_case(&data.email))
        {
            return Err(AppError::Conflict(format!(
                "A candidate with email {} already exists",
                data.email
            )));
        }
        // Strictly increasing timestamps keep newest-first ordering deterministic.
        let created_at = Utc::now() + Duration::milliseconds(tables.candidates.len() as i64);
        let row = CandidateRow {
            id: Uuid::new_v4(),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            years_of_exp: data.years_of_exp,
            created_at,
            updated_at: created_at,
        };
        tables.candidates.push(row.clone());
        Ok(row)
    }

    async fn link_skill(
        &self,
        candidate_id: Uuid,
        skill_name: &str,
    ) -> Result<SkillRow, AppError> {
        let mut tables = self.tables.write().await;
        let skill = match tables.skills.iter().find(|s| s.name == skill_name) {
            Some(existing) => existing.clone(),
            None => {
                let created = SkillRow {
                    id: Uuid::new_v4(),
                    name: skill_name.to_string(),
                    category: DEFAULT_SKILL_CATEGORY.to_string(),
                };
                tables.skills.push(created.clone());
                created
            }
        };
        if !tables.links.contains(&(candidate_id, skill.id)) {
            tables.links.push((candidate_id, skill.id));
        }
        Ok(skill)
    }

    async fn create_cv(&self, data: &NewCv) -> Result<CvRow, AppError> {
        let calls = self.cv_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_cv_after.is_some_and(|limit| calls >= limit) {
            return Err(AppError::Internal(anyhow::anyhow!("cv insert failed")));
        }
        let mut tables = self.tables.write().await;
        let created_at = Utc::now() + Duration::milliseconds(tables.cvs.len() as i64);
        let row = CvRow {
            id: Uuid::new_v4(),
            candidate_id: data.candidate_id,
            content: data.content.clone(),
            prompt: data.prompt.clone(),
            generated_by: data.generated_by.clone(),
            created_at,
        };
        tables.cvs.push(row.clone());
        Ok(row)
    }

    async fn delete_candidate(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.candidates.len();
        tables.candidates.retain(|c| c.id != id);
        tables.links.retain(|(cid, _)| *cid != id);
        tables.cvs.retain(|cv| cv.candidate_id != id);
        tables.rankings.retain(|r| r.candidate_id != id);
        Ok(tables.candidates.len() < before)
    }

    async fn list_candidates(
        &self,
        params: PageParams,
    ) -> Result<Paginated<CandidateListItem>, AppError> {
        let tables = self.tables.read().await;
        let mut ordered: Vec<&CandidateRow> = tables.candidates.iter().collect();
        ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let items = ordered
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.limit as usize)
            .map(|c| {
                let latest_cv = tables
                    .cvs
                    .iter()
                    .filter(|cv| cv.candidate_id == c.id)
                    .max_by_key(|cv| cv.created_at)
                    .cloned();
                CandidateListItem {
                    skills: tables.with_skills(c).skills,
                    latest_cv,
                    current_ranking: tables.ranking_for(c.id),
                    candidate: c.clone(),
                }
            })
            .collect();

        Ok(Paginated::new(items, params, tables.candidates.len() as i64))
    }

    async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateDetail>, AppError> {
        let tables = self.tables.read().await;
        let Some(candidate) = tables.candidates.iter().find(|c| c.id == id) else {
            return Ok(None);
        };
        let mut cvs: Vec<CvRow> = tables
            .cvs
            .iter()
            .filter(|cv| cv.candidate_id == id)
            .cloned()
            .collect();
        cvs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Some(CandidateDetail {
            skills: tables.with_skills(candidate).skills,
            cvs,
            current_ranking: tables.ranking_for(id),
            candidate: candidate.clone(),
        }))
    }

    async fn replace_all_rankings(&self, epoch: &NewEpoch) -> Result<Vec<RankingRow>, AppError> {
        let mut tables = self.tables.write().await;
        for ranking in &epoch.rankings {
            if !tables.candidates.iter().any(|c| c.id == ranking.candidate_id) {
                return Err(AppError::Conflict(
                    "A candidate was deleted while ranking was in progress; re-run ranking"
                        .to_string(),
                ));
            }
        }

        let epoch_id = tables.last_epoch + 1;
        let ranked_at = Utc::now();
        let rows: Vec<RankingRow> = epoch
            .rankings
            .iter()
            .map(|r| RankingRow {
                id: Uuid::new_v4(),
                epoch_id,
                candidate_id: r.candidate_id,
                score: r.score,
                reasoning: r.reasoning.clone(),
                criteria: epoch.criteria.clone(),
                should_interview: r.should_interview,
                priority: r.priority,
                ranked_at,
            })
            .collect();

        tables.rankings = rows.clone();
        tables.last_epoch = epoch_id;
        Ok(rows)
    }

    async fn current_rankings(&self) -> Result<Vec<RankingWithCandidate>, AppError> {
        Ok(self.tables.read().await.current_rankings())
    }

    async fn list_rankings(
        &self,
        params: PageParams,
    ) -> Result<Paginated<RankingWithCandidate>, AppError> {
        let all = self.tables.read().await.current_rankings();
        let total = all.len() as i64;
        let data = all
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.limit as usize)
            .collect();
        Ok(Paginated::new(data, params, total))
    }
}
