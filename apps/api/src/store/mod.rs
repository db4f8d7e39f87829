//! Candidate Store: persisted candidates, skills, CVs and ranking epochs.
//!
//! `AppState` carries an `Arc<dyn CandidateStore>`. Production uses
//! `PgCandidateStore`; the test-suite swaps in `memory::MemoryStore`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{
    CandidateDetail, CandidateListItem, CandidateRow, CandidateWithSkills, CvRow, NewCandidate,
    NewCv, SkillRow,
};
use crate::models::ranking::{NewEpoch, RankingRow, RankingWithCandidate};

#[cfg(test)]
pub mod memory;
pub mod postgres;

/// Category assigned to skills created on first reference.
pub const DEFAULT_SKILL_CATEGORY: &str = "technical";

pub const DEFAULT_PAGE_LIMIT: u32 = 100;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
}

impl PageParams {
    /// Validates 1-based `page` and `limit` from a query string.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, AppError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if page < 1 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * (self.limit as i64)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, params: PageParams, total: i64) -> Self {
        let limit = params.limit.max(1) as i64;
        Self {
            data,
            pagination: PaginationMeta {
                page: params.page,
                limit: params.limit,
                total,
                total_pages: (total + limit - 1) / limit,
            },
        }
    }
}

/// Query string for paginated list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn params(&self) -> Result<PageParams, AppError> {
        PageParams::new(self.page, self.limit)
    }
}

#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Every candidate with its skills, in creation order.
    async fn find_all_with_skills(&self) -> Result<Vec<CandidateWithSkills>, AppError>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<CandidateRow>, AppError>;

    /// Fails with `AppError::Conflict` when the email is already taken.
    async fn create_candidate(&self, data: &NewCandidate) -> Result<CandidateRow, AppError>;

    /// Links a skill to a candidate, creating the catalog entry on first reference.
    async fn link_skill(&self, candidate_id: Uuid, skill_name: &str)
        -> Result<SkillRow, AppError>;

    async fn create_cv(&self, data: &NewCv) -> Result<CvRow, AppError>;

    /// Deletes a candidate with its skill links, CVs and rankings.
    /// Returns `false` if no such candidate existed.
    async fn delete_candidate(&self, id: Uuid) -> Result<bool, AppError>;

    async fn list_candidates(
        &self,
        params: PageParams,
    ) -> Result<Paginated<CandidateListItem>, AppError>;

    async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateDetail>, AppError>;

    /// Commits `epoch` as the only visible ranking epoch. Readers observe
    /// either the previous epoch or the new one, never a mix and never none.
    async fn replace_all_rankings(&self, epoch: &NewEpoch) -> Result<Vec<RankingRow>, AppError>;

    /// Rankings of the current epoch, priority ascending.
    async fn current_rankings(&self) -> Result<Vec<RankingWithCandidate>, AppError>;

    async fn list_rankings(
        &self,
        params: PageParams,
    ) -> Result<Paginated<RankingWithCandidate>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_defaults() {
        let params = PageParams::new(None, None).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 100);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_page_params_offset() {
        let params = PageParams::new(Some(3), Some(25)).unwrap();
        assert_eq!(params.offset(), 50);
    }

    #[test]
    fn test_page_params_rejects_out_of_range() {
        assert!(PageParams::new(Some(0), None).is_err());
        assert!(PageParams::new(None, Some(0)).is_err());
        assert!(PageParams::new(None, Some(101)).is_err());
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let params = PageParams::new(Some(1), Some(25)).unwrap();
        let page: Paginated<u8> = Paginated::new(vec![], params, 101);
        assert_eq!(page.pagination.total_pages, 5);

        let empty: Paginated<u8> = Paginated::new(vec![], params, 0);
        assert_eq!(empty.pagination.total_pages, 0);
    }
}
