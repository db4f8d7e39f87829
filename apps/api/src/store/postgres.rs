use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{
    CandidateDetail, CandidateListItem, CandidateRow, CandidateWithSkills, CvRow, NewCandidate,
    NewCv, SkillRow,
};
use crate::models::ranking::{NewEpoch, RankingRow, RankingWithCandidate};
use crate::store::{CandidateStore, PageParams, Paginated, DEFAULT_SKILL_CATEGORY};

/// Advisory lock key serialising epoch commits ("rank" in ASCII).
const RANKING_COMMIT_LOCK: i64 = 0x7261_6e6b;

const CURRENT_EPOCH: &str = "(SELECT MAX(id) FROM ranking_epochs)";

/// Only the committing epoch survives; `rankings.epoch_id` cascades.
const SUPERSEDE_EPOCHS: &str = "DELETE FROM ranking_epochs WHERE id <> $1";

#[derive(Clone)]
pub struct PgCandidateStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct LinkedSkill {
    candidate_id: Uuid,
    id: Uuid,
    name: String,
    category: String,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a read-only transaction over one consistent snapshot, so that
    /// multi-statement reads never straddle an epoch commit.
    async fn snapshot(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

async fn skills_for(
    tx: &mut Transaction<'static, Postgres>,
    candidate_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<SkillRow>>, AppError> {
    let rows = sqlx::query_as::<_, LinkedSkill>(
        r#"
        SELECT cs.candidate_id, s.id, s.name, s.category
        FROM candidate_skills cs
        JOIN skills s ON s.id = cs.skill_id
        WHERE cs.candidate_id = ANY($1)
        ORDER BY s.name
        "#,
    )
    .bind(candidate_ids)
    .fetch_all(&mut **tx)
    .await?;

    let mut by_candidate: HashMap<Uuid, Vec<SkillRow>> = HashMap::new();
    for row in rows {
        by_candidate.entry(row.candidate_id).or_default().push(SkillRow {
            id: row.id,
            name: row.name,
            category: row.category,
        });
    }
    Ok(by_candidate)
}

async fn candidates_with_skills(
    tx: &mut Transaction<'static, Postgres>,
    candidates: Vec<CandidateRow>,
) -> Result<Vec<CandidateWithSkills>, AppError> {
    let ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
    let mut skills = skills_for(tx, &ids).await?;
    Ok(candidates
        .into_iter()
        .map(|candidate| CandidateWithSkills {
            skills: skills.remove(&candidate.id).unwrap_or_default(),
            candidate,
        })
        .collect())
}

async fn attach_candidates(
    tx: &mut Transaction<'static, Postgres>,
    rankings: Vec<RankingRow>,
) -> Result<Vec<RankingWithCandidate>, AppError> {
    let ids: Vec<Uuid> = rankings.iter().map(|r| r.candidate_id).collect();
    let candidates =
        sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut **tx)
            .await?;
    let mut by_id: HashMap<Uuid, CandidateWithSkills> = candidates_with_skills(tx, candidates)
        .await?
        .into_iter()
        .map(|c| (c.candidate.id, c))
        .collect();

    // Cascading deletes keep every ranking's candidate present.
    Ok(rankings
        .into_iter()
        .filter_map(|ranking| {
            by_id
                .remove(&ranking.candidate_id)
                .map(|candidate| RankingWithCandidate { ranking, candidate })
        })
        .collect())
}

fn map_unique_email(e: sqlx::Error, email: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Conflict(format!("A candidate with email {email} already exists"));
        }
    }
    AppError::from(e)
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn find_all_with_skills(&self) -> Result<Vec<CandidateWithSkills>, AppError> {
        let mut tx = self.snapshot().await?;
        let candidates =
            sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates ORDER BY created_at, id")
                .fetch_all(&mut *tx)
                .await?;
        let result = candidates_with_skills(&mut tx, candidates).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<CandidateRow>, AppError> {
        Ok(sqlx::query_as::<_, CandidateRow>(
            "SELECT * FROM candidates WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_candidate(&self, data: &NewCandidate) -> Result<CandidateRow, AppError> {
        sqlx::query_as::<_, CandidateRow>(
            r#"
            INSERT INTO candidates (id, first_name, last_name, email, phone, years_of_exp)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(data.years_of_exp)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_email(e, &data.email))
    }

    async fn link_skill(
        &self,
        candidate_id: Uuid,
        skill_name: &str,
    ) -> Result<SkillRow, AppError> {
        let mut tx = self.pool.begin().await?;

        // The no-op update makes RETURNING yield the existing row on conflict.
        let skill = sqlx::query_as::<_, SkillRow>(
            r#"
            INSERT INTO skills (id, name, category)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, category
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(skill_name)
        .bind(DEFAULT_SKILL_CATEGORY)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO candidate_skills (candidate_id, skill_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(candidate_id)
        .bind(skill.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(skill)
    }

    async fn create_cv(&self, data: &NewCv) -> Result<CvRow, AppError> {
        Ok(sqlx::query_as::<_, CvRow>(
            r#"
            INSERT INTO cvs (id, candidate_id, content, prompt, generated_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.candidate_id)
        .bind(&data.content)
        .bind(&data.prompt)
        .bind(&data.generated_by)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_candidate(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM candidates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_candidates(
        &self,
        params: PageParams,
    ) -> Result<Paginated<CandidateListItem>, AppError> {
        let mut tx = self.snapshot().await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidates")
            .fetch_one(&mut *tx)
            .await?;

        let candidates = sqlx::query_as::<_, CandidateRow>(
            "SELECT * FROM candidates ORDER BY created_at DESC, id LIMIT $1 OFFSET $2",
        )
        .bind(params.limit as i64)
        .bind(params.offset())
        .fetch_all(&mut *tx)
        .await?;
        let ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();

        let mut skills = skills_for(&mut tx, &ids).await?;

        let mut latest_cvs: HashMap<Uuid, CvRow> = sqlx::query_as::<_, CvRow>(
            r#"
            SELECT DISTINCT ON (candidate_id) *
            FROM cvs
            WHERE candidate_id = ANY($1)
            ORDER BY candidate_id, created_at DESC
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|cv| (cv.candidate_id, cv))
        .collect();

        let mut rankings: HashMap<Uuid, RankingRow> = sqlx::query_as::<_, RankingRow>(&format!(
            "SELECT * FROM rankings WHERE candidate_id = ANY($1) AND epoch_id = {CURRENT_EPOCH}"
        ))
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|r| (r.candidate_id, r))
        .collect();

        tx.commit().await?;

        let items = candidates
            .into_iter()
            .map(|candidate| CandidateListItem {
                skills: skills.remove(&candidate.id).unwrap_or_default(),
                latest_cv: latest_cvs.remove(&candidate.id),
                current_ranking: rankings.remove(&candidate.id),
                candidate,
            })
            .collect();

        Ok(Paginated::new(items, params, total))
    }

    async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateDetail>, AppError> {
        let mut tx = self.snapshot().await?;

        let Some(candidate) =
            sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(None);
        };

        let skills = skills_for(&mut tx, &[id])
            .await?
            .remove(&id)
            .unwrap_or_default();

        let cvs = sqlx::query_as::<_, CvRow>(
            "SELECT * FROM cvs WHERE candidate_id = $1 ORDER BY created_at DESC",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let current_ranking = sqlx::query_as::<_, RankingRow>(&format!(
            "SELECT * FROM rankings WHERE candidate_id = $1 AND epoch_id = {CURRENT_EPOCH}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(CandidateDetail {
            candidate,
            skills,
            cvs,
            current_ranking,
        }))
    }

    async fn replace_all_rankings(&self, epoch: &NewEpoch) -> Result<Vec<RankingRow>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Serialise commits so that epoch ids are allocated in commit order.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(RANKING_COMMIT_LOCK)
            .execute(&mut *tx)
            .await?;

        let epoch_id: i64 = sqlx::query_scalar(
            "INSERT INTO ranking_epochs (criteria, candidate_count) VALUES ($1, $2) RETURNING id",
        )
        .bind(&epoch.criteria)
        .bind(epoch.rankings.len() as i32)
        .fetch_one(&mut *tx)
        .await?;

        let mut rows = Vec::with_capacity(epoch.rankings.len());
        for ranking in &epoch.rankings {
            let row = sqlx::query_as::<_, RankingRow>(
                r#"
                INSERT INTO rankings
                    (id, epoch_id, candidate_id, score, reasoning, criteria, should_interview, priority)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(epoch_id)
            .bind(ranking.candidate_id)
            .bind(ranking.score)
            .bind(&ranking.reasoning)
            .bind(&epoch.criteria)
            .bind(ranking.should_interview)
            .bind(ranking.priority)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict(
                        "A candidate was deleted while ranking was in progress; re-run ranking"
                            .to_string(),
                    )
                }
                _ => AppError::from(e),
            })?;
            rows.push(row);
        }

        let superseded = sqlx::query(SUPERSEDE_EPOCHS)
            .bind(epoch_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        debug!(epoch_id, superseded, "Deleted superseded ranking epochs");
        info!(epoch_id, rankings = rows.len(), "Committed ranking epoch");
        Ok(rows)
    }

    async fn current_rankings(&self) -> Result<Vec<RankingWithCandidate>, AppError> {
        let mut tx = self.snapshot().await?;
        let rankings = sqlx::query_as::<_, RankingRow>(&format!(
            "SELECT * FROM rankings WHERE epoch_id = {CURRENT_EPOCH} ORDER BY priority ASC"
        ))
        .fetch_all(&mut *tx)
        .await?;
        let result = attach_candidates(&mut tx, rankings).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn list_rankings(
        &self,
        params: PageParams,
    ) -> Result<Paginated<RankingWithCandidate>, AppError> {
        let mut tx = self.snapshot().await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM rankings WHERE epoch_id = {CURRENT_EPOCH}"
        ))
        .fetch_one(&mut *tx)
        .await?;

        let rankings = sqlx::query_as::<_, RankingRow>(&format!(
            "SELECT * FROM rankings WHERE epoch_id = {CURRENT_EPOCH} \
             ORDER BY priority ASC LIMIT $1 OFFSET $2"
        ))
        .bind(params.limit as i64)
        .bind(params.offset())
        .fetch_all(&mut *tx)
        .await?;

        let data = attach_candidates(&mut tx, rankings).await?;
        tx.commit().await?;
        Ok(Paginated::new(data, params, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

    #[test]
    fn test_commit_deletes_superseded_epoch_rows() {
        assert!(SUPERSEDE_EPOCHS.starts_with("DELETE FROM ranking_epochs "));
    }

    #[test]
    fn test_rankings_cascade_with_their_epoch() {
        let epoch_fk = SCHEMA
            .lines()
            .find(|line| line.contains("REFERENCES ranking_epochs"))
            .unwrap_or_default();
        assert!(epoch_fk.trim_start().starts_with("epoch_id"), "{epoch_fk}");
        assert!(epoch_fk.contains("ON DELETE CASCADE"), "{epoch_fk}");
    }
}
