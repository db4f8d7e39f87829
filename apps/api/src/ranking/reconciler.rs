//! Ranking Reconciler.
//!
//! Turns one untrusted classifier response into a complete, uniquely
//! prioritized ranking epoch:
//!
//! `Fetch -> FirstPass -> GapCheck -> [RetryPass] -> Fallback -> PriorityAssign -> Commit`
//!
//! Every state past `Fetch` works on the population fetched at the start of
//! the run. A classifier or store error before `Commit` leaves the previous
//! epoch untouched.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};
use uuid::Uuid;

use crate::classifier::{CandidateSummary, ClassifierGateway, RawVerdict};
use crate::errors::AppError;
use crate::models::candidate::CandidateWithSkills;
use crate::models::ranking::{NewEpoch, RankingWithCandidate};
use crate::ranking::verdict::{
    assign_priorities, parse_verdict, resolve_criteria, Verdict, VerdictOrigin,
};
use crate::store::CandidateStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub adopted: usize,
    pub malformed: usize,
    pub unknown: usize,
    pub duplicate: usize,
}

/// Verdict bookkeeping for one run. First-pass verdicts keep response order;
/// retry verdicts are only ever adopted for ids still uncovered.
#[derive(Debug, Default)]
pub struct Reconciliation {
    first_pass: Vec<Verdict>,
    recovered: HashMap<Uuid, Verdict>,
    covered: HashSet<Uuid>,
}

impl Reconciliation {
    pub fn absorb(
        &mut self,
        raw: &[RawVerdict],
        known: &HashSet<Uuid>,
        origin: VerdictOrigin,
    ) -> PassStats {
        let mut stats = PassStats::default();

        for value in raw {
            let verdict = match parse_verdict(value, origin) {
                Ok(v) => v,
                Err(defect) => {
                    warn!(?origin, %defect, "Discarding malformed verdict");
                    stats.malformed += 1;
                    continue;
                }
            };
            if !known.contains(&verdict.candidate_id) {
                warn!(?origin, candidate_id = %verdict.candidate_id, "Discarding verdict for unknown candidate");
                stats.unknown += 1;
                continue;
            }
            if !self.covered.insert(verdict.candidate_id) {
                stats.duplicate += 1;
                continue;
            }

            stats.adopted += 1;
            match origin {
                VerdictOrigin::FirstPass => self.first_pass.push(verdict),
                _ => {
                    self.recovered.insert(verdict.candidate_id, verdict);
                }
            }
        }

        stats
    }

    /// Uncovered ids, in population order.
    pub fn gaps(&self, population: &[Uuid]) -> Vec<Uuid> {
        population
            .iter()
            .filter(|id| !self.covered.contains(id))
            .copied()
            .collect()
    }

    /// First-pass verdicts, then every remaining candidate in population
    /// order with its retry verdict or a fallback. Exactly one verdict per id.
    pub fn into_ordered(mut self, population: &[Uuid]) -> Vec<Verdict> {
        let first_ids: HashSet<Uuid> = self.first_pass.iter().map(|v| v.candidate_id).collect();
        let mut ordered = std::mem::take(&mut self.first_pass);

        for id in population.iter().filter(|id| !first_ids.contains(id)) {
            let verdict = self
                .recovered
                .remove(id)
                .unwrap_or_else(|| Verdict::fallback(*id));
            ordered.push(verdict);
        }

        ordered
    }
}

/// Outcome of a committed ranking run.
#[derive(Debug, Clone)]
pub struct RankingRun {
    pub epoch_id: i64,
    pub criteria: String,
    pub rankings: Vec<RankingWithCandidate>,
    pub retried: bool,
    pub fallbacks: usize,
}

pub struct RankingReconciler<'a> {
    store: &'a dyn CandidateStore,
    classifier: &'a dyn ClassifierGateway,
}

impl<'a> RankingReconciler<'a> {
    pub fn new(store: &'a dyn CandidateStore, classifier: &'a dyn ClassifierGateway) -> Self {
        Self { store, classifier }
    }

    pub async fn rank_all(&self, criteria: Option<&str>) -> Result<RankingRun, AppError> {
        let criteria = resolve_criteria(criteria);

        let candidates = self.store.find_all_with_skills().await?;
        if candidates.is_empty() {
            return Err(AppError::NoCandidates);
        }

        let summaries: Vec<CandidateSummary> =
            candidates.iter().map(CandidateSummary::from).collect();
        let population: Vec<Uuid> = summaries.iter().map(|s| s.id).collect();
        let known: HashSet<Uuid> = population.iter().copied().collect();

        info!(candidates = population.len(), criteria = %criteria, "Ranking candidates");

        let mut reconciliation = Reconciliation::default();
        let first = self
            .classifier
            .rank_candidates(&summaries, &criteria)
            .await?;
        let stats = reconciliation.absorb(&first, &known, VerdictOrigin::FirstPass);
        info!(
            returned = first.len(),
            adopted = stats.adopted,
            malformed = stats.malformed,
            unknown = stats.unknown,
            duplicate = stats.duplicate,
            "First ranking pass reconciled"
        );

        let by_id: HashMap<Uuid, &CandidateWithSkills> =
            candidates.iter().map(|c| (c.candidate.id, c)).collect();
        let name_of = |id: &Uuid| {
            by_id
                .get(id)
                .map(|c| c.candidate.full_name())
                .unwrap_or_default()
        };

        let gaps = reconciliation.gaps(&population);
        for id in &gaps {
            warn!(candidate_id = %id, name = %name_of(id), "No usable verdict in first pass");
        }
        let retried = !gaps.is_empty();
        if retried {
            warn!(missing = gaps.len(), "Ranking incomplete, retrying once");
            let retry = self
                .classifier
                .rank_candidates(&summaries, &criteria)
                .await?;
            let stats = reconciliation.absorb(&retry, &known, VerdictOrigin::RetryPass);
            info!(recovered = stats.adopted, "Retry ranking pass reconciled");
        }

        let verdicts = reconciliation.into_ordered(&population);

        let fallbacks = verdicts
            .iter()
            .filter(|v| v.origin == VerdictOrigin::Fallback)
            .inspect(|v| {
                warn!(candidate_id = %v.candidate_id, name = %name_of(&v.candidate_id), "Candidate left unevaluated, using fallback verdict");
            })
            .count();

        let epoch = NewEpoch {
            criteria: criteria.clone(),
            rankings: assign_priorities(&verdicts),
        };
        let rows = self.store.replace_all_rankings(&epoch).await?;

        let epoch_id = rows.first().map(|r| r.epoch_id).unwrap_or_default();
        let rankings = rows
            .into_iter()
            .filter_map(|ranking| {
                by_id.get(&ranking.candidate_id).map(|c| RankingWithCandidate {
                    candidate: (*c).clone(),
                    ranking,
                })
            })
            .collect();

        info!(epoch_id, fallbacks, retried, "Ranking epoch committed");

        Ok(RankingRun {
            epoch_id,
            criteria,
            rankings,
            retried,
            fallbacks,
        })
    }
}
