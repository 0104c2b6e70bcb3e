use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Local, NaiveDate};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use super::combiner::combine;
use super::domain::{
    NewRecommendation, RecommendationWithScheme, Scheme, SchemeId, UserId,
};
use super::eligibility::{EligibilityEngine, EligibilityPolicy, ScoredScheme};
use super::repository::{ProfileStore, RecommendationStore, RepositoryError, SchemeCatalog};
use super::scorer::SchemeScorer;

/// Service composing the stores, the rule engine and the AI scorer into the
/// recommendation lifecycle.
pub struct RecommendationService<P, C, R> {
    profiles: Arc<P>,
    catalog: Arc<C>,
    store: Arc<R>,
    scorer: Arc<dyn SchemeScorer>,
    engine: EligibilityEngine,
    gate: RegenerationGate,
    as_of: Option<NaiveDate>,
}

impl<P, C, R> RecommendationService<P, C, R>
where
    P: ProfileStore + 'static,
    C: SchemeCatalog + 'static,
    R: RecommendationStore + 'static,
{
    pub fn new(
        profiles: Arc<P>,
        catalog: Arc<C>,
        store: Arc<R>,
        scorer: Arc<dyn SchemeScorer>,
    ) -> Self {
        Self {
            profiles,
            catalog,
            store,
            scorer,
            engine: EligibilityEngine::new(EligibilityPolicy::standard()),
            gate: RegenerationGate::default(),
            as_of: None,
        }
    }

    /// Pin the evaluation date instead of reading the local clock.
    pub fn with_evaluation_date(mut self, today: NaiveDate) -> Self {
        self.as_of = Some(today);
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Generate and persist a fresh recommendation set, replacing any previous one.
    pub async fn generate(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RecommendationWithScheme>, RecommendationServiceError> {
        let _permit = self.gate.acquire(user_id).await;
        self.regenerate(user_id).await
    }

    /// Drop the stored set and regenerate from scratch.
    pub async fn refresh(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RecommendationWithScheme>, RecommendationServiceError> {
        let _permit = self.gate.acquire(user_id).await;
        self.store.delete_all_for_user(user_id)?;
        self.regenerate(user_id).await
    }

    /// Users currently holding or waiting on a regeneration slot.
    #[cfg(test)]
    pub(crate) fn gated_users(&self) -> usize {
        self.gate.tracked_users()
    }

    /// Stored recommendations with their schemes, best first. Rows whose scheme has left
    /// the catalog are skipped.
    pub fn recommendations_for(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RecommendationWithScheme>, RecommendationServiceError> {
        let mut enriched = Vec::new();
        for recommendation in self.store.get_all_for_user(user_id)? {
            match self.catalog.get_by_id(&recommendation.scheme_id)? {
                Some(scheme) => enriched.push(recommendation.with_scheme(scheme)),
                None => debug!(
                    scheme_id = %recommendation.scheme_id,
                    "skipping recommendation for retired scheme"
                ),
            }
        }

        sort_by_score(&mut enriched);
        Ok(enriched)
    }

    /// Stored recommendations restricted to one scheme category (case-insensitive).
    pub fn recommendations_in_category(
        &self,
        user_id: &UserId,
        category: &str,
    ) -> Result<Vec<RecommendationWithScheme>, RecommendationServiceError> {
        let mut recommendations = self.recommendations_for(user_id)?;
        recommendations.retain(|rec| rec.scheme.category.eq_ignore_ascii_case(category));
        Ok(recommendations)
    }

    /// Rule-based shortlist for a citizen without touching stored recommendations.
    pub fn eligible_schemes(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ScoredScheme>, RecommendationServiceError> {
        let profile = self
            .profiles
            .get(user_id)?
            .ok_or_else(|| RecommendationServiceError::ProfileNotFound(user_id.clone()))?;
        let catalog = self.catalog.get_all()?;
        Ok(self.engine.filter_eligible(&profile, &catalog, self.today()))
    }

    async fn regenerate(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RecommendationWithScheme>, RecommendationServiceError> {
        let today = self.today();
        let profile = self
            .profiles
            .get(user_id)?
            .ok_or_else(|| RecommendationServiceError::ProfileNotFound(user_id.clone()))?;
        let catalog = self.catalog.get_all()?;

        let shortlist = self.engine.filter_eligible(&profile, &catalog, today);
        // The oracle sees the whole catalog so it can surface schemes the rules missed.
        let ai_results = self.scorer.score(&profile, &catalog, today).await;
        let combined = combine(&shortlist, &ai_results);

        let records = combined
            .into_iter()
            .map(|entry| NewRecommendation {
                user_id: user_id.clone(),
                scheme_id: entry.scheme_id,
                score: entry.score,
                reasoning: entry.reasoning,
                eligibility_status: entry.eligibility_status,
            })
            .collect();
        let persisted = self.store.replace_for_user(user_id, records)?;

        info!(
            %user_id,
            catalog = catalog.len(),
            shortlisted = shortlist.len(),
            ai_scored = ai_results.len(),
            persisted = persisted.len(),
            "recommendations generated"
        );

        let schemes: HashMap<&SchemeId, &Scheme> =
            catalog.iter().map(|scheme| (&scheme.id, scheme)).collect();
        let mut enriched: Vec<RecommendationWithScheme> = persisted
            .into_iter()
            .filter_map(|recommendation| {
                let scheme = (*schemes.get(&recommendation.scheme_id)?).clone();
                Some(recommendation.with_scheme(scheme))
            })
            .collect();

        sort_by_score(&mut enriched);
        Ok(enriched)
    }
}

fn sort_by_score(recommendations: &mut [RecommendationWithScheme]) {
    recommendations.sort_by(|a, b| b.score.total_cmp(&a.score));
}

type GateSlots = Arc<Mutex<HashMap<UserId, GateSlot>>>;

/// Serializes regeneration per user so concurrent generate/refresh calls cannot
/// interleave their store writes.
#[derive(Default)]
struct RegenerationGate {
    slots: GateSlots,
}

struct GateSlot {
    lock: Arc<AsyncMutex<()>>,
    /// Permits holding or waiting on `lock`; the slot is removed when this reaches zero.
    holders: usize,
}

impl RegenerationGate {
    async fn acquire(&self, user_id: &UserId) -> RegenerationPermit {
        let lock = {
            let mut slots = lock_slots(&self.slots);
            let slot = slots.entry(user_id.clone()).or_insert_with(|| GateSlot {
                lock: Arc::default(),
                holders: 0,
            });
            slot.holders += 1;
            Arc::clone(&slot.lock)
        };

        // Registered before the first await so a cancelled waiter still releases its slot.
        let mut permit = RegenerationPermit {
            slots: Arc::clone(&self.slots),
            user_id: user_id.clone(),
            guard: None,
        };
        permit.guard = Some(lock.lock_owned().await);
        permit
    }

    #[cfg(test)]
    fn tracked_users(&self) -> usize {
        lock_slots(&self.slots).len()
    }
}

/// Exclusive regeneration right for one user, released on drop.
struct RegenerationPermit {
    slots: GateSlots,
    user_id: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RegenerationPermit {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = lock_slots(&self.slots);
        if let Some(slot) = slots.get_mut(&self.user_id) {
            slot.holders = slot.holders.saturating_sub(1);
            if slot.holders == 0 {
                slots.remove(&self.user_id);
            }
        }
    }
}

fn lock_slots(
    slots: &Mutex<HashMap<UserId, GateSlot>>,
) -> MutexGuard<'_, HashMap<UserId, GateSlot>> {
    slots
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Error raised by the recommendation service.
#[derive(Debug, thiserror::Error)]
pub enum RecommendationServiceError {
    #[error("citizen profile not found for user {0}")]
    ProfileNotFound(UserId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
