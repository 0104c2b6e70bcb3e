use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::catalog::matches_query;
use crate::recommendations::domain::{
    CitizenProfile, EligibilityCriteria, EligibilityStatus, HousingRequirement,
    NewRecommendation, Recommendation, RecommendationId, Scheme, SchemeId, UserId,
};
use crate::recommendations::repository::{
    ProfileStore, RecommendationStore, RepositoryError, SchemeCatalog,
};
use crate::recommendations::scorer::{
    AiRecommendation, OracleError, SchemeScorer, ScoringOracle,
};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid date")
}

pub(super) fn user() -> UserId {
    UserId("citizen-1".to_string())
}

pub(super) fn profile() -> CitizenProfile {
    CitizenProfile {
        user_id: user(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 3, 10),
        category: Some("OBC".to_string()),
        occupation: Some("Farmer".to_string()),
        state: "Kerala".to_string(),
        annual_income: Some(150_000),
        has_disability: false,
        family_size: Some(4),
        education: Some("Secondary".to_string()),
    }
}

pub(super) fn bare_scheme(id: &str, category: &str) -> Scheme {
    Scheme {
        id: SchemeId(id.to_string()),
        name: format!("Scheme {id}"),
        category: category.to_string(),
        description: format!("Support programme {id}"),
        max_income: None,
        min_age: None,
        max_age: None,
        target_categories: Vec::new(),
        target_occupations: Vec::new(),
        state: None,
        eligibility_criteria: None,
    }
}

/// Farmer income support: every constraint satisfied by [`profile`].
pub(super) fn kisan_scheme() -> Scheme {
    Scheme {
        max_income: Some(200_000),
        min_age: Some(18),
        target_occupations: vec!["Farmer".to_string()],
        eligibility_criteria: Some(EligibilityCriteria {
            farmer_type: Some("small and marginal".to_string()),
            housing: None,
        }),
        ..bare_scheme("pm-kisan", "Agriculture")
    }
}

/// Housing scheme scoring 0.5 for [`profile`]: income met, state missed.
pub(super) fn housing_scheme() -> Scheme {
    Scheme {
        max_income: Some(300_000),
        state: Some("Bihar".to_string()),
        ..bare_scheme("pmay", "Housing")
    }
}

/// Pension scheme no working-age citizen can match.
pub(super) fn pension_scheme() -> Scheme {
    Scheme {
        min_age: Some(60),
        max_income: Some(50_000),
        target_categories: vec!["SC".to_string(), "ST".to_string()],
        ..bare_scheme("old-age-pension", "Social Security")
    }
}

/// Scheme with a non-verifiable housing condition that the rules credit automatically.
pub(super) fn rural_housing_scheme() -> Scheme {
    Scheme {
        state: Some("Kerala".to_string()),
        eligibility_criteria: Some(EligibilityCriteria {
            farmer_type: None,
            housing: Some(HousingRequirement::MustNotOwnHouse),
        }),
        ..bare_scheme("life-mission", "Housing")
    }
}

pub(super) fn catalog() -> Vec<Scheme> {
    vec![
        kisan_scheme(),
        housing_scheme(),
        pension_scheme(),
        rural_housing_scheme(),
    ]
}

pub(super) fn ai(scheme_id: &str, score: f64, status: EligibilityStatus) -> AiRecommendation {
    AiRecommendation {
        scheme_id: SchemeId(scheme_id.to_string()),
        score,
        eligibility_status: status,
        reasoning: format!("model view on {scheme_id}"),
    }
}

#[derive(Default)]
pub(super) struct MemoryProfiles {
    profiles: Mutex<HashMap<UserId, CitizenProfile>>,
}

impl MemoryProfiles {
    pub(super) fn with(profiles: Vec<CitizenProfile>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.profiles.lock().expect("lock");
            for profile in profiles {
                guard.insert(profile.user_id.clone(), profile);
            }
        }
        store
    }
}

impl ProfileStore for MemoryProfiles {
    fn get(&self, user_id: &UserId) -> Result<Option<CitizenProfile>, RepositoryError> {
        Ok(self.profiles.lock().expect("lock").get(user_id).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryCatalog {
    schemes: Mutex<Vec<Scheme>>,
}

impl MemoryCatalog {
    pub(super) fn with(schemes: Vec<Scheme>) -> Self {
        Self {
            schemes: Mutex::new(schemes),
        }
    }

    pub(super) fn retire(&self, id: &str) {
        self.schemes
            .lock()
            .expect("lock")
            .retain(|scheme| scheme.id.0 != id);
    }
}

impl SchemeCatalog for MemoryCatalog {
    fn get_all(&self) -> Result<Vec<Scheme>, RepositoryError> {
        Ok(self.schemes.lock().expect("lock").clone())
    }

    fn get_by_id(&self, id: &SchemeId) -> Result<Option<Scheme>, RepositoryError> {
        Ok(self
            .schemes
            .lock()
            .expect("lock")
            .iter()
            .find(|scheme| &scheme.id == id)
            .cloned())
    }

    fn search(&self, query: &str) -> Result<Vec<Scheme>, RepositoryError> {
        Ok(self
            .schemes
            .lock()
            .expect("lock")
            .iter()
            .filter(|scheme| matches_query(scheme, query))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryRecommendations {
    rows: Mutex<Vec<Recommendation>>,
    next_id: AtomicU64,
}

impl MemoryRecommendations {
    fn materialize(&self, record: NewRecommendation) -> Recommendation {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Recommendation {
            id: RecommendationId(format!("rec-{id:06}")),
            user_id: record.user_id,
            scheme_id: record.scheme_id,
            score: record.score,
            reasoning: record.reasoning,
            eligibility_status: record.eligibility_status,
            generated_at: Utc::now(),
        }
    }

    pub(super) fn seed(&self, record: NewRecommendation) {
        let row = self.materialize(record);
        self.rows.lock().expect("lock").push(row);
    }

    pub(super) fn len(&self) -> usize {
        self.rows.lock().expect("lock").len()
    }
}

impl RecommendationStore for MemoryRecommendations {
    fn delete_all_for_user(&self, user_id: &UserId) -> Result<(), RepositoryError> {
        self.rows
            .lock()
            .expect("lock")
            .retain(|row| &row.user_id != user_id);
        Ok(())
    }

    fn create(&self, record: NewRecommendation) -> Result<Recommendation, RepositoryError> {
        let row = self.materialize(record);
        self.rows.lock().expect("lock").push(row.clone());
        Ok(row)
    }

    fn get_all_for_user(&self, user_id: &UserId) -> Result<Vec<Recommendation>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .expect("lock")
            .iter()
            .filter(|row| &row.user_id == user_id)
            .cloned()
            .collect())
    }

    fn replace_for_user(
        &self,
        user_id: &UserId,
        records: Vec<NewRecommendation>,
    ) -> Result<Vec<Recommendation>, RepositoryError> {
        let fresh: Vec<Recommendation> = records
            .into_iter()
            .map(|record| self.materialize(record))
            .collect();
        let mut rows = self.rows.lock().expect("lock");
        rows.retain(|row| &row.user_id != user_id);
        rows.extend(fresh.iter().cloned());
        Ok(fresh)
    }
}

/// Store relying on the trait's delete-then-create `replace_for_user`. Each insert pauses
/// the calling thread so overlapping batches interleave row by row.
#[derive(Default)]
pub(super) struct DeleteThenCreateStore {
    rows: Mutex<Vec<Recommendation>>,
    next_id: AtomicU64,
    insert_pause: Option<Duration>,
}

impl DeleteThenCreateStore {
    pub(super) fn pausing(insert_pause: Duration) -> Self {
        Self {
            insert_pause: Some(insert_pause),
            ..Self::default()
        }
    }
}

impl RecommendationStore for DeleteThenCreateStore {
    fn delete_all_for_user(&self, user_id: &UserId) -> Result<(), RepositoryError> {
        self.rows
            .lock()
            .expect("lock")
            .retain(|row| &row.user_id != user_id);
        Ok(())
    }

    fn create(&self, record: NewRecommendation) -> Result<Recommendation, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let row = Recommendation {
            id: RecommendationId(format!("row-{id}")),
            user_id: record.user_id,
            scheme_id: record.scheme_id,
            score: record.score,
            reasoning: record.reasoning,
            eligibility_status: record.eligibility_status,
            generated_at: Utc::now(),
        };
        self.rows.lock().expect("lock").push(row.clone());
        if let Some(pause) = self.insert_pause {
            std::thread::sleep(pause);
        }
        Ok(row)
    }

    fn get_all_for_user(&self, user_id: &UserId) -> Result<Vec<Recommendation>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .expect("lock")
            .iter()
            .filter(|row| &row.user_id == user_id)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableStore;

impl RecommendationStore for UnavailableStore {
    fn delete_all_for_user(&self, _user_id: &UserId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn create(&self, _record: NewRecommendation) -> Result<Recommendation, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn get_all_for_user(&self, _user_id: &UserId) -> Result<Vec<Recommendation>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Oracle replaying a fixed reply, optionally after a delay.
pub(super) struct ScriptedOracle {
    reply: Result<String, String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub(super) fn replying(body: &str) -> Self {
        Self {
            reply: Ok(body.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn delayed(body: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::replying(body)
        }
    }

    pub(super) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ScoringOracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        self.prompts.lock().expect("lock").push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().map_err(OracleError::Transport)
    }
}

#[async_trait]
impl ScoringOracle for Arc<ScriptedOracle> {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        self.as_ref().complete(prompt).await
    }
}

/// Scorer returning canned recommendations regardless of input.
pub(super) struct StaticScorer(pub(super) Vec<AiRecommendation>);

#[async_trait]
impl SchemeScorer for StaticScorer {
    async fn score(
        &self,
        _profile: &CitizenProfile,
        _schemes: &[Scheme],
        _today: NaiveDate,
    ) -> Vec<AiRecommendation> {
        self.0.clone()
    }
}

/// Scorer that contributes nothing after sleeping, giving concurrent runs an await point.
pub(super) struct SlowScorer(pub(super) Duration);

#[async_trait]
impl SchemeScorer for SlowScorer {
    async fn score(
        &self,
        _profile: &CitizenProfile,
        _schemes: &[Scheme],
        _today: NaiveDate,
    ) -> Vec<AiRecommendation> {
        tokio::time::sleep(self.0).await;
        Vec::new()
    }
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}
