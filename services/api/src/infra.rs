use chrono::{NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use scheme_match::catalog::{self, SchemeCatalogImporter};
use scheme_match::config::AiConfig;
use scheme_match::error::AppError;
use scheme_match::recommendations::{
    AiSchemeScorer, CitizenProfile, NewRecommendation, OpenAiOracle, ProfileStore,
    Recommendation, RecommendationId, RecommendationStore, RepositoryError, RuleOnlyScorer,
    Scheme, SchemeCatalog, SchemeId, SchemeScorer, UserId,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} mutex poisoned")))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryProfileStore {
    profiles: Arc<Mutex<HashMap<UserId, CitizenProfile>>>,
}

impl InMemoryProfileStore {
    pub(crate) fn upsert(&self, profile: CitizenProfile) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.profiles, "profile")?;
        guard.insert(profile.user_id.clone(), profile);
        Ok(())
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn get(&self, user_id: &UserId) -> Result<Option<CitizenProfile>, RepositoryError> {
        let guard = lock(&self.profiles, "profile")?;
        Ok(guard.get(user_id).cloned())
    }
}

/// Read-only catalog loaded once at start-up.
#[derive(Clone)]
pub(crate) struct InMemorySchemeCatalog {
    schemes: Arc<Vec<Scheme>>,
}

impl InMemorySchemeCatalog {
    pub(crate) fn new(schemes: Vec<Scheme>) -> Self {
        Self {
            schemes: Arc::new(schemes),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.schemes.len()
    }
}

impl SchemeCatalog for InMemorySchemeCatalog {
    fn get_all(&self) -> Result<Vec<Scheme>, RepositoryError> {
        Ok(self.schemes.as_ref().clone())
    }

    fn get_by_id(&self, id: &SchemeId) -> Result<Option<Scheme>, RepositoryError> {
        Ok(self.schemes.iter().find(|scheme| &scheme.id == id).cloned())
    }

    fn search(&self, query: &str) -> Result<Vec<Scheme>, RepositoryError> {
        Ok(self
            .schemes
            .iter()
            .filter(|scheme| catalog::matches_query(scheme, query))
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRecommendationStore {
    rows: Arc<Mutex<HashMap<UserId, Vec<Recommendation>>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryRecommendationStore {
    fn materialize(&self, record: NewRecommendation) -> Recommendation {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
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
}

impl RecommendationStore for InMemoryRecommendationStore {
    fn delete_all_for_user(&self, user_id: &UserId) -> Result<(), RepositoryError> {
        lock(&self.rows, "recommendation")?.remove(user_id);
        Ok(())
    }

    fn create(&self, record: NewRecommendation) -> Result<Recommendation, RepositoryError> {
        let row = self.materialize(record);
        lock(&self.rows, "recommendation")?
            .entry(row.user_id.clone())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    fn get_all_for_user(&self, user_id: &UserId) -> Result<Vec<Recommendation>, RepositoryError> {
        let guard = lock(&self.rows, "recommendation")?;
        Ok(guard.get(user_id).cloned().unwrap_or_default())
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
        lock(&self.rows, "recommendation")?.insert(user_id.clone(), fresh.clone());
        Ok(fresh)
    }
}

/// Catalog from a CSV export, or the bundled sample when no path is given.
pub(crate) fn load_catalog(path: Option<&Path>) -> Result<Vec<Scheme>, AppError> {
    let schemes = match path {
        Some(path) => SchemeCatalogImporter::from_path(path)?,
        None => catalog::sample_catalog()?,
    };
    info!(schemes = schemes.len(), "scheme catalog loaded");
    Ok(schemes)
}

/// Oracle-backed scorer when a key is configured; rule-only otherwise.
pub(crate) fn build_scorer(config: &AiConfig) -> Arc<dyn SchemeScorer> {
    if !config.enabled() {
        info!("no oracle key configured, recommendations are rule-based only");
        return Arc::new(RuleOnlyScorer);
    }

    match OpenAiOracle::new(config) {
        Ok(oracle) => {
            info!(model = %config.model, "AI scoring enabled");
            Arc::new(AiSchemeScorer::new(
                oracle,
                config.timeout,
                config.max_schemes_per_prompt,
            ))
        }
        Err(error) => {
            warn!(%error, "oracle client unavailable, falling back to rule-based scoring");
            Arc::new(RuleOnlyScorer)
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
