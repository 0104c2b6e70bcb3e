use super::domain::{
    CitizenProfile, NewRecommendation, Recommendation, Scheme, SchemeId, UserId,
};

/// Read access to citizen profiles owned by the profile subsystem.
pub trait ProfileStore: Send + Sync {
    fn get(&self, user_id: &UserId) -> Result<Option<CitizenProfile>, RepositoryError>;
}

/// Read access to the scheme catalog.
pub trait SchemeCatalog: Send + Sync {
    fn get_all(&self) -> Result<Vec<Scheme>, RepositoryError>;
    fn get_by_id(&self, id: &SchemeId) -> Result<Option<Scheme>, RepositoryError>;
    fn search(&self, query: &str) -> Result<Vec<Scheme>, RepositoryError>;
}

/// Persistence for generated recommendations.
pub trait RecommendationStore: Send + Sync {
    fn delete_all_for_user(&self, user_id: &UserId) -> Result<(), RepositoryError>;
    fn create(&self, record: NewRecommendation) -> Result<Recommendation, RepositoryError>;
    fn get_all_for_user(&self, user_id: &UserId) -> Result<Vec<Recommendation>, RepositoryError>;

    /// Swap the user's recommendations for a fresh batch.
    ///
    /// The default runs delete then create and is not atomic; stores that can should
    /// override it so readers never see a half-written batch.
    fn replace_for_user(
        &self,
        user_id: &UserId,
        records: Vec<NewRecommendation>,
    ) -> Result<Vec<Recommendation>, RepositoryError> {
        self.delete_all_for_user(user_id)?;
        records
            .into_iter()
            .map(|record| self.create(record))
            .collect()
    }
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
