//! Citizen-to-scheme matching: rule evaluation, AI scoring, fusion and the stored
//! recommendation lifecycle.

pub(crate) mod combiner;
pub mod domain;
pub mod eligibility;
pub mod repository;
pub mod router;
pub mod scorer;
pub mod service;

#[cfg(test)]
mod tests;

pub use combiner::{combine, rule_reasoning, CombinedRecommendation};
pub use domain::{
    CitizenProfile, EligibilityCriteria, EligibilityStatus, HousingRequirement,
    NewRecommendation, Recommendation, RecommendationId, RecommendationWithScheme, Scheme,
    SchemeId, UserId,
};
pub use eligibility::{
    age_on, CriterionCheck, CriterionKind, EligibilityEngine, EligibilityPolicy,
    EligibilityResult, ScoredScheme,
};
pub use repository::{ProfileStore, RecommendationStore, RepositoryError, SchemeCatalog};
pub use router::recommendation_router;
pub use scorer::{
    AiRecommendation, AiSchemeScorer, OpenAiOracle, OracleError, RuleOnlyScorer, SchemeScorer,
    ScoringOracle,
};
pub use service::{RecommendationService, RecommendationServiceError};
