//! Language-model scoring of citizen/scheme matches.
//!
//! The oracle is treated as fallible and non-deterministic: every failure mode collapses
//! into an empty result so callers always fall back to rule-based recommendations.

mod openai;
mod prompt;

pub use openai::OpenAiOracle;
pub use prompt::{build_prompt, parse_response};

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::{CitizenProfile, EligibilityStatus, Scheme, SchemeId};

/// Per-scheme opinion returned by the oracle after validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRecommendation {
    pub scheme_id: SchemeId,
    pub score: f64,
    pub eligibility_status: EligibilityStatus,
    pub reasoning: String,
}

/// Raw text completion backend.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Produces AI recommendations for a profile. Never fails; degraded scorers return nothing.
#[async_trait]
pub trait SchemeScorer: Send + Sync {
    async fn score(
        &self,
        profile: &CitizenProfile,
        schemes: &[Scheme],
        today: NaiveDate,
    ) -> Vec<AiRecommendation>;
}

/// Oracle failure; always recovered inside the adapter.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle credentials are not configured")]
    NotConfigured,
    #[error("oracle transport failed: {0}")]
    Transport(String),
    #[error("oracle returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("oracle response malformed: {0}")]
    Malformed(String),
    #[error("oracle timed out after {0:?}")]
    Timeout(Duration),
}

/// Adapter bounding prompt size and call duration around a [`ScoringOracle`].
pub struct AiSchemeScorer<O> {
    oracle: O,
    timeout: Duration,
    max_schemes: usize,
}

impl<O> AiSchemeScorer<O>
where
    O: ScoringOracle,
{
    pub fn new(oracle: O, timeout: Duration, max_schemes: usize) -> Self {
        Self {
            oracle,
            timeout,
            max_schemes: max_schemes.max(1),
        }
    }

    async fn try_score(
        &self,
        profile: &CitizenProfile,
        schemes: &[Scheme],
        today: NaiveDate,
    ) -> Result<Vec<AiRecommendation>, OracleError> {
        let batch = &schemes[..schemes.len().min(self.max_schemes)];
        if batch.len() < schemes.len() {
            debug!(
                sent = batch.len(),
                catalog = schemes.len(),
                "truncating scheme list for oracle prompt"
            );
        }

        let prompt = build_prompt(profile, batch, today);
        let raw = tokio::time::timeout(self.timeout, self.oracle.complete(&prompt))
            .await
            .map_err(|_| OracleError::Timeout(self.timeout))??;

        parse_response(&raw, batch)
    }
}

#[async_trait]
impl<O> SchemeScorer for AiSchemeScorer<O>
where
    O: ScoringOracle,
{
    async fn score(
        &self,
        profile: &CitizenProfile,
        schemes: &[Scheme],
        today: NaiveDate,
    ) -> Vec<AiRecommendation> {
        if schemes.is_empty() {
            return Vec::new();
        }

        match self.try_score(profile, schemes, today).await {
            Ok(recommendations) => recommendations,
            Err(error) => {
                warn!(
                    %error,
                    user_id = %profile.user_id,
                    "AI scoring unavailable, using rule-based results only"
                );
                Vec::new()
            }
        }
    }
}

/// Scorer used when no oracle is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleOnlyScorer;

#[async_trait]
impl SchemeScorer for RuleOnlyScorer {
    async fn score(
        &self,
        _profile: &CitizenProfile,
        _schemes: &[Scheme],
        _today: NaiveDate,
    ) -> Vec<AiRecommendation> {
        Vec::new()
    }
}
