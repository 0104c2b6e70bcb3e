mod age;
mod config;
mod rules;

pub use age::age_on;
pub use config::EligibilityPolicy;
pub use rules::{CriterionCheck, CriterionKind};

use super::domain::{CitizenProfile, Scheme};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stateless evaluator applying scheme predicates to a citizen profile.
#[derive(Debug, Clone, Default)]
pub struct EligibilityEngine {
    policy: EligibilityPolicy,
}

impl EligibilityEngine {
    pub fn new(policy: EligibilityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    /// Per-criterion breakdown behind [`EligibilityEngine::evaluate`], in evaluation order.
    pub fn checks(
        &self,
        profile: &CitizenProfile,
        scheme: &Scheme,
        today: NaiveDate,
    ) -> Vec<CriterionCheck> {
        rules::applicable_checks(profile, scheme, today)
    }

    /// Evaluate one scheme. Pure: the same inputs always yield the same result.
    pub fn evaluate(
        &self,
        profile: &CitizenProfile,
        scheme: &Scheme,
        today: NaiveDate,
    ) -> EligibilityResult {
        let checks = self.checks(profile, scheme, today);
        let total = checks.len();
        let satisfied = checks.iter().filter(|check| check.satisfied).count();

        // A scheme has to declare at least one constraint to be matchable.
        let score = if total > 0 {
            satisfied as f64 / total as f64
        } else {
            0.0
        };

        let (met, missed): (Vec<_>, Vec<_>) =
            checks.into_iter().partition(|check| check.satisfied);

        EligibilityResult {
            eligible: score >= self.policy.eligible_threshold,
            score,
            reasons: met.into_iter().map(|check| check.message).collect(),
            missing_criteria: missed.into_iter().map(|check| check.message).collect(),
        }
    }

    /// Shortlist the catalog for a profile, best match first.
    ///
    /// Ties keep catalog order.
    pub fn filter_eligible(
        &self,
        profile: &CitizenProfile,
        catalog: &[Scheme],
        today: NaiveDate,
    ) -> Vec<ScoredScheme> {
        let mut shortlist: Vec<ScoredScheme> = catalog
            .iter()
            .map(|scheme| ScoredScheme {
                eligibility: self.evaluate(profile, scheme, today),
                scheme: scheme.clone(),
            })
            .filter(|scored| self.retains(&scored.eligibility))
            .collect();

        shortlist.sort_by(|a, b| b.eligibility.score.total_cmp(&a.eligibility.score));
        shortlist
    }

    pub fn retains(&self, result: &EligibilityResult) -> bool {
        result.eligible || result.score >= self.policy.shortlist_threshold
    }
}

/// Rule-based verdict for one (profile, scheme) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResult {
    pub eligible: bool,
    pub score: f64,
    pub reasons: Vec<String>,
    pub missing_criteria: Vec<String>,
}

/// Catalog entry paired with its rule-based verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredScheme {
    pub scheme: Scheme,
    pub eligibility: EligibilityResult,
}
