use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::domain::{EligibilityStatus, SchemeId};
use super::eligibility::{EligibilityResult, ScoredScheme};
use super::scorer::AiRecommendation;

const RULE_WEIGHT: f64 = 0.6;
const AI_WEIGHT: f64 = 0.4;
/// Confidence discount applied when only the oracle vouches for a scheme.
const AI_ONLY_DISCOUNT: f64 = 0.8;
const MINIMUM_SCORE: f64 = 0.3;
const MAX_RECOMMENDATIONS: usize = 20;
const AI_ANALYSIS_PREFIX: &str = "AI Analysis: ";

/// Fused per-scheme verdict ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedRecommendation {
    pub scheme_id: SchemeId,
    pub score: f64,
    pub reasoning: String,
    pub eligibility_status: EligibilityStatus,
}

/// Merge rule-based and AI verdicts by scheme id.
///
/// Rule results seed the ranking; the oracle adjusts their score with a 0.6/0.4 blend and may
/// add schemes the rules skipped at a discount. Entries under 0.3 are dropped and at most 20
/// are returned, best first with ties in insertion order.
pub fn combine(
    rule_results: &[ScoredScheme],
    ai_results: &[AiRecommendation],
) -> Vec<CombinedRecommendation> {
    let mut merged: Vec<CombinedRecommendation> =
        Vec::with_capacity(rule_results.len() + ai_results.len());
    let mut positions: HashMap<SchemeId, usize> = HashMap::new();

    for scored in rule_results {
        let entry = CombinedRecommendation {
            scheme_id: scored.scheme.id.clone(),
            score: scored.eligibility.score,
            reasoning: rule_reasoning(&scored.eligibility),
            eligibility_status: if scored.eligibility.eligible {
                EligibilityStatus::Eligible
            } else {
                EligibilityStatus::PartiallyEligible
            },
        };
        upsert(&mut merged, &mut positions, entry);
    }

    for ai in ai_results {
        match positions.get(&ai.scheme_id) {
            Some(&index) => {
                let existing = &mut merged[index];
                existing.score = existing.score * RULE_WEIGHT + ai.score * AI_WEIGHT;
                existing.reasoning = format!(
                    "{}\n\n{AI_ANALYSIS_PREFIX}{}",
                    existing.reasoning, ai.reasoning
                );
                if ai.eligibility_status.priority() > existing.eligibility_status.priority() {
                    existing.eligibility_status = ai.eligibility_status;
                }
            }
            None => {
                let entry = CombinedRecommendation {
                    scheme_id: ai.scheme_id.clone(),
                    score: ai.score * AI_ONLY_DISCOUNT,
                    reasoning: format!("{AI_ANALYSIS_PREFIX}{}", ai.reasoning),
                    eligibility_status: ai.eligibility_status,
                };
                upsert(&mut merged, &mut positions, entry);
            }
        }
    }

    merged.retain(|entry| entry.score >= MINIMUM_SCORE);
    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged.truncate(MAX_RECOMMENDATIONS);
    merged
}

fn upsert(
    merged: &mut Vec<CombinedRecommendation>,
    positions: &mut HashMap<SchemeId, usize>,
    entry: CombinedRecommendation,
) {
    match positions.get(&entry.scheme_id) {
        Some(&index) => merged[index] = entry,
        None => {
            positions.insert(entry.scheme_id.clone(), merged.len());
            merged.push(entry);
        }
    }
}

/// Bulleted explanation: satisfied criteria first, then the ones still missing.
pub fn rule_reasoning(result: &EligibilityResult) -> String {
    let mut sections = Vec::new();

    if !result.reasons.is_empty() {
        let mut section = String::from("✅ Criteria met:");
        for reason in &result.reasons {
            section.push_str("\n• ");
            section.push_str(reason);
        }
        sections.push(section);
    }

    if !result.missing_criteria.is_empty() {
        let mut section = String::from("⚠️ Criteria to review:");
        for missing in &result.missing_criteria {
            section.push_str("\n• ");
            section.push_str(missing);
        }
        sections.push(section);
    }

    sections.join("\n")
}
