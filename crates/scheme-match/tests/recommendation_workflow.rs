use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use scheme_match::catalog::{self, SchemeCatalogImporter, SchemeFilters};
use scheme_match::recommendations::{
    combine, CitizenProfile, EligibilityEngine, EligibilityPolicy, EligibilityStatus,
    NewRecommendation, ProfileStore, Recommendation, RecommendationId, RecommendationService,
    RecommendationStore, RepositoryError, RuleOnlyScorer, Scheme, SchemeCatalog, SchemeId, UserId,
};

fn evaluation_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 24).expect("valid evaluation date")
}

fn bundled_catalog() -> Vec<Scheme> {
    catalog::sample_catalog().expect("bundled catalog imports")
}

fn odisha_farmer() -> CitizenProfile {
    CitizenProfile {
        user_id: UserId("farmer-odisha".to_string()),
        date_of_birth: NaiveDate::from_ymd_opt(1978, 11, 2),
        category: Some("OBC".to_string()),
        occupation: Some("Farmer".to_string()),
        state: "Odisha".to_string(),
        annual_income: Some(120_000),
        has_disability: false,
        family_size: Some(5),
        education: None,
    }
}

struct Profiles(Vec<CitizenProfile>);

impl ProfileStore for Profiles {
    fn get(&self, user_id: &UserId) -> Result<Option<CitizenProfile>, RepositoryError> {
        Ok(self.0.iter().find(|p| &p.user_id == user_id).cloned())
    }
}

struct Catalog(Vec<Scheme>);

impl SchemeCatalog for Catalog {
    fn get_all(&self) -> Result<Vec<Scheme>, RepositoryError> {
        Ok(self.0.clone())
    }

    fn get_by_id(&self, id: &SchemeId) -> Result<Option<Scheme>, RepositoryError> {
        Ok(self.0.iter().find(|scheme| &scheme.id == id).cloned())
    }

    fn search(&self, query: &str) -> Result<Vec<Scheme>, RepositoryError> {
        Ok(self
            .0
            .iter()
            .filter(|scheme| catalog::matches_query(scheme, query))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct Store {
    rows: Mutex<HashMap<UserId, Vec<Recommendation>>>,
}

impl RecommendationStore for Store {
    fn delete_all_for_user(&self, user_id: &UserId) -> Result<(), RepositoryError> {
        self.rows.lock().expect("lock").remove(user_id);
        Ok(())
    }

    fn create(&self, record: NewRecommendation) -> Result<Recommendation, RepositoryError> {
        let mut rows = self.rows.lock().expect("lock");
        let entry = rows.entry(record.user_id.clone()).or_default();
        let row = Recommendation {
            id: RecommendationId(format!("{}-{}", record.user_id, entry.len() + 1)),
            user_id: record.user_id,
            scheme_id: record.scheme_id,
            score: record.score,
            reasoning: record.reasoning,
            eligibility_status: record.eligibility_status,
            generated_at: Utc::now(),
        };
        entry.push(row.clone());
        Ok(row)
    }

    fn get_all_for_user(&self, user_id: &UserId) -> Result<Vec<Recommendation>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .expect("lock")
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[test]
fn importer_reads_catalog_from_disk() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/schemes.csv");

    let schemes = SchemeCatalogImporter::from_path(path).expect("catalog imports");

    assert_eq!(schemes, bundled_catalog());
}

#[test]
fn bundled_catalog_imports_every_scheme() {
    let schemes = bundled_catalog();

    assert_eq!(schemes.len(), 8);
    let pmay = schemes
        .iter()
        .find(|scheme| scheme.id.0 == "pmay-g")
        .expect("pmay present");
    assert_eq!(pmay.max_income, Some(300_000));
    assert_eq!(pmay.target_categories.len(), 4);
}

#[test]
fn farmer_shortlist_prefers_state_specific_support() {
    let engine = EligibilityEngine::new(EligibilityPolicy::standard());

    let shortlist = engine.filter_eligible(&odisha_farmer(), &bundled_catalog(), evaluation_date());

    let ids: Vec<&str> = shortlist
        .iter()
        .map(|scored| scored.scheme.id.0.as_str())
        .collect();
    assert!(ids.contains(&"pm-kisan"));
    assert!(ids.contains(&"kalia"));
    assert!(!ids.contains(&"nsap-ignoaps"));
    assert!(!ids.contains(&"post-matric-sc"));
    assert!(shortlist.iter().all(|scored| scored.eligibility.score >= 0.5));
}

#[test]
fn rule_only_combination_preserves_shortlist() {
    let engine = EligibilityEngine::new(EligibilityPolicy::standard());
    let shortlist = engine.filter_eligible(&odisha_farmer(), &bundled_catalog(), evaluation_date());

    let combined = combine(&shortlist, &[]);

    assert_eq!(combined.len(), shortlist.len());
    for (entry, scored) in combined.iter().zip(&shortlist) {
        assert_eq!(entry.scheme_id, scored.scheme.id);
        assert_eq!(entry.score, scored.eligibility.score);
    }
}

#[tokio::test]
async fn refresh_cycle_through_public_service() {
    let store = Arc::new(Store::default());
    let service = RecommendationService::new(
        Arc::new(Profiles(vec![odisha_farmer()])),
        Arc::new(Catalog(bundled_catalog())),
        store.clone(),
        Arc::new(RuleOnlyScorer),
    )
    .with_evaluation_date(evaluation_date());
    let user_id = UserId("farmer-odisha".to_string());

    let first = service.generate(&user_id).await.expect("generated");
    let second = service.refresh(&user_id).await.expect("refreshed");

    assert!(!first.is_empty());
    assert_eq!(first.len(), second.len());
    assert_eq!(
        store.get_all_for_user(&user_id).expect("stored").len(),
        second.len()
    );
    assert!(second
        .iter()
        .any(|rec| rec.scheme.id.0 == "kalia" && rec.eligibility_status == EligibilityStatus::Eligible));
}

#[test]
fn catalog_browsing_filters_by_state_and_income() {
    let catalog = Catalog(bundled_catalog());
    let filters = SchemeFilters {
        state: Some("Kerala".to_string()),
        max_income: Some(250_000),
        ..SchemeFilters::default()
    };

    let schemes = catalog::filter_schemes(&catalog, &filters).expect("filtered");

    let ids: Vec<&str> = schemes.iter().map(|scheme| scheme.id.0.as_str()).collect();
    assert!(ids.contains(&"life-mission"));
    assert!(!ids.contains(&"kalia"));
    assert!(!ids.contains(&"nsap-ignoaps"));
}
