use crate::infra::{
    build_scorer, load_catalog, InMemoryProfileStore, InMemoryRecommendationStore,
    InMemorySchemeCatalog,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use scheme_match::config::{AiConfig, AppConfig};
use scheme_match::error::AppError;
use scheme_match::recommendations::{
    CitizenProfile, EligibilityEngine, RecommendationService, RecommendationServiceError,
    RecommendationWithScheme, Scheme, SchemeScorer, UserId,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct RecommendArgs {
    /// Citizen profile JSON (camelCase fields, `userId` and `state` required)
    #[arg(long)]
    pub(crate) profile: PathBuf,
    /// Scheme catalog CSV (defaults to the bundled sample)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Evaluation date for age checks (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation date for age checks (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) async fn run_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let RecommendArgs {
        profile,
        catalog,
        today,
    } = args;

    let raw = std::fs::read_to_string(&profile)?;
    let profile: CitizenProfile = serde_json::from_str(&raw).map_err(AppError::Profile)?;
    let schemes = load_catalog(catalog.as_deref())?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let scorer = build_scorer(&AppConfig::load()?.ai);

    let recommendations = recommend(profile.clone(), schemes, scorer, today).await?;
    render_recommendations(&profile, &recommendations, today);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let schemes = load_catalog(None)?;
    let engine = EligibilityEngine::default();

    println!("Scheme matching demo");
    println!("Catalog: {} schemes, evaluated on {}", schemes.len(), today);

    for profile in sample_profiles() {
        render_checks(&engine, &profile, &schemes, today);
        let scorer = build_scorer(&AiConfig::default());
        let recommendations = recommend(profile.clone(), schemes.clone(), scorer, today).await?;
        render_recommendations(&profile, &recommendations, today);
    }

    Ok(())
}

async fn recommend(
    profile: CitizenProfile,
    schemes: Vec<Scheme>,
    scorer: Arc<dyn SchemeScorer>,
    today: NaiveDate,
) -> Result<Vec<RecommendationWithScheme>, AppError> {
    let user_id = profile.user_id.clone();
    let profiles = InMemoryProfileStore::default();
    profiles
        .upsert(profile)
        .map_err(RecommendationServiceError::from)?;

    let service = RecommendationService::new(
        Arc::new(profiles),
        Arc::new(InMemorySchemeCatalog::new(schemes)),
        Arc::new(InMemoryRecommendationStore::default()),
        scorer,
    )
    .with_evaluation_date(today);

    Ok(service.generate(&user_id).await?)
}

fn render_checks(
    engine: &EligibilityEngine,
    profile: &CitizenProfile,
    schemes: &[Scheme],
    today: NaiveDate,
) {
    println!("\nRule checks for {} ({})", profile.user_id, profile.state);
    for scheme in schemes {
        let result = engine.evaluate(profile, scheme, today);
        let checks = engine.checks(profile, scheme, today);
        let met = checks.iter().filter(|check| check.satisfied).count();
        println!(
            "  {:<42} {}/{} criteria  score {:.2}{}",
            scheme.name,
            met,
            checks.len(),
            result.score,
            if engine.retains(&result) {
                ""
            } else {
                "  (not shortlisted)"
            }
        );
    }
}

fn render_recommendations(
    profile: &CitizenProfile,
    recommendations: &[RecommendationWithScheme],
    today: NaiveDate,
) {
    println!(
        "\nRecommendations for {} as of {} ({} total)",
        profile.user_id,
        today,
        recommendations.len()
    );
    if recommendations.is_empty() {
        println!("  No scheme matched closely enough.");
        return;
    }

    for (rank, recommendation) in recommendations.iter().enumerate() {
        println!(
            "{:>3}. {} [{}] score {:.2} ({})",
            rank + 1,
            recommendation.scheme.name,
            recommendation.scheme.category,
            recommendation.score,
            recommendation.eligibility_status.label()
        );
        for line in recommendation.reasoning.lines() {
            println!("       {line}");
        }
    }
}

fn sample_profiles() -> Vec<CitizenProfile> {
    vec![
        CitizenProfile {
            user_id: UserId("demo-farmer".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(1978, 11, 2),
            category: Some("OBC".to_string()),
            occupation: Some("Farmer".to_string()),
            state: "Odisha".to_string(),
            annual_income: Some(120_000),
            has_disability: false,
            family_size: Some(5),
            education: Some("Secondary".to_string()),
        },
        CitizenProfile {
            user_id: UserId("demo-student".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(2004, 4, 18),
            category: Some("SC".to_string()),
            occupation: Some("Student".to_string()),
            state: "Kerala".to_string(),
            annual_income: Some(90_000),
            has_disability: false,
            family_size: Some(4),
            education: Some("Higher Secondary".to_string()),
        },
    ]
}
