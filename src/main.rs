use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use wic_ledger::{
    config::{database, program, seed},
    core::{
        eligibility::Evaluator,
        monthly,
        period::{Clock, SystemClock},
        report,
    },
    errors::Result,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars may also be set externally
    if dotenv().is_err() {
        warn!("No .env file loaded");
    }

    // 3. Load the program configuration
    let app_config = program::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;

    // 4. Build the scan evaluator from the configured size rules
    let evaluator = Evaluator::new(app_config.rule_set());
    info!(
        size_rules = evaluator.rules().len(),
        configured = !app_config.size_rules.is_empty(),
        "Eligibility evaluator ready."
    );

    // 5. Connect and create tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    let clock = SystemClock;

    // 6. Issue last month's cards into this month before seeding
    if let Some(summary) = monthly::process_period_rollover(&db, &clock).await? {
        info!("{}", monthly::format_rollover_summary(&summary));
    }

    // 7. Seed catalog and current benefits
    let seeded = seed::seed_from_config(&db, &clock, &app_config)
        .await
        .inspect_err(|e| error!("Failed to seed database: {e}"))?;
    info!(
        products = seeded.products,
        approved_foods = seeded.approved_foods,
        cards = seeded.cards,
        "Seeding complete."
    );

    // 8. Report each configured card
    for card_number in &app_config.cards {
        let benefit_report = report::generate_benefit_report(
            &db,
            &clock,
            card_number,
            clock.current_period(),
            None,
        )
        .await?;
        info!("\n{}", report::format_benefit_report(&benefit_report));
    }

    Ok(())
}
