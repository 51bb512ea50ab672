use clap::Parser;
use restaurant_recommender::cli::Args;
use restaurant_recommender::config::{DbType, Settings};
use restaurant_recommender::error::ConfigError;
use restaurant_recommender::models::db::Database;
use restaurant_recommender::services::memory::MemoryDatabase;
use restaurant_recommender::services::mssql::SqlServerDatabase;
use restaurant_recommender::services::recommender::Recommender;
use restaurant_recommender::services::search::RestaurantSearch;
use restaurant_recommender::services::yelp::YelpClient;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let settings = Settings::from_env()?;

    let db = match settings.db_type {
        DbType::SqlServer => {
            let sql_settings = settings
                .sql_server
                .as_ref()
                .ok_or(ConfigError::Missing("DB_HOST"))?;
            let mut store = SqlServerDatabase::connect(sql_settings).await?;
            store.ensure_schema().await?;
            Database::from_store(store)
        }
        // Starts empty and lives for one run, so only useful as a smoke test
        DbType::Memory => {
            log::warn!("Using the in-memory store; there is no visit history to draw on");
            Database::from_store(MemoryDatabase::new())
        }
    };

    let recommender = Recommender::new(db.clone(), settings.category_match);

    let result = match args.location() {
        Some((lat, lon)) => match YelpClient::new(settings.yelp.clone()) {
            Ok(yelp) => {
                let search = RestaurantSearch::new(db.clone(), Arc::new(yelp));
                recommender
                    .recommend_nearby(&search, &args.user_id, lat, lon)
                    .await
            }
            Err(e) => Err(e.into()),
        },
        None => recommender.recommend(&args.user_id).await,
    };

    // Close the connection before reporting any failure
    db.close().await?;

    let recommendations = result?;
    log::info!(
        "Produced {} recommendations for {}",
        recommendations.len(),
        args.user_id
    );
    println!("{}", serde_json::to_string_pretty(&recommendations)?);

    Ok(())
}
