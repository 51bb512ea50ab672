use async_trait::async_trait;
use restaurant_recommender::error::{SearchError, ServiceError, StoreError};
use restaurant_recommender::models::category::CategoryMatch;
use restaurant_recommender::models::db::{Database, RecordStore, StoreResult};
use restaurant_recommender::models::restaurant::{Restaurant, UserRecord};
use restaurant_recommender::services::memory::MemoryDatabase;
use restaurant_recommender::services::recommender::{Recommender, MAX_RECOMMENDED};
use restaurant_recommender::services::search::RestaurantSearch;
use restaurant_recommender::services::yelp::NearbySearch;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

fn restaurant(id: &str, categories: &str, stars: f64) -> Restaurant {
    Restaurant {
        business_id: id.to_string(),
        name: format!("Restaurant {}", id),
        categories: categories.to_string(),
        city: "San Francisco".to_string(),
        state: "CA".to_string(),
        stars,
        full_address: "1 Market St,San Francisco, CA 94105".to_string(),
        latitude: 37.79,
        longitude: -122.39,
        image_url: String::new(),
        url: format!("https://www.yelp.com/biz/{}", id),
    }
}

struct FakeSearch {
    results: Vec<Restaurant>,
    fail: bool,
}

#[async_trait]
impl NearbySearch for FakeSearch {
    async fn search(&self, _latitude: f64, _longitude: f64) -> Result<Vec<Restaurant>, SearchError> {
        if self.fail {
            return Err(SearchError::Status {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }
        Ok(self.results.clone())
    }
}

/// Memory store whose restaurant lookups fail for one business ID.
struct FlakyStore {
    inner: MemoryDatabase,
    broken_id: String,
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn record_visit(&mut self, user_id: &str, business_id: &str) -> StoreResult<()> {
        self.inner.record_visit(user_id, business_id).await
    }
    async fn remove_visit(&mut self, user_id: &str, business_id: &str) -> StoreResult<()> {
        self.inner.remove_visit(user_id, business_id).await
    }
    async fn visited(&mut self, user_id: &str) -> StoreResult<HashSet<String>> {
        self.inner.visited(user_id).await
    }
    async fn visited_by_time(&mut self, user_id: &str) -> StoreResult<Vec<String>> {
        self.inner.visited_by_time(user_id).await
    }
    async fn restaurant(&mut self, business_id: &str) -> StoreResult<Option<Restaurant>> {
        if business_id == self.broken_id {
            return Err(StoreError::Query("row decode failed".to_string()));
        }
        self.inner.restaurant(business_id).await
    }
    async fn categories(&mut self, business_id: &str) -> StoreResult<BTreeSet<String>> {
        self.inner.categories(business_id).await
    }
    async fn business_ids_by_category(
        &mut self,
        category: &str,
        mode: CategoryMatch,
    ) -> StoreResult<BTreeSet<String>> {
        self.inner.business_ids_by_category(category, mode).await
    }
    async fn upsert_restaurant(&mut self, restaurant: &Restaurant) -> StoreResult<bool> {
        self.inner.upsert_restaurant(restaurant).await
    }
    async fn insert_user(&mut self, user: &UserRecord) -> StoreResult<bool> {
        self.inner.insert_user(user).await
    }
    async fn credential_hash(&mut self, user_id: &str) -> StoreResult<Option<String>> {
        self.inner.credential_hash(user_id).await
    }
    async fn user_name(&mut self, user_id: &str) -> StoreResult<Option<(String, String)>> {
        self.inner.user_name(user_id).await
    }
    async fn close(&mut self) -> StoreResult<()> {
        self.inner.close().await
    }
}

fn recommender(db: &Database) -> Recommender {
    Recommender::new(db.clone(), CategoryMatch::Substring)
}

fn search_with(db: &Database, nearby: Vec<Restaurant>, fail: bool) -> RestaurantSearch {
    RestaurantSearch::new(
        db.clone(),
        Arc::new(FakeSearch {
            results: nearby,
            fail,
        }),
    )
}

async fn seed(db: &Database, restaurants: &[Restaurant]) {
    for r in restaurants {
        db.upsert_restaurant(r).await.unwrap();
    }
}

fn ids(views: &[restaurant_recommender::models::restaurant::RestaurantView]) -> Vec<&str> {
    views.iter().map(|v| v.business_id()).collect()
}

#[tokio::test]
async fn user_without_history_gets_nothing() {
    let db = Database::from_store(MemoryDatabase::new());
    seed(&db, &[restaurant("a", "Sushi", 4.0)]).await;
    let recommender = recommender(&db);

    assert!(recommender.recommend("newcomer").await.unwrap().is_empty());
}

#[tokio::test]
async fn most_frequent_category_is_expanded_first() {
    let db = Database::from_store(MemoryDatabase::new());
    seed(
        &db,
        &[
            restaurant("visited-a", "Sushi,Bars", 4.0),
            restaurant("visited-b", "Sushi", 3.5),
            restaurant("z-sushi-spot", "Sushi", 4.5),
            restaurant("a-dive-bar", "Bars", 3.0),
            restaurant("pizza-place", "Pizza", 5.0),
        ],
    )
    .await;
    db.record_visit("u1", "visited-a").await.unwrap();
    db.record_visit("u1", "visited-b").await.unwrap();

    let recommender = recommender(&db);
    let recommendations = recommender.recommend("u1").await.unwrap();

    assert_eq!(ids(&recommendations), vec!["z-sushi-spot", "a-dive-bar"]);
    assert!(recommendations.iter().all(|v| !v.is_visited));
}

#[tokio::test]
async fn output_is_capped_and_excludes_visited() {
    let db = Database::from_store(MemoryDatabase::new());
    let mut all = Vec::new();
    for i in 0..25 {
        all.push(restaurant(&format!("sushi-{:02}", i), "Sushi", 4.0));
    }
    seed(&db, &all).await;
    for i in 0..5 {
        db.record_visit("u1", &format!("sushi-{:02}", i)).await.unwrap();
    }

    let recommender = recommender(&db);
    let recommendations = recommender.recommend("u1").await.unwrap();
    let visited = db.visited("u1").await.unwrap();

    assert_eq!(recommendations.len(), MAX_RECOMMENDED);
    assert!(recommendations
        .iter()
        .all(|v| !visited.contains(v.business_id())));
    assert_eq!(recommendations[0].business_id(), "sushi-05");
}

#[tokio::test]
async fn failed_enrichment_is_skipped_not_fatal() {
    let db = Database::from_store(FlakyStore {
        inner: MemoryDatabase::new(),
        broken_id: "broken".to_string(),
    });
    seed(
        &db,
        &[
            restaurant("home", "Tacos", 4.0),
            restaurant("broken", "Tacos", 4.0),
            restaurant("fine", "Tacos", 4.0),
        ],
    )
    .await;
    db.record_visit("u1", "home").await.unwrap();

    let recommender = recommender(&db);
    let recommendations = recommender.recommend("u1").await.unwrap();

    assert_eq!(ids(&recommendations), vec!["fine"]);
}

#[tokio::test]
async fn unreachable_store_is_an_error_not_an_empty_list() {
    let db = Database::from_store(MemoryDatabase::new());
    db.close().await.unwrap();
    let recommender = recommender(&db);

    assert!(matches!(
        recommender.recommend("u1").await,
        Err(ServiceError::Storage(StoreError::Closed))
    ));
}

#[tokio::test]
async fn nearby_recommendations_stay_inside_the_nearby_set() {
    let db = Database::from_store(MemoryDatabase::new());
    seed(
        &db,
        &[
            restaurant("home", "Ramen", 4.0),
            restaurant("far-ramen", "Ramen", 5.0),
        ],
    )
    .await;
    db.record_visit("u1", "home").await.unwrap();

    // The search result is new to the store and gets cached by the search.
    let nearby = vec![
        restaurant("near-ramen", "Ramen,Noodles", 4.0),
        restaurant("near-burger", "Burgers", 4.5),
        restaurant("home", "Ramen", 4.0),
    ];
    let recommender = recommender(&db);
    let search = search_with(&db, nearby, false);

    let recommendations = recommender
        .recommend_nearby(&search, "u1", 37.79, -122.39)
        .await
        .unwrap();
    assert_eq!(ids(&recommendations), vec!["near-ramen"]);

    // Without the location filter the far restaurant also qualifies.
    let everywhere = recommender.recommend("u1").await.unwrap();
    assert_eq!(ids(&everywhere), vec!["far-ramen", "near-ramen"]);
}

#[tokio::test]
async fn nearby_recommendation_surfaces_search_failures() {
    let db = Database::from_store(MemoryDatabase::new());
    let recommender = recommender(&db);
    let search = search_with(&db, Vec::new(), true);

    assert!(matches!(
        recommender.recommend_nearby(&search, "u1", 0.0, 0.0).await,
        Err(ServiceError::ExternalService(SearchError::Status { status: 503, .. }))
    ));
}

#[tokio::test]
async fn search_orders_by_rating_and_caches_results() {
    let db = Database::from_store(MemoryDatabase::new());
    db.record_visit("u1", "c").await.unwrap();
    // Already cached with different values; the search must not overwrite it.
    seed(&db, &[restaurant("c", "Old Category", 1.0)]).await;

    let search = search_with(
        &db,
        vec![
            restaurant("a", "Thai", 3.0),
            restaurant("b", "Thai", 4.5),
            restaurant("c", "Thai", 3.0),
            restaurant("d", "Thai", 5.0),
        ],
        false,
    );

    let views = search.search_nearby("u1", 37.79, -122.39).await.unwrap();
    assert_eq!(ids(&views), vec!["d", "b", "a", "c"]);
    let flags: Vec<bool> = views.iter().map(|v| v.is_visited).collect();
    assert_eq!(flags, vec![false, false, false, true]);

    assert!(db.restaurant("a").await.unwrap().is_some());
    let kept = db.restaurant("c").await.unwrap().unwrap();
    assert_eq!(kept.categories, "Old Category");
}

#[tokio::test]
async fn credentials_are_hashed_and_checked() {
    let db = Database::from_store(MemoryDatabase::new());
    assert!(db.register_user("1111", "secret", "John", "Smith").await.unwrap());
    assert!(!db.register_user("1111", "other", "Jane", "Doe").await.unwrap());

    assert!(db.verify_credentials("1111", "secret").await.unwrap());
    assert!(!db.verify_credentials("1111", "wrong").await.unwrap());
    assert!(!db.verify_credentials("nobody", "secret").await.unwrap());

    assert_eq!(db.display_name("1111").await.unwrap(), "John Smith");
    assert_eq!(db.display_name("nobody").await.unwrap(), "");
}

#[tokio::test]
async fn history_views_follow_visit_order() {
    let db = Database::from_store(MemoryDatabase::new());
    seed(&db, &[restaurant("a", "Thai", 3.0), restaurant("b", "Thai", 4.0)]).await;
    db.record_visits("u1", &["a".to_string(), "b".to_string(), "ghost".to_string()])
        .await
        .unwrap();

    let history = db.history_views("u1").await.unwrap();
    assert_eq!(ids(&history), vec!["b", "a"]);
    assert!(history.iter().all(|v| v.is_visited));

    db.remove_visits("u1", &["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(db.visited_by_time("u1").await.unwrap(), vec!["ghost"]);
}
