use crate::error::ServiceError;
use crate::models::db::Database;
use crate::models::restaurant::RestaurantView;
use crate::services::yelp::NearbySearch;
use std::sync::Arc;

#[derive(Clone)]
pub struct RestaurantSearch {
    db: Database,
    search: Arc<dyn NearbySearch + Send + Sync>,
}

impl RestaurantSearch {
    pub fn new(db: Database, search: Arc<dyn NearbySearch + Send + Sync>) -> Self {
        RestaurantSearch { db, search }
    }

    // Highest rated first; every result is cached in the store
    pub async fn search_nearby(
        &self,
        user_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<RestaurantView>, ServiceError> {
        let restaurants = self.search.search(latitude, longitude).await?;
        let visited = self.db.visited(user_id).await?;

        let mut views = Vec::with_capacity(restaurants.len());
        for restaurant in restaurants {
            self.db.upsert_restaurant(&restaurant).await?;
            let is_visited = visited.contains(&restaurant.business_id);
            views.push(restaurant.into_view(is_visited));
        }

        // sort_by is stable, so API order survives within a rating
        views.sort_by(|a, b| b.restaurant.stars.total_cmp(&a.restaurant.stars));
        log::debug!(
            "Found {} restaurants near ({}, {}) for {}",
            views.len(),
            latitude,
            longitude,
            user_id
        );
        Ok(views)
    }
}
