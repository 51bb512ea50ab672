use crate::error::ServiceError;
use crate::models::category::{CategoryFrequency, CategoryMatch};
use crate::models::db::Database;
use crate::models::restaurant::RestaurantView;
use crate::services::search::RestaurantSearch;
use std::collections::HashSet;

pub const MAX_RECOMMENDED: usize = 10;

pub struct Recommender {
    db: Database,
    category_match: CategoryMatch,
}

impl Recommender {
    pub fn new(db: Database, category_match: CategoryMatch) -> Self {
        Recommender { db, category_match }
    }

    pub async fn recommend(&self, user_id: &str) -> Result<Vec<RestaurantView>, ServiceError> {
        let candidates = self.candidates(user_id, None).await?;
        Ok(self.enrich(candidates).await)
    }

    // Same as recommend, restricted to the results of a live nearby search
    pub async fn recommend_nearby(
        &self,
        search: &RestaurantSearch,
        user_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<RestaurantView>, ServiceError> {
        let nearby: HashSet<String> = search
            .search_nearby(user_id, latitude, longitude)
            .await?
            .into_iter()
            .map(|view| view.restaurant.business_id)
            .collect();
        let candidates = self.candidates(user_id, Some(&nearby)).await?;
        Ok(self.enrich(candidates).await)
    }

    async fn candidates(
        &self,
        user_id: &str,
        nearby: Option<&HashSet<String>>,
    ) -> Result<Vec<String>, ServiceError> {
        let visited = self.db.visited(user_id).await?;

        let mut frequency = CategoryFrequency::new();
        for business_id in &visited {
            frequency.record(self.db.categories(business_id).await?);
        }
        if frequency.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for (category, count) in frequency.ranked() {
            log::debug!("Expanding category {} ({} visits)", category, count);
            let business_ids = self
                .db
                .business_ids_by_category(&category, self.category_match)
                .await?;
            for business_id in business_ids {
                if seen.insert(business_id.clone()) {
                    ordered.push(business_id);
                }
            }
        }

        Ok(ordered
            .into_iter()
            .filter(|id| !visited.contains(id))
            .filter(|id| nearby.map_or(true, |set| set.contains(id)))
            .take(MAX_RECOMMENDED)
            .collect())
    }

    async fn enrich(&self, business_ids: Vec<String>) -> Vec<RestaurantView> {
        let mut views = Vec::with_capacity(business_ids.len());
        for business_id in business_ids {
            match self.db.restaurant_view(&business_id, false).await {
                Ok(Some(view)) => views.push(view),
                Ok(None) => log::warn!("Recommended restaurant {} disappeared", business_id),
                Err(e) => log::warn!("Skipping recommendation {}: {}", business_id, e),
            }
        }
        views
    }
}
