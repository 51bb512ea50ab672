use crate::error::StoreError;
use crate::models::category::CategoryMatch;
use crate::models::restaurant::{Restaurant, RestaurantView, UserRecord};
use crate::services::credentials;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type StoreResult<T> = Result<T, StoreError>;

// A missing row is None or an empty collection, never an error
#[async_trait]
pub trait RecordStore {
    async fn record_visit(&mut self, user_id: &str, business_id: &str) -> StoreResult<()>;
    async fn remove_visit(&mut self, user_id: &str, business_id: &str) -> StoreResult<()>;
    async fn visited(&mut self, user_id: &str) -> StoreResult<HashSet<String>>;
    async fn visited_by_time(&mut self, user_id: &str) -> StoreResult<Vec<String>>;

    async fn restaurant(&mut self, business_id: &str) -> StoreResult<Option<Restaurant>>;
    async fn categories(&mut self, business_id: &str) -> StoreResult<BTreeSet<String>>;
    async fn business_ids_by_category(
        &mut self,
        category: &str,
        mode: CategoryMatch,
    ) -> StoreResult<BTreeSet<String>>;
    // Insert-if-absent, existing rows are never overwritten
    async fn upsert_restaurant(&mut self, restaurant: &Restaurant) -> StoreResult<bool>;

    async fn insert_user(&mut self, user: &UserRecord) -> StoreResult<bool>;
    async fn credential_hash(&mut self, user_id: &str) -> StoreResult<Option<String>>;
    async fn user_name(&mut self, user_id: &str) -> StoreResult<Option<(String, String)>>;

    async fn close(&mut self) -> StoreResult<()>;
}

#[derive(Clone)]
pub struct Database {
    backend: Arc<Mutex<dyn RecordStore + Send + Sync>>,
}

impl Database {
    pub fn new(backend: Arc<Mutex<dyn RecordStore + Send + Sync>>) -> Self {
        Database { backend }
    }

    pub fn from_store<S>(store: S) -> Self
    where
        S: RecordStore + Send + Sync + 'static,
    {
        Database::new(Arc::new(Mutex::new(store)))
    }

    pub async fn record_visit(&self, user_id: &str, business_id: &str) -> StoreResult<()> {
        log::debug!("Recording visit of {} by {}", business_id, user_id);
        let mut backend = self.backend.lock().await;
        backend.record_visit(user_id, business_id).await
    }

    pub async fn record_visits(&self, user_id: &str, business_ids: &[String]) -> StoreResult<()> {
        let mut backend = self.backend.lock().await;
        for business_id in business_ids {
            backend.record_visit(user_id, business_id).await?;
        }
        Ok(())
    }

    pub async fn remove_visit(&self, user_id: &str, business_id: &str) -> StoreResult<()> {
        log::debug!("Removing visit of {} by {}", business_id, user_id);
        let mut backend = self.backend.lock().await;
        backend.remove_visit(user_id, business_id).await
    }

    pub async fn remove_visits(&self, user_id: &str, business_ids: &[String]) -> StoreResult<()> {
        let mut backend = self.backend.lock().await;
        for business_id in business_ids {
            backend.remove_visit(user_id, business_id).await?;
        }
        Ok(())
    }

    pub async fn visited(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        let mut backend = self.backend.lock().await;
        backend.visited(user_id).await
    }

    pub async fn visited_by_time(&self, user_id: &str) -> StoreResult<Vec<String>> {
        let mut backend = self.backend.lock().await;
        backend.visited_by_time(user_id).await
    }

    pub async fn restaurant(&self, business_id: &str) -> StoreResult<Option<Restaurant>> {
        let mut backend = self.backend.lock().await;
        backend.restaurant(business_id).await
    }

    pub async fn restaurant_view(
        &self,
        business_id: &str,
        is_visited: bool,
    ) -> StoreResult<Option<RestaurantView>> {
        Ok(self
            .restaurant(business_id)
            .await?
            .map(|restaurant| restaurant.into_view(is_visited)))
    }

    pub async fn history_views(&self, user_id: &str) -> StoreResult<Vec<RestaurantView>> {
        let business_ids = self.visited_by_time(user_id).await?;
        let mut views = Vec::with_capacity(business_ids.len());
        for business_id in business_ids {
            match self.restaurant_view(&business_id, true).await? {
                Some(view) => views.push(view),
                None => log::warn!("Visited restaurant {} has no stored record", business_id),
            }
        }
        Ok(views)
    }

    pub async fn categories(&self, business_id: &str) -> StoreResult<BTreeSet<String>> {
        let mut backend = self.backend.lock().await;
        backend.categories(business_id).await
    }

    pub async fn business_ids_by_category(
        &self,
        category: &str,
        mode: CategoryMatch,
    ) -> StoreResult<BTreeSet<String>> {
        let mut backend = self.backend.lock().await;
        backend.business_ids_by_category(category, mode).await
    }

    pub async fn upsert_restaurant(&self, restaurant: &Restaurant) -> StoreResult<bool> {
        let mut backend = self.backend.lock().await;
        let inserted = backend.upsert_restaurant(restaurant).await?;
        if inserted {
            log::debug!("Cached new restaurant {}", restaurant.business_id);
        }
        Ok(inserted)
    }

    pub async fn register_user(
        &self,
        user_id: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> StoreResult<bool> {
        let user = UserRecord {
            user_id: user_id.to_string(),
            password_hash: credentials::hash_password(password)?,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        let mut backend = self.backend.lock().await;
        backend.insert_user(&user).await
    }

    // Ok(false) for an unknown user or wrong password, Err when the store fails
    pub async fn verify_credentials(&self, user_id: &str, password: &str) -> StoreResult<bool> {
        let stored = {
            let mut backend = self.backend.lock().await;
            backend.credential_hash(user_id).await?
        };
        match stored {
            Some(hash) => credentials::verify_password(password, &hash),
            None => {
                log::debug!("Login attempt for unknown user {}", user_id);
                Ok(false)
            }
        }
    }

    pub async fn display_name(&self, user_id: &str) -> StoreResult<String> {
        let mut backend = self.backend.lock().await;
        Ok(backend
            .user_name(user_id)
            .await?
            .map(|(first, last)| format!("{} {}", first, last))
            .unwrap_or_default())
    }

    pub async fn close(&self) -> StoreResult<()> {
        let mut backend = self.backend.lock().await;
        backend.close().await?;
        log::info!("Database connection closed");
        Ok(())
    }
}
