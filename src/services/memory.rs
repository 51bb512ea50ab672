use crate::error::StoreError;
use crate::models::category::CategoryMatch;
use crate::models::db::{RecordStore, StoreResult};
use crate::models::restaurant::{Restaurant, UserRecord};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

struct Visit {
    user_id: String,
    business_id: String,
    last_visited: u64,
}

#[derive(Default)]
pub struct MemoryDatabase {
    restaurants: BTreeMap<String, Restaurant>,
    history: Vec<Visit>,
    users: HashMap<String, UserRecord>,
    clock: u64,
    closed: bool,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

#[async_trait]
impl RecordStore for MemoryDatabase {
    async fn record_visit(&mut self, user_id: &str, business_id: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let now = self.tick();
        let existing = self
            .history
            .iter_mut()
            .find(|v| v.user_id == user_id && v.business_id == business_id);
        match existing {
            Some(visit) => visit.last_visited = now,
            None => self.history.push(Visit {
                user_id: user_id.to_string(),
                business_id: business_id.to_string(),
                last_visited: now,
            }),
        }
        Ok(())
    }

    async fn remove_visit(&mut self, user_id: &str, business_id: &str) -> StoreResult<()> {
        self.ensure_open()?;
        self.history
            .retain(|v| !(v.user_id == user_id && v.business_id == business_id));
        Ok(())
    }

    async fn visited(&mut self, user_id: &str) -> StoreResult<HashSet<String>> {
        self.ensure_open()?;
        Ok(self
            .history
            .iter()
            .filter(|v| v.user_id == user_id)
            .map(|v| v.business_id.clone())
            .collect())
    }

    async fn visited_by_time(&mut self, user_id: &str) -> StoreResult<Vec<String>> {
        self.ensure_open()?;
        let mut visits: Vec<&Visit> = self.history.iter().filter(|v| v.user_id == user_id).collect();
        visits.sort_by(|a, b| b.last_visited.cmp(&a.last_visited));
        Ok(visits.into_iter().map(|v| v.business_id.clone()).collect())
    }

    async fn restaurant(&mut self, business_id: &str) -> StoreResult<Option<Restaurant>> {
        self.ensure_open()?;
        Ok(self.restaurants.get(business_id).cloned())
    }

    async fn categories(&mut self, business_id: &str) -> StoreResult<BTreeSet<String>> {
        self.ensure_open()?;
        Ok(self
            .restaurants
            .get(business_id)
            .map(Restaurant::category_set)
            .unwrap_or_default())
    }

    async fn business_ids_by_category(
        &mut self,
        category: &str,
        mode: CategoryMatch,
    ) -> StoreResult<BTreeSet<String>> {
        self.ensure_open()?;
        Ok(self
            .restaurants
            .values()
            .filter(|r| mode.matches(&r.categories, category))
            .map(|r| r.business_id.clone())
            .collect())
    }

    async fn upsert_restaurant(&mut self, restaurant: &Restaurant) -> StoreResult<bool> {
        self.ensure_open()?;
        if self.restaurants.contains_key(&restaurant.business_id) {
            return Ok(false);
        }
        self.restaurants
            .insert(restaurant.business_id.clone(), restaurant.clone());
        Ok(true)
    }

    async fn insert_user(&mut self, user: &UserRecord) -> StoreResult<bool> {
        self.ensure_open()?;
        if self.users.contains_key(&user.user_id) {
            return Ok(false);
        }
        self.users.insert(user.user_id.clone(), user.clone());
        Ok(true)
    }

    async fn credential_hash(&mut self, user_id: &str) -> StoreResult<Option<String>> {
        self.ensure_open()?;
        Ok(self.users.get(user_id).map(|u| u.password_hash.clone()))
    }

    async fn user_name(&mut self, user_id: &str) -> StoreResult<Option<(String, String)>> {
        self.ensure_open()?;
        Ok(self
            .users
            .get(user_id)
            .map(|u| (u.first_name.clone(), u.last_name.clone())))
    }

    async fn close(&mut self) -> StoreResult<()> {
        self.closed = true;
        Ok(())
    }
}
