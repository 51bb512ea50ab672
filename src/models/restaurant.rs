use crate::models::category::parse_categories;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub business_id: String,
    pub name: String,
    pub categories: String,
    pub city: String,
    pub state: String,
    pub stars: f64,
    pub full_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: String,
    pub url: String,
}

impl Restaurant {
    pub fn category_set(&self) -> BTreeSet<String> {
        parse_categories(&self.categories)
    }

    pub fn into_view(self, is_visited: bool) -> RestaurantView {
        RestaurantView {
            restaurant: self,
            is_visited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantView {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub is_visited: bool,
}

impl RestaurantView {
    pub fn business_id(&self) -> &str {
        &self.restaurant.business_id
    }
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}
