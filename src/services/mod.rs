pub mod credentials;
pub mod memory;
pub mod mssql;
pub mod recommender;
pub mod search;
pub mod yelp;
