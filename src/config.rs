use crate::error::ConfigError;
use crate::models::category::CategoryMatch;
use std::env;
use std::str::FromStr;

pub const DEFAULT_YELP_API_URL: &str = "https://api.yelp.com";
pub const DEFAULT_SEARCH_TERM: &str = "restaurants";
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbType {
    SqlServer,
    Memory,
}

#[derive(Debug, Clone)]
pub struct SqlServerSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub trust_cert: bool,
}

#[derive(Debug, Clone)]
pub struct YelpSettings {
    pub api_key: String,
    pub base_url: String,
    pub term: String,
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub db_type: DbType,
    pub sql_server: Option<SqlServerSettings>,
    pub yelp: YelpSettings,
    pub category_match: CategoryMatch,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let db_type = match require("DB_TYPE")?.to_ascii_lowercase().as_str() {
            "sqlserver" => DbType::SqlServer,
            "memory" => DbType::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    var: "DB_TYPE",
                    reason: format!("unsupported database type '{}'", other),
                })
            }
        };

        let sql_server = match db_type {
            DbType::SqlServer => Some(SqlServerSettings {
                host: require("DB_HOST")?,
                port: parse_var("DB_PORT", require("DB_PORT")?)?,
                username: require("DB_USERNAME")?,
                password: require("DB_PASSWORD")?,
                database: require("DB_NAME")?,
                trust_cert: lookup("DB_TRUST_CERT")
                    .map(|v| parse_var("DB_TRUST_CERT", v))
                    .transpose()?
                    .unwrap_or(false),
            }),
            DbType::Memory => None,
        };

        let yelp = YelpSettings {
            // Only needed for nearby searches; YelpClient::new rejects an empty key
            api_key: lookup("YELP_API_KEY").unwrap_or_default(),
            base_url: lookup("YELP_API_URL").unwrap_or_else(|| DEFAULT_YELP_API_URL.to_string()),
            term: lookup("YELP_SEARCH_TERM").unwrap_or_else(|| DEFAULT_SEARCH_TERM.to_string()),
            limit: lookup("YELP_SEARCH_LIMIT")
                .map(|v| parse_var("YELP_SEARCH_LIMIT", v))
                .transpose()?
                .unwrap_or(DEFAULT_SEARCH_LIMIT),
        };

        let category_match = lookup("CATEGORY_MATCH")
            .map(|v| {
                v.parse::<CategoryMatch>().map_err(|reason| ConfigError::Invalid {
                    var: "CATEGORY_MATCH",
                    reason,
                })
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Settings {
            db_type,
            sql_server,
            yelp,
            category_match,
        })
    }
}

fn parse_var<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}
