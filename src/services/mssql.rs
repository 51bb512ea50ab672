use crate::config::SqlServerSettings;
use crate::error::StoreError;
use crate::models::category::{parse_categories, CategoryMatch};
use crate::models::db::{RecordStore, StoreResult};
use crate::models::restaurant::{Restaurant, UserRecord};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use std::collections::{BTreeSet, HashSet};
use tiberius::{AuthMethod, Client, Config, Row, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt}; // Required for async compatibility with `tiberius`

type SqlClient = Client<Compat<TcpStream>>;

const SCHEMA: &str = r#"
IF OBJECT_ID(N'restaurants', N'U') IS NULL
    CREATE TABLE restaurants (
        business_id  NVARCHAR(255) NOT NULL PRIMARY KEY,
        name         NVARCHAR(255),
        categories   NVARCHAR(1024),
        city         NVARCHAR(255),
        state        NVARCHAR(255),
        stars        FLOAT,
        full_address NVARCHAR(1024),
        latitude     FLOAT,
        longitude    FLOAT,
        image_url    NVARCHAR(1024),
        url          NVARCHAR(1024)
    );
IF OBJECT_ID(N'users', N'U') IS NULL
    CREATE TABLE users (
        user_id    NVARCHAR(255) NOT NULL PRIMARY KEY,
        password   NVARCHAR(255) NOT NULL,
        first_name NVARCHAR(255),
        last_name  NVARCHAR(255)
    );
IF OBJECT_ID(N'history', N'U') IS NULL
    CREATE TABLE history (
        user_id           NVARCHAR(255) NOT NULL,
        business_id       NVARCHAR(255) NOT NULL,
        last_visited_time DATETIME2 NOT NULL DEFAULT SYSUTCDATETIME()
    );
"#;

pub struct SqlServerDatabase {
    client: Option<SqlClient>,
}

impl SqlServerDatabase {
    // Open the single long-lived connection used for every query
    pub async fn connect(settings: &SqlServerSettings) -> StoreResult<Self> {
        let mut config = Config::new();
        config.host(&settings.host);
        config.port(settings.port);
        config.authentication(AuthMethod::sql_server(
            &settings.username,
            &settings.password,
        ));
        config.database(&settings.database);

        if settings.trust_cert {
            // Accept self-signed certificates
            config.trust_cert();
        }

        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;
        let client = Client::connect(config, tcp.compat_write()).await?;
        log::info!(
            "Connected to SQL Server at {}:{}/{}",
            settings.host,
            settings.port,
            settings.database
        );

        Ok(SqlServerDatabase {
            client: Some(client),
        })
    }

    // Create the restaurants, users and history tables if they don't exist yet
    pub async fn ensure_schema(&mut self) -> StoreResult<()> {
        self.client()?.execute(SCHEMA, &[]).await?;
        Ok(())
    }

    fn client(&mut self) -> StoreResult<&mut SqlClient> {
        self.client.as_mut().ok_or(StoreError::Closed)
    }

    async fn business_id_column(&mut self, sql: &str, user_id: &str) -> StoreResult<Vec<String>> {
        let rows = self
            .client()?
            .query(sql, &[&user_id])
            .await?
            .into_first_result()
            .await?;
        rows.iter().map(|row| text(row, "business_id")).collect()
    }
}

fn text(row: &Row, column: &str) -> StoreResult<String> {
    Ok(row
        .try_get::<&str, _>(column)?
        .unwrap_or_default()
        .to_string())
}

fn float(row: &Row, column: &str) -> StoreResult<f64> {
    Ok(row.try_get::<f64, _>(column)?.unwrap_or_default())
}

fn restaurant_from_row(row: &Row) -> StoreResult<Restaurant> {
    Ok(Restaurant {
        business_id: text(row, "business_id")?,
        name: text(row, "name")?,
        categories: text(row, "categories")?,
        city: text(row, "city")?,
        state: text(row, "state")?,
        stars: float(row, "stars")?,
        full_address: text(row, "full_address")?,
        latitude: float(row, "latitude")?,
        longitude: float(row, "longitude")?,
        image_url: text(row, "image_url")?,
        url: text(row, "url")?,
    })
}

#[async_trait]
impl RecordStore for SqlServerDatabase {
    async fn record_visit(&mut self, user_id: &str, business_id: &str) -> StoreResult<()> {
        let sql = r#"
            UPDATE history SET last_visited_time = SYSUTCDATETIME()
             WHERE user_id = @P1 AND business_id = @P2;
            IF @@ROWCOUNT = 0
                INSERT INTO history (user_id, business_id, last_visited_time)
                VALUES (@P1, @P2, SYSUTCDATETIME());
        "#;
        self.client()?
            .execute(sql, &[&user_id, &business_id])
            .await?;
        Ok(())
    }

    async fn remove_visit(&mut self, user_id: &str, business_id: &str) -> StoreResult<()> {
        self.client()?
            .execute(
                "DELETE FROM history WHERE user_id = @P1 AND business_id = @P2",
                &[&user_id, &business_id],
            )
            .await?;
        Ok(())
    }

    async fn visited(&mut self, user_id: &str) -> StoreResult<HashSet<String>> {
        let ids = self
            .business_id_column(
                "SELECT DISTINCT business_id FROM history WHERE user_id = @P1",
                user_id,
            )
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn visited_by_time(&mut self, user_id: &str) -> StoreResult<Vec<String>> {
        self.business_id_column(
            "SELECT business_id FROM history WHERE user_id = @P1 ORDER BY last_visited_time DESC",
            user_id,
        )
        .await
    }

    async fn restaurant(&mut self, business_id: &str) -> StoreResult<Option<Restaurant>> {
        let row = self
            .client()?
            .query(
                "SELECT * FROM restaurants WHERE business_id = @P1",
                &[&business_id],
            )
            .await?
            .into_row()
            .await?;
        row.as_ref().map(restaurant_from_row).transpose()
    }

    async fn categories(&mut self, business_id: &str) -> StoreResult<BTreeSet<String>> {
        let row = self
            .client()?
            .query(
                "SELECT categories FROM restaurants WHERE business_id = @P1",
                &[&business_id],
            )
            .await?
            .into_row()
            .await?;
        match row {
            Some(row) => Ok(parse_categories(&text(&row, "categories")?)),
            None => Ok(BTreeSet::new()),
        }
    }

    async fn business_ids_by_category(
        &mut self,
        category: &str,
        mode: CategoryMatch,
    ) -> StoreResult<BTreeSet<String>> {
        // CHARINDEX under a case-sensitive collation keeps containment
        // case-sensitive whatever the database default is.
        let sql = r#"
            SELECT business_id, categories FROM restaurants
             WHERE CHARINDEX(@P1, categories COLLATE Latin1_General_CS_AS) > 0
             ORDER BY business_id
        "#;
        let mut stream = self.client()?.query(sql, &[&category]).await?;
        let mut ids = BTreeSet::new();

        while let Some(item) = stream.try_next().await? {
            if let Some(row) = item.into_row() {
                if mode.matches(&text(&row, "categories")?, category) {
                    ids.insert(text(&row, "business_id")?);
                }
            }
        }

        Ok(ids)
    }

    async fn upsert_restaurant(&mut self, restaurant: &Restaurant) -> StoreResult<bool> {
        let sql = r#"
            INSERT INTO restaurants (business_id, name, categories, city, state, stars,
                                     full_address, latitude, longitude, image_url, url)
            SELECT @P1, @P2, @P3, @P4, @P5, @P6, @P7, @P8, @P9, @P10, @P11
             WHERE NOT EXISTS (SELECT 1 FROM restaurants WHERE business_id = @P1)
        "#;
        let params: [&dyn ToSql; 11] = [
            &restaurant.business_id,
            &restaurant.name,
            &restaurant.categories,
            &restaurant.city,
            &restaurant.state,
            &restaurant.stars,
            &restaurant.full_address,
            &restaurant.latitude,
            &restaurant.longitude,
            &restaurant.image_url,
            &restaurant.url,
        ];
        let result = self.client()?.execute(sql, &params).await?;
        Ok(result.rows_affected().iter().sum::<u64>() > 0)
    }

    async fn insert_user(&mut self, user: &UserRecord) -> StoreResult<bool> {
        let sql = r#"
            INSERT INTO users (user_id, password, first_name, last_name)
            SELECT @P1, @P2, @P3, @P4
             WHERE NOT EXISTS (SELECT 1 FROM users WHERE user_id = @P1)
        "#;
        let params: [&dyn ToSql; 4] = [
            &user.user_id,
            &user.password_hash,
            &user.first_name,
            &user.last_name,
        ];
        let result = self.client()?.execute(sql, &params).await?;
        Ok(result.rows_affected().iter().sum::<u64>() > 0)
    }

    async fn credential_hash(&mut self, user_id: &str) -> StoreResult<Option<String>> {
        let row = self
            .client()?
            .query("SELECT password FROM users WHERE user_id = @P1", &[&user_id])
            .await?
            .into_row()
            .await?;
        row.map(|row| text(&row, "password")).transpose()
    }

    async fn user_name(&mut self, user_id: &str) -> StoreResult<Option<(String, String)>> {
        let row = self
            .client()?
            .query(
                "SELECT first_name, last_name FROM users WHERE user_id = @P1",
                &[&user_id],
            )
            .await?
            .into_row()
            .await?;
        match row {
            Some(row) => Ok(Some((text(&row, "first_name")?, text(&row, "last_name")?))),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> StoreResult<()> {
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        Ok(())
    }
}
