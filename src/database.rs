use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{
    async_connection_wrapper::AsyncConnectionWrapper,
    pooled_connection::{
        deadpool::{Object, Pool},
        AsyncDieselConnectionManager,
    },
    AsyncPgConnection, RunQueryDsl,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{debug, info};

use crate::catalog::Dataset;
use crate::domain::DatasetFilter;
use crate::error::RegistryError;
use crate::models::DatasetRow;
use crate::schema::datasets;
use crate::storage::{new_dataset_id, DatasetStore};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// PostgreSQL-backed [`DatasetStore`].
#[derive(Clone)]
pub struct DatabaseManager {
    pool: Pool<AsyncPgConnection>,
}

impl DatabaseManager {
    pub async fn new(database_url: &str, max_pool_size: usize) -> Result<Self, RegistryError> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(config)
            .max_size(max_pool_size)
            .build()
            .map_err(|e| RegistryError::ConfigError {
                message: format!("Failed to create database pool: {}", e),
            })?;

        let manager = Self { pool };
        manager.run_migrations(database_url).await?;

        Ok(manager)
    }

    pub async fn run_migrations(&self, database_url: &str) -> Result<(), RegistryError> {
        // The migration harness is synchronous, so it runs on a blocking
        // thread through the async connection wrapper.
        let database_url = database_url.to_string();
        let applied = tokio::task::spawn_blocking(move || {
            let mut connection =
                AsyncConnectionWrapper::<AsyncPgConnection>::establish(&database_url).map_err(
                    |e| RegistryError::StoreUnavailable {
                        message: format!("Failed to establish connection for migrations: {}", e),
                    },
                )?;

            connection
                .run_pending_migrations(MIGRATIONS)
                .map(|versions| versions.len())
                .map_err(|e| RegistryError::ConfigError {
                    message: format!("Failed to run migrations: {}", e),
                })
        })
        .await
        .map_err(|e| RegistryError::InternalError {
            message: format!("Migration task failed: {}", e),
        })??;

        info!("Applied {} pending migrations", applied);
        Ok(())
    }

    async fn connection(&self) -> Result<Object<AsyncPgConnection>, RegistryError> {
        self.pool
            .get()
            .await
            .map_err(|e| RegistryError::StoreUnavailable {
                message: format!("Failed to get database connection: {}", e),
            })
    }
}

#[async_trait]
impl DatasetStore for DatabaseManager {
    async fn insert(&self, mut dataset: Dataset) -> Result<Dataset, RegistryError> {
        dataset.id = new_dataset_id();
        info!("Adding dataset {} ({}) to registry", dataset.name, dataset.id);

        let row = DatasetRow::try_from(&dataset)?;
        let mut conn = self.connection().await?;

        diesel::insert_into(datasets::table)
            .values(&row)
            .execute(&mut conn)
            .await?;

        Ok(dataset)
    }

    async fn fetch(&self, dataset_id: &str) -> Result<Option<Dataset>, RegistryError> {
        let mut conn = self.connection().await?;

        let row = datasets::table
            .find(dataset_id)
            .select(DatasetRow::as_select())
            .get_result::<DatasetRow>(&mut conn)
            .await
            .optional()?;

        row.map(DatasetRow::into_dataset).transpose()
    }

    async fn query(&self, filter: &DatasetFilter) -> Result<Vec<Dataset>, RegistryError> {
        let mut conn = self.connection().await?;

        let mut query = datasets::table.into_boxed();
        if let Some(organization_id) = &filter.organization_id {
            query = query.filter(datasets::organization_id.eq(organization_id.clone()));
        }
        if let Some(source_application) = &filter.source_application {
            query = query.filter(datasets::source_application.eq(source_application.clone()));
        }
        if let Some(category) = &filter.category {
            query = query.filter(datasets::category.eq(category.clone()));
        }

        let rows = query
            .order(datasets::updated_at.desc().nulls_last())
            .then_order_by(datasets::id.asc())
            .select(DatasetRow::as_select())
            .load::<DatasetRow>(&mut conn)
            .await?;

        debug!("Dataset query {:?} matched {} rows", filter, rows.len());
        rows.into_iter().map(DatasetRow::into_dataset).collect()
    }

    async fn replace(&self, dataset: &Dataset) -> Result<bool, RegistryError> {
        let row = DatasetRow::try_from(dataset)?;
        let mut conn = self.connection().await?;

        let updated = diesel::update(datasets::table.find(dataset.id.as_str()))
            .set(&row)
            .execute(&mut conn)
            .await?;

        Ok(updated > 0)
    }

    async fn remove(&self, dataset_id: &str) -> Result<bool, RegistryError> {
        let mut conn = self.connection().await?;

        let deleted = diesel::delete(datasets::table.find(dataset_id))
            .execute(&mut conn)
            .await?;

        Ok(deleted > 0)
    }

    async fn health_check(&self) -> Result<(), RegistryError> {
        let mut conn = self.connection().await?;

        diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("1"))
            .get_result::<i32>(&mut conn)
            .await?;

        Ok(())
    }
}
