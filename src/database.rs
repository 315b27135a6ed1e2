use diesel::prelude::*;
use diesel::result::{ConnectionError, ConnectionResult, DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use diesel_async::{
    pooled_connection::{
        deadpool::{Object, Pool},
        AsyncDieselConnectionManager, ManagerConfig,
    },
    sync_connection_wrapper::SyncConnectionWrapper,
    AsyncConnection, RunQueryDsl, SimpleAsyncConnection,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info};

use crate::error::Error;
use crate::models::*;
use crate::schema::*;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbConnection = SyncConnectionWrapper<SqliteConnection>;

/// Pragmas applied to every pooled connection. SQLite only enforces foreign
/// keys (and with them `ON DELETE CASCADE`) when asked to, per connection.
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

fn establish_connection(database_url: &str) -> BoxFuture<'_, ConnectionResult<DbConnection>> {
    async move {
        let mut conn = DbConnection::establish(database_url).await?;
        conn.batch_execute(CONNECTION_PRAGMAS)
            .await
            .map_err(ConnectionError::CouldntSetupConfiguration)?;
        Ok(conn)
    }
    .boxed()
}

/// Catalog storage. Clones share the same connection pool.
#[derive(Clone)]
pub struct DatabaseManager {
    pool: Pool<DbConnection>,
}

impl DatabaseManager {
    pub async fn new(database_url: &str, pool_size: usize) -> Result<Self, Error> {
        let mut manager_config = ManagerConfig::default();
        manager_config.custom_setup = Box::new(establish_connection);

        let config = AsyncDieselConnectionManager::<DbConnection>::new_with_config(
            database_url,
            manager_config,
        );
        let pool = Pool::builder(config)
            .max_size(pool_size)
            .build()
            .map_err(|e| Error::Pool {
                message: format!("Failed to create database pool: {}", e),
            })?;

        let manager = Self { pool };
        manager.run_migrations(database_url)?;

        Ok(manager)
    }

    pub fn run_migrations(&self, database_url: &str) -> Result<(), Error> {
        // diesel_migrations only drives synchronous connections
        let mut connection =
            SqliteConnection::establish(database_url).map_err(|e| Error::Migration {
                message: format!("Failed to establish connection for migrations: {}", e),
            })?;

        let applied = connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| Error::Migration {
                message: format!("Failed to run migrations: {}", e),
            })?;

        info!("Applied {} pending migration(s)", applied.len());
        Ok(())
    }

    async fn conn(&self) -> Result<Object<DbConnection>, Error> {
        self.pool.get().await.map_err(|e| Error::Pool {
            message: format!("Failed to get database connection: {}", e),
        })
    }

    pub async fn create_dataset(&self, new_dataset: &NewDataset<'_>) -> Result<DatasetRecord, Error> {
        info!("Creating dataset {}", new_dataset.name);
        let mut conn = self.conn().await?;

        diesel::insert_into(datasets::table)
            .values(new_dataset)
            .returning(DatasetRecord::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    Error::DatasetNameTaken {
                        name: new_dataset.name.to_string(),
                    }
                }
                e => e.into(),
            })
    }

    pub async fn get_dataset(&self, dataset_id: i32) -> Result<Option<DatasetRecord>, Error> {
        let mut conn = self.conn().await?;

        let dataset = datasets::table
            .find(dataset_id)
            .select(DatasetRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(dataset)
    }

    pub async fn get_dataset_with_elements(
        &self,
        dataset_id: i32,
    ) -> Result<Option<(DatasetRecord, Vec<ElementRecord>)>, Error> {
        let mut conn = self.conn().await?;

        let Some(dataset) = datasets::table
            .find(dataset_id)
            .select(DatasetRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?
        else {
            return Ok(None);
        };

        let elements = ElementRecord::belonging_to(&dataset)
            .select(ElementRecord::as_select())
            .order(data_elements::id.asc())
            .load(&mut conn)
            .await?;

        Ok(Some((dataset, elements)))
    }

    pub async fn list_datasets(&self) -> Result<Vec<DatasetRecord>, Error> {
        let mut conn = self.conn().await?;

        let dataset_list = datasets::table
            .order(datasets::id.asc())
            .select(DatasetRecord::as_select())
            .load(&mut conn)
            .await?;

        Ok(dataset_list)
    }

    pub async fn list_datasets_with_elements(
        &self,
    ) -> Result<Vec<(DatasetRecord, Vec<ElementRecord>)>, Error> {
        let mut conn = self.conn().await?;

        let dataset_list = datasets::table
            .order(datasets::id.asc())
            .select(DatasetRecord::as_select())
            .load(&mut conn)
            .await?;

        let elements = ElementRecord::belonging_to(&dataset_list)
            .select(ElementRecord::as_select())
            .order(data_elements::id.asc())
            .load(&mut conn)
            .await?;

        let grouped = elements.grouped_by(&dataset_list);
        Ok(dataset_list.into_iter().zip(grouped).collect())
    }

    pub async fn update_dataset(
        &self,
        dataset_id: i32,
        changes: &DatasetChanges,
    ) -> Result<Option<DatasetRecord>, Error> {
        if changes.is_empty() {
            debug!(dataset_id, "Empty dataset update, returning stored record");
            return self.get_dataset(dataset_id).await;
        }

        info!(dataset_id, "Updating dataset");
        let mut conn = self.conn().await?;

        diesel::update(datasets::table.find(dataset_id))
            .set(changes)
            .returning(DatasetRecord::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    Error::DatasetRenameConflict
                }
                e => e.into(),
            })
    }

    /// Deletes the dataset and its elements in one transaction. Returns
    /// whether a dataset row was removed.
    pub async fn delete_dataset(&self, dataset_id: i32) -> Result<bool, Error> {
        info!(dataset_id, "Deleting dataset");
        let mut conn = self.conn().await?;

        conn.transaction::<_, Error, _>(|conn| {
            Box::pin(async move {
                let removed_elements = diesel::delete(
                    data_elements::table.filter(data_elements::dataset_id.eq(dataset_id)),
                )
                .execute(conn)
                .await?;

                let removed = diesel::delete(datasets::table.find(dataset_id))
                    .execute(conn)
                    .await?;

                debug!(dataset_id, removed_elements, "Dataset delete finished");
                Ok(removed > 0)
            })
        })
        .await
    }

    pub async fn create_element(
        &self,
        new_element: &NewElement<'_>,
    ) -> Result<ElementRecord, Error> {
        info!(
            dataset_id = new_element.dataset_id,
            "Adding data element {}", new_element.name
        );
        let mut conn = self.conn().await?;

        diesel::insert_into(data_elements::table)
            .values(new_element)
            .returning(ElementRecord::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    Error::ElementNameTaken {
                        name: new_element.name.to_string(),
                    }
                }
                DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                    Error::DatasetNotFound
                }
                e => e.into(),
            })
    }

    pub async fn get_element(
        &self,
        dataset_id: i32,
        element_id: i32,
    ) -> Result<Option<ElementRecord>, Error> {
        let mut conn = self.conn().await?;

        let element = data_elements::table
            .filter(data_elements::id.eq(element_id))
            .filter(data_elements::dataset_id.eq(dataset_id))
            .select(ElementRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(element)
    }

    pub async fn update_element(
        &self,
        dataset_id: i32,
        element_id: i32,
        changes: &ElementChanges,
    ) -> Result<Option<ElementRecord>, Error> {
        if changes.is_empty() {
            debug!(dataset_id, element_id, "Empty element update, returning stored record");
            return self.get_element(dataset_id, element_id).await;
        }

        info!(dataset_id, element_id, "Updating data element");
        let mut conn = self.conn().await?;

        diesel::update(
            data_elements::table
                .filter(data_elements::id.eq(element_id))
                .filter(data_elements::dataset_id.eq(dataset_id)),
        )
        .set(changes)
        .returning(ElementRecord::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                Error::ElementRenameConflict
            }
            e => e.into(),
        })
    }
}
