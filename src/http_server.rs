use std::future::Future;
use std::net::SocketAddr;

use axum::{
    extract::{FromRequest, FromRequestParts, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::catalog::{
    CreateDatasetRequest, CreateElementRequest, DatasetResponse, DatasetWithElementsResponse,
    ElementResponse, UpdateDatasetRequest, UpdateElementRequest,
};
use crate::database::DatabaseManager;
use crate::error::Error;
use crate::models::{DatasetChanges, ElementChanges, NewDataset, NewElement};

pub const SERVICE_NAME: &str = "Data Structure Management Service";

/// JSON body extractor whose rejections render as `{"detail": ...}` with 422.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections render as `{"detail": ...}` with 422.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ApiPath<T>(pub T);

/// Stored ids are `i32`; a wider path id cannot name any row.
fn row_id(id: i64, missing: Error) -> Result<i32, Error> {
    i32::try_from(id).map_err(|_| missing)
}

pub struct HttpServer {
    database: DatabaseManager,
}

impl HttpServer {
    pub fn new(database: DatabaseManager) -> Self {
        Self { database }
    }

    pub fn router(&self) -> Router {
        router(self.database.clone())
    }

    pub async fn start<F>(&self, addr: SocketAddr, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting HTTP server on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

pub fn router(database: DatabaseManager) -> Router {
    Router::new()
        .route("/", get(service_name))
        .route("/datasets", get(list_datasets).post(create_dataset))
        .route("/datasetselements", get(list_datasets_with_elements))
        .route(
            "/datasets/:dataset_id",
            get(get_dataset).patch(update_dataset).delete(delete_dataset),
        )
        .route("/datasets/:dataset_id/elements", post(add_element))
        .route(
            "/datasets/:dataset_id/elements/:element_id",
            patch(update_element),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(database)
}

async fn service_name() -> Json<&'static str> {
    Json(SERVICE_NAME)
}

/// `POST /datasets`
#[tracing::instrument(skip_all, err)]
async fn create_dataset(
    State(db): State<DatabaseManager>,
    ApiJson(request): ApiJson<CreateDatasetRequest>,
) -> Result<Json<DatasetResponse>, Error> {
    request.validate()?;

    let dataset = db.create_dataset(&NewDataset::from(&request)).await?;
    info!(dataset_id = dataset.id, "Created dataset '{}'", dataset.name);

    Ok(Json(dataset.into()))
}

/// `GET /datasets`, datasets without their elements.
#[tracing::instrument(skip_all, err)]
async fn list_datasets(
    State(db): State<DatabaseManager>,
) -> Result<Json<Vec<DatasetResponse>>, Error> {
    let datasets = db.list_datasets().await?;
    Ok(Json(datasets.into_iter().map(|d| d.into()).collect()))
}

/// `GET /datasetselements`
#[tracing::instrument(skip_all, err)]
async fn list_datasets_with_elements(
    State(db): State<DatabaseManager>,
) -> Result<Json<Vec<DatasetWithElementsResponse>>, Error> {
    let datasets = db.list_datasets_with_elements().await?;
    Ok(Json(datasets.into_iter().map(|d| d.into()).collect()))
}

/// `GET /datasets/{dataset_id}`, the dataset with all of its elements.
#[tracing::instrument(skip_all, err)]
async fn get_dataset(
    State(db): State<DatabaseManager>,
    ApiPath(dataset_id): ApiPath<i64>,
) -> Result<Json<DatasetWithElementsResponse>, Error> {
    let dataset_id = row_id(dataset_id, Error::DatasetNotFound)?;
    let dataset = db
        .get_dataset_with_elements(dataset_id)
        .await?
        .ok_or(Error::DatasetNotFound)?;

    Ok(Json(dataset.into()))
}

/// `POST /datasets/{dataset_id}/elements`
#[tracing::instrument(skip_all, err)]
async fn add_element(
    State(db): State<DatabaseManager>,
    ApiPath(dataset_id): ApiPath<i64>,
    ApiJson(request): ApiJson<CreateElementRequest>,
) -> Result<Json<ElementResponse>, Error> {
    let dataset_id = row_id(dataset_id, Error::DatasetNotFound)?;
    if db.get_dataset(dataset_id).await?.is_none() {
        return Err(Error::DatasetNotFound);
    }

    let element = db
        .create_element(&NewElement::from_request(dataset_id, &request))
        .await?;

    Ok(Json(element.into()))
}

/// `PATCH /datasets/{dataset_id}`, applies only the supplied fields.
#[tracing::instrument(skip_all, err)]
async fn update_dataset(
    State(db): State<DatabaseManager>,
    ApiPath(dataset_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateDatasetRequest>,
) -> Result<Json<DatasetResponse>, Error> {
    request.validate()?;
    let dataset_id = row_id(dataset_id, Error::DatasetNotFound)?;

    if db.get_dataset(dataset_id).await?.is_none() {
        return Err(Error::DatasetNotFound);
    }

    let dataset = db
        .update_dataset(dataset_id, &DatasetChanges::from(request))
        .await?
        .ok_or(Error::DatasetNotFound)?;

    Ok(Json(dataset.into()))
}

/// `PATCH /datasets/{dataset_id}/elements/{element_id}`
#[tracing::instrument(skip_all, err)]
async fn update_element(
    State(db): State<DatabaseManager>,
    ApiPath((dataset_id, element_id)): ApiPath<(i64, i64)>,
    ApiJson(request): ApiJson<UpdateElementRequest>,
) -> Result<Json<ElementResponse>, Error> {
    let dataset_id = row_id(dataset_id, Error::ElementNotFound)?;
    let element_id = row_id(element_id, Error::ElementNotFound)?;

    if db.get_element(dataset_id, element_id).await?.is_none() {
        return Err(Error::ElementNotFound);
    }

    let element = db
        .update_element(dataset_id, element_id, &ElementChanges::from(request))
        .await?
        .ok_or(Error::ElementNotFound)?;

    Ok(Json(element.into()))
}

/// `DELETE /datasets/{dataset_id}`, cascades to the dataset's elements.
#[tracing::instrument(skip_all, err)]
async fn delete_dataset(
    State(db): State<DatabaseManager>,
    ApiPath(dataset_id): ApiPath<i64>,
) -> Result<StatusCode, Error> {
    let dataset_id = row_id(dataset_id, Error::DatasetNotFound)?;
    if db.get_dataset(dataset_id).await?.is_none() {
        return Err(Error::DatasetNotFound);
    }

    // A concurrent delete can remove the row after the check above
    if !db.delete_dataset(dataset_id).await? {
        return Err(Error::DatasetNotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}
