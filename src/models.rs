use chrono::NaiveDateTime;
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;

use crate::catalog::{
    CreateDatasetRequest, CreateElementRequest, DataType, DatasetResponse,
    DatasetWithElementsResponse, ElementResponse, UpdateDatasetRequest, UpdateElementRequest,
};
use crate::schema::{data_elements, datasets};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = datasets)]
#[diesel(primary_key(id))]
pub struct DatasetRecord {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = datasets)]
pub struct NewDataset<'a> {
    pub name: &'a str,
    pub description: &'a str,
}

/// `None` fields are left out of the generated `UPDATE`.
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = datasets)]
pub struct DatasetChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl DatasetChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = data_elements)]
#[diesel(belongs_to(DatasetRecord, foreign_key = dataset_id))]
#[diesel(primary_key(id))]
pub struct ElementRecord {
    pub id: i32,
    pub name: String,
    pub data_type: DataType,
    pub is_required: bool,
    pub is_pii: bool,
    pub dataset_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = data_elements)]
pub struct NewElement<'a> {
    pub name: &'a str,
    pub data_type: DataType,
    pub is_required: bool,
    pub is_pii: bool,
    pub dataset_id: i32,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = data_elements)]
pub struct ElementChanges {
    pub name: Option<String>,
    pub data_type: Option<DataType>,
    pub is_required: Option<bool>,
    pub is_pii: Option<bool>,
}

impl ElementChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.data_type.is_none()
            && self.is_required.is_none()
            && self.is_pii.is_none()
    }
}

impl FromSql<Text, Sqlite> for DataType {
    fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let value = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        Ok(value.parse::<DataType>()?)
    }
}

impl ToSql<Text, Sqlite> for DataType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(IsNull::No)
    }
}

impl<'a> From<&'a CreateDatasetRequest> for NewDataset<'a> {
    fn from(request: &'a CreateDatasetRequest) -> Self {
        NewDataset {
            name: &request.name,
            description: &request.description,
        }
    }
}

impl From<UpdateDatasetRequest> for DatasetChanges {
    fn from(request: UpdateDatasetRequest) -> Self {
        DatasetChanges {
            name: request.name,
            description: request.description,
        }
    }
}

impl<'a> NewElement<'a> {
    pub fn from_request(dataset_id: i32, request: &'a CreateElementRequest) -> Self {
        NewElement {
            name: &request.name,
            data_type: request.data_type,
            is_required: request.is_required,
            is_pii: request.is_pii,
            dataset_id,
        }
    }
}

impl From<UpdateElementRequest> for ElementChanges {
    fn from(request: UpdateElementRequest) -> Self {
        ElementChanges {
            name: request.name,
            data_type: request.data_type,
            is_required: request.is_required,
            is_pii: request.is_pii,
        }
    }
}

impl From<DatasetRecord> for DatasetResponse {
    fn from(dataset: DatasetRecord) -> Self {
        DatasetResponse {
            id: dataset.id,
            name: dataset.name,
            description: dataset.description,
            created_at: dataset.created_at.and_utc(),
        }
    }
}

impl From<ElementRecord> for ElementResponse {
    fn from(element: ElementRecord) -> Self {
        ElementResponse {
            id: element.id,
            name: element.name,
            data_type: element.data_type,
            is_required: element.is_required,
            is_pii: element.is_pii,
            created_at: element.created_at.and_utc(),
        }
    }
}

impl From<(DatasetRecord, Vec<ElementRecord>)> for DatasetWithElementsResponse {
    fn from((dataset, elements): (DatasetRecord, Vec<ElementRecord>)) -> Self {
        DatasetWithElementsResponse {
            id: dataset.id,
            name: dataset.name,
            description: dataset.description,
            created_at: dataset.created_at.and_utc(),
            elements: elements.into_iter().map(|e| e.into()).collect(),
        }
    }
}
