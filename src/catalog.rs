use chrono::{DateTime, Utc};
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;

/// Primitive type declared by a data element. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = diesel::sql_types::Text)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Datetime,
}

#[derive(Error, Debug)]
#[error("Unrecognized data type '{0}'")]
pub struct UnknownDataType(pub String);

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Datetime => "datetime",
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(DataType::String),
            "integer" => Ok(DataType::Integer),
            "float" => Ok(DataType::Float),
            "boolean" => Ok(DataType::Boolean),
            "date" => Ok(DataType::Date),
            "datetime" => Ok(DataType::Datetime),
            other => Err(UnknownDataType(other.to_string())),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn require_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::Validation("name must not be empty".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDatasetRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl CreateDatasetRequest {
    pub fn validate(&self) -> Result<(), Error> {
        require_name(&self.name)
    }
}

/// Partial dataset update. Omitted (or null) fields keep their stored value;
/// an explicit empty description is applied as-is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDatasetRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl UpdateDatasetRequest {
    pub fn validate(&self) -> Result<(), Error> {
        match &self.name {
            Some(name) => require_name(name),
            None => Ok(()),
        }
    }
}

/// Element names are only required to be present; an empty string is a name
/// like any other, unique within its dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateElementRequest {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_pii: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateElementRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_type: Option<DataType>,
    #[serde(default)]
    pub is_required: Option<bool>,
    #[serde(default)]
    pub is_pii: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetWithElementsResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub elements: Vec<ElementResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementResponse {
    pub id: i32,
    pub name: String,
    pub data_type: DataType,
    pub is_required: bool,
    pub is_pii: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_accepts_only_known_literals() {
        let parsed: DataType = serde_json::from_str("\"datetime\"").unwrap();
        assert_eq!(parsed, DataType::Datetime);

        assert!(serde_json::from_str::<DataType>("\"decimal\"").is_err());
        assert!(serde_json::from_str::<DataType>("\"String\"").is_err());
        assert!("varchar".parse::<DataType>().is_err());
    }

    #[test]
    fn create_element_defaults_flags_to_false() {
        let req: CreateElementRequest =
            serde_json::from_str(r#"{"name": "email", "data_type": "string"}"#).unwrap();
        assert!(!req.is_required);
        assert!(!req.is_pii);
    }

    #[test]
    fn create_dataset_description_defaults_to_empty() {
        let req: CreateDatasetRequest = serde_json::from_str(r#"{"name": "Customer"}"#).unwrap();
        assert_eq!(req.description, "");

        let empty: CreateDatasetRequest = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert!(matches!(empty.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn update_distinguishes_omitted_from_empty() {
        let omitted: UpdateDatasetRequest = serde_json::from_str(r#"{"name": "New"}"#).unwrap();
        assert_eq!(omitted.name.as_deref(), Some("New"));
        assert!(omitted.description.is_none());

        let cleared: UpdateDatasetRequest =
            serde_json::from_str(r#"{"description": ""}"#).unwrap();
        assert!(cleared.name.is_none());
        assert_eq!(cleared.description.as_deref(), Some(""));
        assert!(cleared.validate().is_ok());

        let blank_name: UpdateDatasetRequest = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert!(blank_name.validate().is_err());
    }

    #[test]
    fn update_element_rejects_unknown_data_type() {
        assert!(
            serde_json::from_str::<UpdateElementRequest>(r#"{"data_type": "blob"}"#).is_err()
        );

        let req: UpdateElementRequest = serde_json::from_str(r#"{"is_pii": true}"#).unwrap();
        assert_eq!(req.is_pii, Some(true));
        assert!(req.name.is_none() && req.data_type.is_none() && req.is_required.is_none());
    }

    #[test]
    fn element_response_serializes_lowercase_type() {
        let response = ElementResponse {
            id: 1,
            name: "price".to_string(),
            data_type: DataType::Float,
            is_required: true,
            is_pii: false,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data_type"], "float");
        assert_eq!(value["is_required"], true);
    }
}
