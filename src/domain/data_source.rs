// Data source references - owned by the upload flow, only displayed and read here
use super::ids::{DataSourceId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Source type as written by the upload flow. Types this crate does not
/// know are kept verbatim so listing never fails on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataSourceKind {
    Csv,
    Json,
    Api,
    Database,
    File,
    Other(String),
}

impl From<String> for DataSourceKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "csv" => DataSourceKind::Csv,
            "json" => DataSourceKind::Json,
            "api" => DataSourceKind::Api,
            "database" => DataSourceKind::Database,
            "file" => DataSourceKind::File,
            _ => DataSourceKind::Other(value),
        }
    }
}

impl From<DataSourceKind> for String {
    fn from(kind: DataSourceKind) -> Self {
        match kind {
            DataSourceKind::Csv => "csv".to_string(),
            DataSourceKind::Json => "json".to_string(),
            DataSourceKind::Api => "api".to_string(),
            DataSourceKind::Database => "database".to_string(),
            DataSourceKind::File => "file".to_string(),
            DataSourceKind::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: DataSourceId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DataSourceKind,
    #[serde(default)]
    pub connection_config: Option<Value>,
    #[serde(default)]
    pub schema_info: Option<Value>,
    pub created_by: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl DataSource {
    /// Rows captured at upload time (`schema_info.data`), if any.
    pub fn rows(&self) -> Vec<Map<String, Value>> {
        self.schema_info
            .as_ref()
            .and_then(|info| info.get("data"))
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_from_schema_info() {
        let source: DataSource = serde_json::from_value(json!({
            "id": "src-1",
            "name": "sales",
            "type": "file",
            "connection_config": {"fileName": "sales.csv"},
            "schema_info": {"data": [{"name": "Jan", "value": "10"}, 3]},
            "created_by": "user-1"
        }))
        .unwrap();

        let rows = source.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Jan");
    }

    #[test]
    fn test_rows_missing_schema() {
        let source: DataSource = serde_json::from_value(json!({
            "id": "src-2",
            "name": "api",
            "type": "api",
            "created_by": "user-1"
        }))
        .unwrap();
        assert!(source.rows().is_empty());
    }

    #[test]
    fn test_unknown_kind_is_kept() {
        let source: DataSource = serde_json::from_value(json!({
            "id": "src-3",
            "name": "budget",
            "type": "excel",
            "created_by": "user-1"
        }))
        .unwrap();
        assert_eq!(source.kind, DataSourceKind::Other("excel".to_string()));
        assert_eq!(serde_json::to_value(&source).unwrap()["type"], "excel");

        let known: DataSourceKind = serde_json::from_value(json!("csv")).unwrap();
        assert_eq!(known, DataSourceKind::Csv);
    }
}
