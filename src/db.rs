use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub mod cash;
pub mod machines;
pub mod memory;
pub mod models;
pub mod orders;
pub mod postgres;
pub mod profiles;
pub mod stock;

pub type SharedGateway = Arc<dyn Gateway>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Machines,
    ServiceOrders,
    Profiles,
    StockMovements,
    CashCollections,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Machines => "machines",
            Table::ServiceOrders => "service_orders",
            Table::Profiles => "profiles",
            Table::StockMovements => "stock_movements",
            Table::CashCollections => "cash_collections",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Machines => &[
                "id",
                "name",
                "location",
                "latitude",
                "longitude",
                "status",
                "toy_type",
                "total_capacity",
                "current_stock",
                "last_collection_at",
                "last_maintenance_at",
                "created_at",
            ],
            Table::ServiceOrders => &[
                "id",
                "type",
                "machine_id",
                "description",
                "assignee_id",
                "status",
                "created_at",
                "updated_at",
            ],
            Table::Profiles => &["id", "email", "name", "role", "created_at"],
            Table::StockMovements => &[
                "id",
                "machine_id",
                "quantity",
                "direction",
                "actor_id",
                "created_at",
            ],
            Table::CashCollections => &["id", "machine_id", "amount", "actor_id", "created_at"],
        }
    }

    pub fn has_updated_at(&self) -> bool {
        self.columns().contains(&"updated_at")
    }

    /// Checks `column` against the table's whitelist. Every column name that
    /// reaches SQL text passes through here first.
    pub fn check_column<'a>(&self, column: &'a str) -> Result<&'a str, GatewayError> {
        if self.columns().contains(&column) {
            Ok(column)
        } else {
            Err(GatewayError::UnknownColumn {
                table: self.name(),
                column: column.to_owned(),
            })
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    /// `column = value`. Fails when `value` has no JSON form.
    pub fn new(column: &str, value: impl Serialize) -> Result<Self, GatewayError> {
        let value = serde_json::to_value(value).map_err(|source| GatewayError::Encode {
            column: column.to_owned(),
            source,
        })?;
        Ok(Filter {
            column: column.to_owned(),
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: SortOrder,
}

/// A select with at most one equality filter and one sort column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<Filter>,
    pub order: Option<Order>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Serialize) -> Result<Self, GatewayError> {
        self.filter = Some(Filter::new(column, value)?);
        Ok(self)
    }

    #[must_use]
    pub fn order_by(mut self, column: &str, direction: SortOrder) -> Self {
        self.order = Some(Order {
            column: column.to_owned(),
            direction,
        });
        self
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("no row with id {id} in {table}")]
    NotFound { table: &'static str, id: Uuid },
    #[error("{table} has no column named '{column}'")]
    UnknownColumn { table: &'static str, column: String },
    #[error("{table} only accepts JSON objects as records")]
    NotAnObject { table: &'static str },
    #[error("refusing to write an empty record to {table}")]
    EmptyRecord { table: &'static str },
    #[error("could not encode value for '{column}': {source}")]
    Encode {
        column: String,
        source: serde_json::Error,
    },
    #[error("could not decode row: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The persistence boundary. Rows cross it as JSON objects keyed by column name.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, GatewayError>;

    /// Stores `record` and returns the row as persisted, server-assigned fields included.
    async fn insert(&self, table: Table, record: Value) -> Result<Value, GatewayError>;

    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<(), GatewayError>;

    /// Applies `patch` only while the row still matches `expected`, checked and
    /// written in one step. `Ok(false)` means nothing was written, either because
    /// the row moved on or because it is gone.
    async fn update_if(
        &self,
        table: Table,
        id: Uuid,
        expected: &Filter,
        patch: Value,
    ) -> Result<bool, GatewayError>;

    async fn delete(&self, table: Table, id: Uuid) -> Result<(), GatewayError>;
}

pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, GatewayError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(GatewayError::from))
        .collect()
}

pub(crate) fn decode_one<T: DeserializeOwned>(
    table: Table,
    id: Uuid,
    rows: Vec<Value>,
) -> Result<T, GatewayError> {
    match rows.into_iter().next() {
        Some(row) => Ok(serde_json::from_value(row)?),
        None => Err(GatewayError::NotFound {
            table: table.name(),
            id,
        }),
    }
}

/// Column names of a record or patch, each checked against the table.
pub(crate) fn record_columns(table: Table, record: &Value) -> Result<Vec<String>, GatewayError> {
    let object = record.as_object().ok_or(GatewayError::NotAnObject {
        table: table.name(),
    })?;
    object
        .keys()
        .map(|key| table.check_column(key).map(str::to_owned))
        .collect()
}

/// Like `record_columns`, but a record with no columns at all is an error.
pub(crate) fn written_columns(table: Table, record: &Value) -> Result<Vec<String>, GatewayError> {
    let columns = record_columns(table, record)?;
    if columns.is_empty() {
        return Err(GatewayError::EmptyRecord {
            table: table.name(),
        });
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn check_column_rejects_names_outside_the_table() {
        assert!(Table::Machines.check_column("current_stock").is_ok());
        let err = Table::Machines
            .check_column("name; DROP TABLE machines")
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownColumn { table: "machines", .. }));
    }

    #[test]
    fn only_orders_track_updates() {
        assert!(Table::ServiceOrders.has_updated_at());
        assert!(!Table::Machines.has_updated_at());
    }

    #[test]
    fn query_builder_keeps_one_filter_and_one_sort() {
        let query = Query::new()
            .eq("status", "open")
            .unwrap()
            .order_by("created_at", SortOrder::Descending);
        assert_eq!(
            query.filter,
            Some(Filter {
                column: "status".to_owned(),
                value: json!("open")
            })
        );
        assert_eq!(query.order.unwrap().direction, SortOrder::Descending);
    }

    #[test]
    fn record_columns_requires_an_object() {
        assert!(matches!(
            record_columns(Table::Profiles, &json!([1, 2])),
            Err(GatewayError::NotAnObject { .. })
        ));
        let columns = record_columns(Table::Profiles, &json!({"name": "Ana", "role": "admin"})).unwrap();
        assert_eq!(columns, vec!["name".to_owned(), "role".to_owned()]);
    }

    #[test]
    fn unencodable_filter_value_is_an_error() {
        let mut odd = HashMap::new();
        odd.insert((1, 2), "tuple keys have no JSON form");
        assert!(matches!(
            Query::new().eq("status", odd),
            Err(GatewayError::Encode { .. })
        ));
    }

    #[test]
    fn empty_records_are_not_written() {
        assert!(matches!(
            written_columns(Table::Machines, &json!({})),
            Err(GatewayError::EmptyRecord { table: "machines" })
        ));
        assert_eq!(
            written_columns(Table::Machines, &json!({"name": "Alpha"})).unwrap(),
            vec!["name".to_owned()]
        );
    }
}
