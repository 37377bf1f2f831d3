use super::{record_columns, written_columns, Filter, Gateway, GatewayError, Query, SortOrder, Table};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

/// In-process gateway. Behaves like the hosted store for everything the
/// application relies on: server-assigned ids and timestamps, column checks,
/// one-column equality filters, sorts with nulls last when ascending, and
/// deleting a machine's stock and cash logs along with it.
#[derive(Default)]
pub struct MemoryGateway {
    tables: Mutex<HashMap<Table, Vec<Map<String, Value>>>>,
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

fn id_of(row: &Map<String, Value>) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

/// Tables whose rows go when the machine they point at is deleted.
const MACHINE_LOGS: [Table; 2] = [Table::StockMovements, Table::CashCollections];

fn stamp(table: Table, row: &mut Map<String, Value>) {
    if table.has_updated_at() {
        row.insert(String::from("updated_at"), now());
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, GatewayError> {
        if let Some(filter) = &query.filter {
            table.check_column(&filter.column)?;
        }
        if let Some(order) = &query.order {
            table.check_column(&order.column)?;
        }

        let tables = self.tables.lock();
        let mut rows: Vec<&Map<String, Value>> = tables
            .get(&table)
            .map(|rows| rows.iter().collect())
            .unwrap_or_default();

        if let Some(filter) = &query.filter {
            rows.retain(|row| row.get(&filter.column).unwrap_or(&Value::Null) == &filter.value);
        }
        if let Some(order) = &query.order {
            let key = |row: &&Map<String, Value>| row.get(&order.column).cloned().unwrap_or(Value::Null);
            rows.sort_by(|a, b| {
                let (a, b) = (key(a), key(b));
                match order.direction {
                    SortOrder::Ascending => compare(&a, &b),
                    // Postgres puts nulls first when descending, which is the plain reverse.
                    SortOrder::Descending => compare(&b, &a),
                }
            });
        }

        Ok(rows.into_iter().cloned().map(Value::Object).collect())
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Value, GatewayError> {
        written_columns(table, &record)?;
        let mut supplied = match record {
            Value::Object(object) => object,
            _ => {
                return Err(GatewayError::NotAnObject {
                    table: table.name(),
                })
            }
        };

        let mut row = Map::new();
        for column in table.columns() {
            let value = supplied.remove(*column).unwrap_or(Value::Null);
            row.insert((*column).to_owned(), value);
        }
        if row["id"].is_null() {
            row.insert(String::from("id"), Value::String(Uuid::new_v4().to_string()));
        }
        row.insert(String::from("created_at"), now());
        if table.has_updated_at() {
            row.insert(String::from("updated_at"), now());
        }

        self.tables
            .lock()
            .entry(table)
            .or_default()
            .push(row.clone());
        Ok(Value::Object(row))
    }

    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<(), GatewayError> {
        record_columns(table, &patch)?;
        let key = id.to_string();

        let mut tables = self.tables.lock();
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|row| id_of(row) == Some(key.as_str())))
            .ok_or(GatewayError::NotFound {
                table: table.name(),
                id,
            })?;

        if let Value::Object(patch) = patch {
            if patch.is_empty() {
                return Ok(());
            }
            row.extend(patch);
        }
        stamp(table, row);
        Ok(())
    }

    async fn update_if(
        &self,
        table: Table,
        id: Uuid,
        expected: &Filter,
        patch: Value,
    ) -> Result<bool, GatewayError> {
        written_columns(table, &patch)?;
        table.check_column(&expected.column)?;
        let key = id.to_string();

        let mut tables = self.tables.lock();
        let row = match tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|row| id_of(row) == Some(key.as_str())))
        {
            Some(row) => row,
            None => return Ok(false),
        };
        if row.get(&expected.column).unwrap_or(&Value::Null) != &expected.value {
            return Ok(false);
        }

        if let Value::Object(patch) = patch {
            row.extend(patch);
        }
        stamp(table, row);
        Ok(true)
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<(), GatewayError> {
        let key = id.to_string();
        let mut tables = self.tables.lock();
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| id_of(row) != Some(key.as_str()));
        if rows.len() == before {
            return Err(GatewayError::NotFound {
                table: table.name(),
                id,
            });
        }

        if table == Table::Machines {
            let owner = Value::String(key);
            for log in MACHINE_LOGS {
                if let Some(rows) = tables.get_mut(&log) {
                    rows.retain(|row| row.get("machine_id") != Some(&owner));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let gateway = MemoryGateway::new();
        let row = gateway
            .insert(
                Table::ServiceOrders,
                json!({"type": "restock", "status": "open"}),
            )
            .await
            .unwrap();
        assert!(row["id"].as_str().unwrap().parse::<Uuid>().is_ok());
        assert!(row["created_at"].is_string());
        assert!(row["updated_at"].is_string());
        assert!(row["description"].is_null());
    }

    #[tokio::test]
    async fn insert_rejects_unknown_columns() {
        let gateway = MemoryGateway::new();
        let err = gateway
            .insert(Table::Machines, json!({"nome": "Alpha"}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownColumn { .. }));
    }

    #[tokio::test]
    async fn select_filters_then_sorts() {
        let gateway = MemoryGateway::new();
        for (name, status) in [("Gamma", "active"), ("Alpha", "active"), ("Beta", "inactive")] {
            gateway
                .insert(Table::Machines, json!({"name": name, "status": status}))
                .await
                .unwrap();
        }
        let rows = gateway
            .select(
                Table::Machines,
                &Query::new()
                    .eq("status", "active")
                    .unwrap()
                    .order_by("name", SortOrder::Ascending),
            )
            .await
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Alpha", "Gamma"]);
    }

    #[tokio::test]
    async fn nulls_sort_last_ascending() {
        let gateway = MemoryGateway::new();
        gateway
            .insert(Table::Machines, json!({"name": "no-coords"}))
            .await
            .unwrap();
        gateway
            .insert(Table::Machines, json!({"name": "south", "latitude": -23.5}))
            .await
            .unwrap();
        let rows = gateway
            .select(
                Table::Machines,
                &Query::new().order_by("latitude", SortOrder::Ascending),
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["name"], json!("south"));
        assert_eq!(rows[1]["name"], json!("no-coords"));
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let gateway = MemoryGateway::new();
        let missing = Uuid::new_v4();
        assert!(matches!(
            gateway
                .update(Table::Machines, missing, json!({"status": "inactive"}))
                .await,
            Err(GatewayError::NotFound { .. })
        ));
        assert!(matches!(
            gateway.delete(Table::Machines, missing).await,
            Err(GatewayError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_merges_patch() {
        let gateway = MemoryGateway::new();
        let row = gateway
            .insert(Table::Machines, json!({"name": "Alpha", "status": "active"}))
            .await
            .unwrap();
        let id: Uuid = row["id"].as_str().unwrap().parse().unwrap();
        gateway
            .update(Table::Machines, id, json!({"status": "maintenance"}))
            .await
            .unwrap();
        let rows = gateway
            .select(Table::Machines, &Query::new().eq("id", id).unwrap())
            .await
            .unwrap();
        assert_eq!(rows[0]["status"], json!("maintenance"));
        assert_eq!(rows[0]["name"], json!("Alpha"));
    }

    #[tokio::test]
    async fn empty_records_are_refused() {
        let gateway = MemoryGateway::new();
        assert!(matches!(
            gateway.insert(Table::Machines, json!({})).await,
            Err(GatewayError::EmptyRecord { .. })
        ));
    }

    #[tokio::test]
    async fn update_if_writes_only_while_the_guard_holds() {
        let gateway = MemoryGateway::new();
        let row = gateway
            .insert(Table::ServiceOrders, json!({"status": "open"}))
            .await
            .unwrap();
        let id: Uuid = row["id"].as_str().unwrap().parse().unwrap();
        let still_open = Filter::new("status", "open").unwrap();

        assert!(gateway
            .update_if(Table::ServiceOrders, id, &still_open, json!({"status": "done"}))
            .await
            .unwrap());
        assert!(!gateway
            .update_if(Table::ServiceOrders, id, &still_open, json!({"status": "in_progress"}))
            .await
            .unwrap());
        assert!(!gateway
            .update_if(Table::ServiceOrders, Uuid::new_v4(), &still_open, json!({"status": "done"}))
            .await
            .unwrap());

        let rows = gateway
            .select(Table::ServiceOrders, &Query::new().eq("id", id).unwrap())
            .await
            .unwrap();
        assert_eq!(rows[0]["status"], json!("done"));
    }

    #[tokio::test]
    async fn deleting_a_machine_drops_its_logs() {
        let gateway = MemoryGateway::new();
        let mut machines = Vec::new();
        for name in ["Alpha", "Beta"] {
            let row = gateway
                .insert(Table::Machines, json!({ "name": name }))
                .await
                .unwrap();
            machines.push(row["id"].clone());
        }
        for machine_id in &machines {
            gateway
                .insert(Table::StockMovements, json!({"machine_id": machine_id, "quantity": 3}))
                .await
                .unwrap();
            gateway
                .insert(Table::CashCollections, json!({"machine_id": machine_id, "amount": "5.00"}))
                .await
                .unwrap();
        }

        let alpha: Uuid = machines[0].as_str().unwrap().parse().unwrap();
        gateway.delete(Table::Machines, alpha).await.unwrap();

        for log in MACHINE_LOGS {
            let rows = gateway.select(log, &Query::new()).await.unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0]["machine_id"], machines[1]);
        }
    }
}
