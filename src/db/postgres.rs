use super::{record_columns, written_columns, Filter, Gateway, GatewayError, Query, SortOrder, Table};
use async_trait::async_trait;
use itertools::Itertools;
use log::debug;
use serde_json::Value;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use uuid::Uuid;

/// Gateway over a Postgres pool. Records go in through `jsonb_populate_record`
/// and come back out through `to_jsonb`, so column types stay owned by the schema.
#[derive(Clone)]
pub struct PgGateway {
    pool: Arc<Pool<Postgres>>,
}

impl PgGateway {
    #[must_use]
    pub fn new(pool: Arc<Pool<Postgres>>) -> Self {
        PgGateway { pool }
    }
}

fn select_sql(table: Table, query: &Query) -> Result<String, GatewayError> {
    let name = table.name();
    let mut sql = format!("SELECT to_jsonb(t) FROM {name} t");
    if let Some(filter) = &query.filter {
        let column = table.check_column(&filter.column)?;
        sql.push_str(&format!(
            " WHERE t.{column} IS NOT DISTINCT FROM (SELECT r.{column} FROM jsonb_populate_record(NULL::{name}, $1) r)"
        ));
    }
    if let Some(order) = &query.order {
        let column = table.check_column(&order.column)?;
        let direction = match order.direction {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        sql.push_str(&format!(" ORDER BY t.{column} {direction}"));
    }
    Ok(sql)
}

fn insert_sql(table: Table, columns: &[String]) -> String {
    let name = table.name();
    let columns = columns.iter().join(", ");
    format!(
        "INSERT INTO {name} ({columns})
        SELECT {columns} FROM jsonb_populate_record(NULL::{name}, $1)
        RETURNING to_jsonb({name}.*)"
    )
}

fn update_sql(table: Table, columns: &[String]) -> String {
    let name = table.name();
    let mut assignments = columns
        .iter()
        .map(|column| format!("{column} = r.{column}"))
        .collect::<Vec<_>>();
    if table.has_updated_at() {
        assignments.push(String::from("updated_at = now()"));
    }
    format!(
        "UPDATE {name} AS t SET {}
        FROM jsonb_populate_record(NULL::{name}, $1) AS r
        WHERE t.id = $2::uuid",
        assignments.iter().join(", ")
    )
}

/// `update_sql` narrowed to rows whose `guard` column still holds the value in `$3`.
fn guarded_update_sql(table: Table, columns: &[String], guard: &str) -> String {
    let name = table.name();
    format!(
        "{} AND t.{guard} IS NOT DISTINCT FROM (SELECT e.{guard} FROM jsonb_populate_record(NULL::{name}, $3) e)",
        update_sql(table, columns)
    )
}

fn probe(filter: &Filter) -> Value {
    let mut probe = serde_json::Map::new();
    probe.insert(filter.column.clone(), filter.value.clone());
    Value::Object(probe)
}

#[async_trait]
impl Gateway for PgGateway {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, GatewayError> {
        let sql = select_sql(table, query)?;
        debug!("{}", sql);
        let mut statement = sqlx::query_scalar::<_, Value>(&sql);
        if let Some(filter) = &query.filter {
            statement = statement.bind(probe(filter));
        }
        Ok(statement.fetch_all(&*self.pool).await?)
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Value, GatewayError> {
        let columns = written_columns(table, &record)?;
        let sql = insert_sql(table, &columns);
        debug!("{}", sql);
        Ok(sqlx::query_scalar::<_, Value>(&sql)
            .bind(record)
            .fetch_one(&*self.pool)
            .await?)
    }

    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<(), GatewayError> {
        let columns = record_columns(table, &patch)?;
        if columns.is_empty() {
            return Ok(());
        }
        let sql = update_sql(table, &columns);
        debug!("{}", sql);
        let result = sqlx::query(&sql)
            .bind(patch)
            .bind(id.to_string())
            .execute(&*self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound {
                table: table.name(),
                id,
            });
        }
        Ok(())
    }

    async fn update_if(
        &self,
        table: Table,
        id: Uuid,
        expected: &Filter,
        patch: Value,
    ) -> Result<bool, GatewayError> {
        let columns = written_columns(table, &patch)?;
        let guard = table.check_column(&expected.column)?;
        let sql = guarded_update_sql(table, &columns, guard);
        debug!("{}", sql);
        let result = sqlx::query(&sql)
            .bind(patch)
            .bind(id.to_string())
            .bind(probe(expected))
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<(), GatewayError> {
        let sql = format!("DELETE FROM {} WHERE id = $1::uuid", table.name());
        let result = sqlx::query(&sql)
            .bind(id.to_string())
            .execute(&*self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound {
                table: table.name(),
                id,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_sql_filters_and_sorts_on_checked_columns() {
        let query = Query::new()
            .eq("status", "open")
            .unwrap()
            .order_by("created_at", SortOrder::Descending);
        let sql = select_sql(Table::ServiceOrders, &query).unwrap();
        assert!(sql.starts_with("SELECT to_jsonb(t) FROM service_orders t WHERE t.status"));
        assert!(sql.ends_with("ORDER BY t.created_at DESC"));
    }

    #[test]
    fn select_sql_refuses_unknown_sort_column() {
        let query = Query::new().order_by("1; --", SortOrder::Ascending);
        assert!(matches!(
            select_sql(Table::Machines, &query),
            Err(GatewayError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn update_sql_bumps_updated_at_where_present() {
        let columns = vec![String::from("status")];
        assert!(update_sql(Table::ServiceOrders, &columns).contains("updated_at = now()"));
        assert!(!update_sql(Table::Machines, &columns).contains("updated_at"));
    }

    #[test]
    fn insert_sql_lists_only_supplied_columns() {
        let columns = vec![String::from("name"), String::from("status")];
        let sql = insert_sql(Table::Machines, &columns);
        assert!(sql.starts_with("INSERT INTO machines (name, status)"));
        assert!(sql.contains("RETURNING to_jsonb(machines.*)"));
    }

    #[test]
    fn guarded_update_checks_the_old_value() {
        let columns = vec![String::from("status")];
        let sql = guarded_update_sql(Table::ServiceOrders, &columns, "status");
        assert!(sql.contains("WHERE t.id = $2::uuid AND t.status IS NOT DISTINCT FROM"));
        assert!(sql.contains("jsonb_populate_record(NULL::service_orders, $3)"));
    }
}
