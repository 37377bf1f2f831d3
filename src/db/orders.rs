use super::models::{NewServiceOrder, OrderStatus, ServiceOrder};
use super::{decode_one, decode_rows, Filter, Gateway, GatewayError, Query, SortOrder, Table};
use serde_json::json;
use uuid::Uuid;

/// Every service order, newest first.
pub async fn get_all_orders(gateway: &dyn Gateway) -> Result<Vec<ServiceOrder>, GatewayError> {
    let rows = gateway
        .select(
            Table::ServiceOrders,
            &Query::new().order_by("created_at", SortOrder::Descending),
        )
        .await?;
    decode_rows(rows)
}

pub async fn get_open_orders(gateway: &dyn Gateway) -> Result<Vec<ServiceOrder>, GatewayError> {
    let rows = gateway
        .select(
            Table::ServiceOrders,
            &Query::new().eq("status", OrderStatus::Open)?,
        )
        .await?;
    decode_rows(rows)
}

pub async fn get_order(gateway: &dyn Gateway, id: Uuid) -> Result<ServiceOrder, GatewayError> {
    let rows = gateway
        .select(Table::ServiceOrders, &Query::new().eq("id", id)?)
        .await?;
    decode_one(Table::ServiceOrders, id, rows)
}

pub async fn create_order(
    gateway: &dyn Gateway,
    order: &NewServiceOrder,
) -> Result<ServiceOrder, GatewayError> {
    let row = gateway
        .insert(Table::ServiceOrders, serde_json::to_value(order)?)
        .await?;
    Ok(serde_json::from_value(row)?)
}

/// Moves the order from `from` to `to` if it is still at `from`. Whether the
/// move is allowed is decided by the caller; `Ok(false)` means another writer
/// got there first and nothing was written.
pub async fn update_order_status(
    gateway: &dyn Gateway,
    id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<bool, GatewayError> {
    gateway
        .update_if(
            Table::ServiceOrders,
            id,
            &Filter::new("status", from)?,
            json!({ "status": to }),
        )
        .await
}
