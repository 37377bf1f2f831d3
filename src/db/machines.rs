use super::models::{Machine, MachineStatus, NewMachine};
use super::{decode_one, decode_rows, Gateway, GatewayError, Query, SortOrder, Table};
use serde_json::json;
use uuid::Uuid;

/// Every machine, newest first.
pub async fn get_all_machines(gateway: &dyn Gateway) -> Result<Vec<Machine>, GatewayError> {
    let rows = gateway
        .select(
            Table::Machines,
            &Query::new().order_by("created_at", SortOrder::Descending),
        )
        .await?;
    decode_rows(rows)
}

/// Every machine ordered by name, for pickers.
pub async fn get_machines_by_name(gateway: &dyn Gateway) -> Result<Vec<Machine>, GatewayError> {
    let rows = gateway
        .select(
            Table::Machines,
            &Query::new().order_by("name", SortOrder::Ascending),
        )
        .await?;
    decode_rows(rows)
}

pub async fn get_machine(gateway: &dyn Gateway, id: Uuid) -> Result<Machine, GatewayError> {
    let rows = gateway
        .select(Table::Machines, &Query::new().eq("id", id)?)
        .await?;
    decode_one(Table::Machines, id, rows)
}

pub async fn create_machine(
    gateway: &dyn Gateway,
    machine: &NewMachine,
) -> Result<Machine, GatewayError> {
    let row = gateway
        .insert(Table::Machines, serde_json::to_value(machine)?)
        .await?;
    Ok(serde_json::from_value(row)?)
}

pub async fn update_machine_status(
    gateway: &dyn Gateway,
    id: Uuid,
    status: MachineStatus,
) -> Result<(), GatewayError> {
    gateway
        .update(Table::Machines, id, json!({ "status": status }))
        .await
}

pub async fn delete_machine(gateway: &dyn Gateway, id: Uuid) -> Result<(), GatewayError> {
    gateway.delete(Table::Machines, id).await
}
