use super::models::{NewStockMovement, StockMovement};
use super::{decode_rows, Gateway, GatewayError, Query, SortOrder, Table};
use uuid::Uuid;

/// The movement log of one machine, newest first.
pub async fn get_stock_movements(
    gateway: &dyn Gateway,
    machine_id: Uuid,
) -> Result<Vec<StockMovement>, GatewayError> {
    let rows = gateway
        .select(
            Table::StockMovements,
            &Query::new()
                .eq("machine_id", machine_id)?
                .order_by("created_at", SortOrder::Descending),
        )
        .await?;
    decode_rows(rows)
}

pub async fn log_stock_movement(
    gateway: &dyn Gateway,
    movement: &NewStockMovement,
) -> Result<StockMovement, GatewayError> {
    let row = gateway
        .insert(Table::StockMovements, serde_json::to_value(movement)?)
        .await?;
    Ok(serde_json::from_value(row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryGateway;
    use crate::db::models::Direction;

    #[tokio::test]
    async fn movements_are_scoped_to_their_machine() {
        let gateway = MemoryGateway::new();
        let (ours, theirs, actor) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        for (machine_id, quantity) in [(ours, 30), (theirs, 5), (ours, 2)] {
            log_stock_movement(
                &gateway,
                &NewStockMovement {
                    machine_id,
                    quantity,
                    direction: Direction::In,
                    actor_id: actor,
                },
            )
            .await
            .unwrap();
        }

        let log = get_stock_movements(&gateway, ours).await.unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|m| m.machine_id == ours));
    }
}
