use super::models::{CashCollection, NewCashCollection};
use super::{decode_rows, Gateway, GatewayError, Query, SortOrder, Table};
use uuid::Uuid;

/// The collection log of one machine, newest first.
pub async fn get_cash_collections(
    gateway: &dyn Gateway,
    machine_id: Uuid,
) -> Result<Vec<CashCollection>, GatewayError> {
    let rows = gateway
        .select(
            Table::CashCollections,
            &Query::new()
                .eq("machine_id", machine_id)?
                .order_by("created_at", SortOrder::Descending),
        )
        .await?;
    decode_rows(rows)
}

pub async fn log_cash_collection(
    gateway: &dyn Gateway,
    collection: &NewCashCollection,
) -> Result<CashCollection, GatewayError> {
    let row = gateway
        .insert(Table::CashCollections, serde_json::to_value(collection)?)
        .await?;
    Ok(serde_json::from_value(row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryGateway;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn amount_survives_the_gateway() {
        let gateway = MemoryGateway::new();
        let machine_id = Uuid::new_v4();
        let amount = Decimal::new(12_750, 2);
        let logged = log_cash_collection(
            &gateway,
            &NewCashCollection {
                machine_id,
                amount,
                actor_id: Uuid::new_v4(),
            },
        )
        .await
        .unwrap();
        assert_eq!(logged.amount, amount);

        let log = get_cash_collections(&gateway, machine_id).await.unwrap();
        assert_eq!(log, vec![logged]);
    }
}
