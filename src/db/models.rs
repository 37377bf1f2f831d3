use chrono::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Returned when a stored or submitted string names no variant of a status enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        UnknownVariant {
            kind,
            value: value.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    Active,
    Maintenance,
    LowStock,
    Inactive,
}

impl MachineStatus {
    pub const ALL: [MachineStatus; 4] = [
        MachineStatus::Active,
        MachineStatus::Maintenance,
        MachineStatus::LowStock,
        MachineStatus::Inactive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatus::Active => "active",
            MachineStatus::Maintenance => "maintenance",
            MachineStatus::LowStock => "low_stock",
            MachineStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for MachineStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MachineStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("machine status", s))
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Restock,
    CashCollection,
    Maintenance,
}

impl OrderType {
    pub const ALL: [OrderType; 3] = [
        OrderType::Restock,
        OrderType::CashCollection,
        OrderType::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Restock => "restock",
            OrderType::CashCollection => "cash_collection",
            OrderType::Maintenance => "maintenance",
        }
    }
}

impl FromStr for OrderType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("order type", s))
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    InProgress,
    Done,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [OrderStatus::Open, OrderStatus::InProgress, OrderStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Done => "done",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("order status", s))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Technician,
    Operator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Technician, Role::Operator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Technician => "technician",
            Role::Operator => "operator",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("role", s))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

impl FromStr for Direction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            _ => Err(UnknownVariant::new("stock direction", s)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: MachineStatus,
    pub toy_type: String,
    pub total_capacity: i32,
    pub current_stock: i32,
    pub last_collection_at: Option<DateTime<Utc>>,
    pub last_maintenance_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMachine {
    pub name: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: MachineStatus,
    pub toy_type: String,
    pub total_capacity: i32,
    pub current_stock: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOrder {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: OrderType,
    pub machine_id: Uuid,
    pub description: Option<String>,
    pub assignee_id: Uuid,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewServiceOrder {
    #[serde(rename = "type")]
    pub kind: OrderType,
    pub machine_id: Uuid,
    pub description: Option<String>,
    pub assignee_id: Uuid,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Profiles share their id with the auth user, so the caller supplies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub machine_id: Uuid,
    pub quantity: i32,
    pub direction: Direction,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStockMovement {
    pub machine_id: Uuid,
    pub quantity: i32,
    pub direction: Direction,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashCollection {
    pub id: Uuid,
    pub machine_id: Uuid,
    pub amount: Decimal,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCashCollection {
    pub machine_id: Uuid,
    pub amount: Decimal,
    pub actor_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn statuses_parse_from_their_wire_names() {
        for status in MachineStatus::ALL {
            assert_eq!(status.as_str().parse::<MachineStatus>(), Ok(status));
        }
        assert_eq!("in_progress".parse::<OrderStatus>(), Ok(OrderStatus::InProgress));
        assert_eq!("cash_collection".parse::<OrderType>(), Ok(OrderType::CashCollection));
    }

    #[test]
    fn unknown_strings_are_rejected() {
        let err = "ativa".parse::<MachineStatus>().unwrap_err();
        assert_eq!(err.value, "ativa");
        assert_eq!(err.to_string(), "'ativa' is not a valid machine status");
        assert!("em_execucao".parse::<OrderStatus>().is_err());
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn order_kind_uses_type_column() {
        let order = NewServiceOrder {
            kind: OrderType::Maintenance,
            machine_id: Uuid::nil(),
            description: None,
            assignee_id: Uuid::nil(),
            status: OrderStatus::Open,
        };
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["type"], json!("maintenance"));
        assert_eq!(value["status"], json!("open"));
    }

    #[test]
    fn row_with_foreign_status_fails_to_decode() {
        let row = json!({
            "id": Uuid::new_v4(),
            "name": "Alpha",
            "location": "Mall",
            "latitude": null,
            "longitude": null,
            "status": "broken",
            "toy_type": "plush",
            "total_capacity": 100,
            "current_stock": 10,
            "last_collection_at": null,
            "last_maintenance_at": null,
            "created_at": "2024-05-01T12:00:00Z"
        });
        assert!(serde_json::from_value::<Machine>(row).is_err());
    }
}
