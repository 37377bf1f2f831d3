use crate::db::models::{Machine, MachineStatus, OrderStatus, ServiceOrder};
use crate::rules::is_low_stock;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_machines: usize,
    pub low_stock_count: usize,
    pub in_maintenance_count: usize,
    pub open_orders_count: usize,
}

impl DashboardStats {
    /// Recomputed from scratch on every load.
    pub fn compute(machines: &[Machine], orders: &[ServiceOrder]) -> Self {
        DashboardStats {
            total_machines: machines.len(),
            low_stock_count: machines.iter().filter(|m| is_low_stock(m)).count(),
            in_maintenance_count: machines
                .iter()
                .filter(|m| m.status == MachineStatus::Maintenance)
                .count(),
            open_orders_count: orders
                .iter()
                .filter(|o| o.status == OrderStatus::Open)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::OrderType;
    use chrono::Utc;
    use uuid::Uuid;

    fn machine(name: &str, current_stock: i32, total_capacity: i32, status: MachineStatus) -> Machine {
        Machine {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            location: String::from("Mall"),
            latitude: None,
            longitude: None,
            status,
            toy_type: String::from("plush"),
            total_capacity,
            current_stock,
            last_collection_at: None,
            last_maintenance_at: None,
            created_at: Utc::now(),
        }
    }

    fn order(status: OrderStatus) -> ServiceOrder {
        ServiceOrder {
            id: Uuid::new_v4(),
            kind: OrderType::Maintenance,
            machine_id: Uuid::new_v4(),
            description: None,
            assignee_id: Uuid::new_v4(),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn counts_low_stock_against_twenty_percent() {
        let machines = vec![
            machine("Alpha", 10, 100, MachineStatus::Active),
            machine("Beta", 60, 100, MachineStatus::Active),
        ];
        let stats = DashboardStats::compute(&machines, &[]);
        assert_eq!(stats.total_machines, 2);
        assert_eq!(stats.low_stock_count, 1);
        assert_eq!(stats.in_maintenance_count, 0);
        assert_eq!(stats.open_orders_count, 0);
    }

    #[test]
    fn counts_maintenance_and_open_orders() {
        let machines = vec![
            machine("Alpha", 50, 100, MachineStatus::Maintenance),
            machine("Beta", 0, 0, MachineStatus::Inactive),
        ];
        let orders = vec![
            order(OrderStatus::Open),
            order(OrderStatus::Open),
            order(OrderStatus::Done),
        ];
        let stats = DashboardStats::compute(&machines, &orders);
        assert_eq!(stats.in_maintenance_count, 1);
        assert_eq!(stats.low_stock_count, 0);
        assert_eq!(stats.open_orders_count, 2);
    }

    #[test]
    fn empty_fleet_is_all_zeroes() {
        assert_eq!(DashboardStats::compute(&[], &[]), DashboardStats::default());
    }
}
