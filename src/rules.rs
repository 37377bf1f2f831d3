//! Derived state shown next to machines and service orders: stock ratio and
//! fill level, status labels and marker colors, and the order status policy.

use crate::db::models::{Machine, MachineStatus, OrderStatus, OrderType};
use serde::Serialize;
use thiserror::Error;

/// Machines below this share of capacity count as low on stock.
pub const LOW_STOCK_THRESHOLD: f64 = 0.2;

/// Fill ratio above which a machine is healthy.
pub const HEALTHY_THRESHOLD: f64 = 0.5;

/// Shown for any status string outside the known set.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    Healthy,
    Warning,
    Critical,
    /// Capacity is zero or negative, so no ratio exists.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerColor {
    Green,
    Yellow,
    Red,
    Blue,
    Gray,
}

/// `current_stock / total_capacity`, clamped to `[0, 1]`.
///
/// Returns `None` when `total_capacity <= 0`: stock is unknown rather than
/// empty or full, and no NaN or infinity ever leaves this function.
pub fn stock_ratio(machine: &Machine) -> Option<f64> {
    if machine.total_capacity <= 0 {
        return None;
    }
    let ratio = f64::from(machine.current_stock) / f64::from(machine.total_capacity);
    Some(ratio.clamp(0.0, 1.0))
}

pub fn is_low_stock(machine: &Machine) -> bool {
    is_low_stock_with(machine, LOW_STOCK_THRESHOLD)
}

/// Strictly below `threshold`. Unknown stock is never low.
pub fn is_low_stock_with(machine: &Machine, threshold: f64) -> bool {
    stock_ratio(machine).map_or(false, |ratio| ratio < threshold)
}

/// Ties go to the less severe band: exactly 0.5 is a warning, exactly 0.2 is critical.
pub fn stock_fill_color(ratio: f64) -> StockLevel {
    if ratio > HEALTHY_THRESHOLD {
        StockLevel::Healthy
    } else if ratio > LOW_STOCK_THRESHOLD {
        StockLevel::Warning
    } else {
        StockLevel::Critical
    }
}

impl Machine {
    pub fn stock_level(&self) -> StockLevel {
        stock_ratio(self).map_or(StockLevel::Unknown, stock_fill_color)
    }

    /// Width of the stock bar, 0 to 100.
    pub fn fill_percent(&self) -> Option<f64> {
        stock_ratio(self).map(|ratio| ratio * 100.0)
    }
}

impl MachineStatus {
    pub fn label(&self) -> &'static str {
        match self {
            MachineStatus::Active => "Operating normally",
            MachineStatus::Maintenance => "Under maintenance",
            MachineStatus::LowStock => "Low stock",
            MachineStatus::Inactive => "Inactive",
        }
    }

    pub fn marker_color(&self) -> MarkerColor {
        match self {
            MachineStatus::Active => MarkerColor::Green,
            MachineStatus::Maintenance => MarkerColor::Red,
            MachineStatus::LowStock => MarkerColor::Yellow,
            MachineStatus::Inactive => MarkerColor::Gray,
        }
    }
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Open => "Open",
            OrderStatus::InProgress => "In progress",
            OrderStatus::Done => "Done",
        }
    }

    pub fn marker_color(&self) -> MarkerColor {
        match self {
            OrderStatus::Open => MarkerColor::Yellow,
            OrderStatus::InProgress => MarkerColor::Blue,
            OrderStatus::Done => MarkerColor::Green,
        }
    }

    /// The one status this order may move to next, if any.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Open => Some(OrderStatus::InProgress),
            OrderStatus::InProgress => Some(OrderStatus::Done),
            OrderStatus::Done => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl OrderType {
    pub fn label(&self) -> &'static str {
        match self {
            OrderType::Restock => "Restock",
            OrderType::CashCollection => "Cash collection",
            OrderType::Maintenance => "Maintenance",
        }
    }
}

pub fn machine_status_label(raw: &str) -> &'static str {
    raw.parse::<MachineStatus>()
        .map_or(UNKNOWN_LABEL, |status| status.label())
}

pub fn machine_status_marker_color(raw: &str) -> MarkerColor {
    raw.parse::<MachineStatus>()
        .map_or(MarkerColor::Gray, |status| status.marker_color())
}

pub fn order_status_label(raw: &str) -> &'static str {
    raw.parse::<OrderStatus>()
        .map_or(UNKNOWN_LABEL, |status| status.label())
}

pub fn order_status_marker_color(raw: &str) -> MarkerColor {
    raw.parse::<OrderStatus>()
        .map_or(MarkerColor::Gray, |status| status.marker_color())
}

pub fn order_type_label(raw: &str) -> &'static str {
    raw.parse::<OrderType>()
        .map_or(UNKNOWN_LABEL, |kind| kind.label())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("order is already {0} and cannot change status")]
    Terminal(OrderStatus),
    #[error("order cannot move from {from} to {to}")]
    NotAllowed { from: OrderStatus, to: OrderStatus },
    #[error("order changed status while moving from {0}, reload and try again")]
    Changed(OrderStatus),
}

/// Service orders move `open -> in_progress -> done`, one step at a time.
/// Writing the current status again is accepted and changes nothing.
pub fn transition(from: OrderStatus, to: OrderStatus) -> Result<OrderStatus, TransitionError> {
    if from == to {
        return Ok(to);
    }
    match from.next() {
        Some(next) if next == to => Ok(to),
        Some(_) => Err(TransitionError::NotAllowed { from, to }),
        None => Err(TransitionError::Terminal(from)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn machine(current_stock: i32, total_capacity: i32) -> Machine {
        Machine {
            id: Uuid::new_v4(),
            name: String::from("Alpha"),
            location: String::from("Mall"),
            latitude: None,
            longitude: None,
            status: MachineStatus::Active,
            toy_type: String::from("plush"),
            total_capacity,
            current_stock,
            last_collection_at: None,
            last_maintenance_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ratio_stays_within_bounds() {
        for (stock, capacity) in [(0, 10), (10, 10), (3, 7), (-4, 10), (250, 100)] {
            let ratio = stock_ratio(&machine(stock, capacity)).unwrap();
            assert!((0.0..=1.0).contains(&ratio), "{stock}/{capacity} gave {ratio}");
        }
    }

    #[test]
    fn zero_capacity_is_unknown_not_nan() {
        let empty = machine(0, 0);
        assert_eq!(stock_ratio(&empty), None);
        assert_eq!(stock_ratio(&machine(5, -1)), None);
        assert_eq!(empty.stock_level(), StockLevel::Unknown);
        assert_eq!(empty.fill_percent(), None);
        assert!(!is_low_stock(&empty));
    }

    #[test]
    fn low_stock_is_strictly_below_threshold() {
        assert!(is_low_stock(&machine(19, 100)));
        assert!(!is_low_stock(&machine(20, 100)));
        assert!(is_low_stock(&machine(0, 100)));
        assert!(is_low_stock_with(&machine(40, 100), 0.5));
    }

    #[test]
    fn fill_color_ties_go_to_lower_severity() {
        assert_eq!(stock_fill_color(0.51), StockLevel::Healthy);
        assert_eq!(stock_fill_color(0.5), StockLevel::Warning);
        assert_eq!(stock_fill_color(0.21), StockLevel::Warning);
        assert_eq!(stock_fill_color(0.2), StockLevel::Critical);
        assert_eq!(stock_fill_color(0.0), StockLevel::Critical);
        assert_eq!(machine(60, 100).stock_level(), StockLevel::Healthy);
    }

    #[test]
    fn labels_cover_known_statuses_and_flag_the_rest() {
        assert_eq!(machine_status_label("active"), "Operating normally");
        assert_eq!(machine_status_label("ativa"), UNKNOWN_LABEL);
        assert_eq!(machine_status_label(""), UNKNOWN_LABEL);
        assert_eq!(machine_status_marker_color("maintenance"), MarkerColor::Red);
        assert_eq!(machine_status_marker_color("???"), MarkerColor::Gray);
        assert_eq!(order_status_label("in_progress"), "In progress");
        assert_eq!(order_status_label("em_execucao"), UNKNOWN_LABEL);
        assert_eq!(order_status_marker_color("open"), MarkerColor::Yellow);
        assert_eq!(order_type_label("cash_collection"), "Cash collection");
        assert_eq!(order_type_label("recolhimento"), UNKNOWN_LABEL);
        for status in MachineStatus::ALL {
            assert!(!status.label().is_empty());
        }
    }

    #[test]
    fn orders_move_forward_one_step() {
        use OrderStatus::*;
        assert_eq!(transition(Open, InProgress), Ok(InProgress));
        assert_eq!(transition(InProgress, Done), Ok(Done));
        assert_eq!(transition(Open, Open), Ok(Open));
        assert_eq!(
            transition(Open, Done),
            Err(TransitionError::NotAllowed { from: Open, to: Done })
        );
        assert_eq!(
            transition(InProgress, Open),
            Err(TransitionError::NotAllowed { from: InProgress, to: Open })
        );
        assert_eq!(transition(Done, Open), Err(TransitionError::Terminal(Done)));
        assert!(Done.is_terminal());
        assert!(!Open.is_terminal());
    }
}
