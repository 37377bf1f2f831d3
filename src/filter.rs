use crate::db::models::{Machine, OrderStatus, ServiceOrder, UnknownVariant, UserProfile};
use serde::Serialize;
use std::str::FromStr;

/// The slice of a machine shown next to an order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineRef {
    pub name: String,
    pub location: String,
}

impl From<&Machine> for MachineRef {
    fn from(machine: &Machine) -> Self {
        MachineRef {
            name: machine.name.clone(),
            location: machine.location.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRef {
    pub name: String,
    pub email: String,
}

impl From<&UserProfile> for ProfileRef {
    fn from(profile: &UserProfile) -> Self {
        ProfileRef {
            name: profile.name.clone(),
            email: profile.email.clone(),
        }
    }
}

/// An order joined with its machine and assignee. Either side may be missing
/// when the referenced row was deleted or never existed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderView {
    pub order: ServiceOrder,
    pub machine: Option<MachineRef>,
    pub assignee: Option<ProfileRef>,
}

impl OrderView {
    /// Joins each order against the given machines and profiles, keeping order.
    pub fn join(
        orders: Vec<ServiceOrder>,
        machines: &[Machine],
        profiles: &[UserProfile],
    ) -> Vec<OrderView> {
        orders
            .into_iter()
            .map(|order| OrderView {
                machine: machines
                    .iter()
                    .find(|m| m.id == order.machine_id)
                    .map(MachineRef::from),
                assignee: profiles
                    .iter()
                    .find(|p| p.id == order.assignee_id)
                    .map(ProfileRef::from),
                order,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(OrderStatus),
}

impl Default for StatusFilter {
    fn default() -> Self {
        StatusFilter::All
    }
}

impl StatusFilter {
    pub fn accepts(&self, status: OrderStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            other => other.parse().map(StatusFilter::Only),
        }
    }
}

/// The lowercased search term, or `None` when the term is blank and matches
/// everything. Surrounding whitespace is part of a non-blank term.
fn needle(term: &str) -> Option<String> {
    if term.trim().is_empty() {
        None
    } else {
        Some(term.to_lowercase())
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Machines whose name or location contains `term`, ignoring case, in input order.
pub fn filter_machines<'a, I>(machines: I, term: &str) -> Vec<&'a Machine>
where
    I: IntoIterator<Item = &'a Machine>,
{
    let needle = needle(term);
    machines
        .into_iter()
        .filter(|machine| match &needle {
            None => true,
            Some(needle) => contains(&machine.name, needle) || contains(&machine.location, needle),
        })
        .collect()
}

/// Orders whose machine name or description contains `term` and whose status
/// passes `status`. Missing joins and descriptions never match a non-blank term.
pub fn filter_orders<'a, I>(orders: I, term: &str, status: StatusFilter) -> Vec<&'a OrderView>
where
    I: IntoIterator<Item = &'a OrderView>,
{
    let needle = needle(term);
    orders
        .into_iter()
        .filter(|view| status.accepts(view.order.status))
        .filter(|view| match &needle {
            None => true,
            Some(needle) => {
                view.machine
                    .as_ref()
                    .map_or(false, |machine| contains(&machine.name, needle))
                    || view
                        .order
                        .description
                        .as_deref()
                        .map_or(false, |description| contains(description, needle))
            }
        })
        .collect()
}
