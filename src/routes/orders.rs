use super::ApiResult;
use crate::auth::extract::CurrentSession;
use crate::db::models::{NewServiceOrder, OrderStatus, ServiceOrder};
use crate::db::{self, SharedGateway};
use crate::filter::{filter_orders, MachineRef, OrderView, ProfileRef, StatusFilter};
use crate::forms::{self, FormError};
use crate::rules::{self, MarkerColor, TransitionError};
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

const NO_MACHINE: &str = "Unknown machine";
const NO_ASSIGNEE: &str = "Unassigned";

#[derive(Debug, Deserialize)]
pub struct OrderParams {
    #[serde(default)]
    search: String,
    status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderCard<'a> {
    #[serde(flatten)]
    order: &'a ServiceOrder,
    type_label: &'static str,
    status_label: &'static str,
    status_color: MarkerColor,
    /// False once the order is done; the status control is hidden then.
    can_advance: bool,
    next_status: Option<OrderStatus>,
    machine: Option<&'a MachineRef>,
    machine_name: &'a str,
    assignee: Option<&'a ProfileRef>,
    assignee_name: &'a str,
}

impl<'a> From<&'a OrderView> for OrderCard<'a> {
    fn from(view: &'a OrderView) -> Self {
        let order = &view.order;
        OrderCard {
            order,
            type_label: order.kind.label(),
            status_label: order.status.label(),
            status_color: order.status.marker_color(),
            can_advance: !order.status.is_terminal(),
            next_status: order.status.next(),
            machine: view.machine.as_ref(),
            machine_name: view.machine.as_ref().map_or(NO_MACHINE, |m| m.name.as_str()),
            assignee: view.assignee.as_ref(),
            assignee_name: view.assignee.as_ref().map_or(NO_ASSIGNEE, |p| p.name.as_str()),
        }
    }
}

// GET /orders?search=&status=
pub async fn get_orders(
    CurrentSession(session): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
    Query(params): Query<OrderParams>,
) -> ApiResult {
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => StatusFilter::All,
        Some(raw) => raw.parse::<StatusFilter>()?,
    };

    let (orders, machines, profiles) = futures::try_join!(
        db::orders::get_all_orders(&*gateway),
        db::machines::get_all_machines(&*gateway),
        db::profiles::get_profiles(&*gateway),
    )?;
    let views = OrderView::join(orders, &machines, &profiles);
    let cards: Vec<OrderCard> = filter_orders(&views, &params.search, status)
        .into_iter()
        .map(OrderCard::from)
        .collect();
    debug!(
        "{} searched orders for '{}' ({:?}): {} of {}",
        session.email,
        params.search,
        status,
        cards.len(),
        views.len()
    );

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Retrieved {} service orders", cards.len()),
            "orders": cards
        })),
    ))
}

// POST /orders
pub async fn post_order(
    CurrentSession(session): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
    Json(body): Json<Value>,
) -> ApiResult {
    let request = forms::order_from(&body)?;
    let machine = db::machines::get_machine(&*gateway, request.machine_id).await?;
    let assignee = db::profiles::get_profile(&*gateway, request.assignee_id)
        .await?
        .ok_or(FormError::Invalid {
            field: "assignee_id",
            reason: String::from("does not belong to any user"),
        })?;

    let order = db::orders::create_order(
        &*gateway,
        &NewServiceOrder {
            kind: request.kind,
            machine_id: machine.id,
            description: request.description,
            assignee_id: assignee.id,
            status: OrderStatus::Open,
        },
    )
    .await?;
    info!(
        "{} opened a {} order for '{}' assigned to {}",
        session.email, order.kind, machine.name, assignee.email
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("{} order opened for '{}'", order.kind.label(), machine.name),
            "order": order
        })),
    ))
}

// PATCH /orders/:id
pub async fn patch_order(
    CurrentSession(session): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> ApiResult {
    let target = forms::order_status_from(&body)?;
    let order = db::orders::get_order(&*gateway, id).await?;
    let status = rules::transition(order.status, target)?;

    if status != order.status {
        if !db::orders::update_order_status(&*gateway, id, order.status, status).await? {
            return Err(TransitionError::Changed(order.status).into());
        }
        info!(
            "{} moved order {}: {} -> {}",
            session.email, order.id, order.status, status
        );
    } else {
        debug!("Order {} already {}, nothing to write", order.id, status);
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Order is now {}", status.label()),
            "status": status
        })),
    ))
}
