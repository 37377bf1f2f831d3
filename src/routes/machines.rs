use super::ApiResult;
use crate::auth::extract::CurrentSession;
use crate::db::models::{Machine, MachineStatus, NewCashCollection, NewStockMovement};
use crate::db::{self, SharedGateway};
use crate::filter::filter_machines;
use crate::forms;
use crate::rules::{stock_ratio, MarkerColor, StockLevel};
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    search: String,
}

/// A machine plus everything derived from it for display.
#[derive(Debug, Serialize)]
pub struct MachineCard<'a> {
    #[serde(flatten)]
    machine: &'a Machine,
    status_label: &'static str,
    status_color: MarkerColor,
    stock_ratio: Option<f64>,
    fill_percent: Option<f64>,
    stock_level: StockLevel,
}

impl<'a> From<&'a Machine> for MachineCard<'a> {
    fn from(machine: &'a Machine) -> Self {
        MachineCard {
            machine,
            status_label: machine.status.label(),
            status_color: machine.status.marker_color(),
            stock_ratio: stock_ratio(machine),
            fill_percent: machine.fill_percent(),
            stock_level: machine.stock_level(),
        }
    }
}

// GET /machines?search=
pub async fn get_machines(
    CurrentSession(session): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
    Query(params): Query<SearchParams>,
) -> ApiResult {
    let machines = db::machines::get_all_machines(&*gateway).await?;
    let cards: Vec<MachineCard> = filter_machines(&machines, &params.search)
        .into_iter()
        .map(MachineCard::from)
        .collect();
    debug!(
        "{} searched machines for '{}': {} of {}",
        session.email,
        params.search,
        cards.len(),
        machines.len()
    );

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Retrieved {} machines", cards.len()),
            "machines": cards
        })),
    ))
}

// GET /machines/:id
pub async fn get_machine(
    CurrentSession(_): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let machine = db::machines::get_machine(&*gateway, id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Retrieved machine {}", machine.name),
            "machine": MachineCard::from(&machine)
        })),
    ))
}

// POST /machines
pub async fn post_machine(
    CurrentSession(session): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
    Json(body): Json<Value>,
) -> ApiResult {
    let new_machine = forms::machine_from(&body)?;
    let machine = db::machines::create_machine(&*gateway, &new_machine).await?;
    info!(
        "{} registered machine '{}' at {}",
        session.email, machine.name, machine.location
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Machine '{}' added successfully", machine.name),
            "machine": MachineCard::from(&machine)
        })),
    ))
}

// PATCH /machines/:id
pub async fn patch_machine(
    CurrentSession(session): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> ApiResult {
    let status: MachineStatus = forms::machine_status_from(&body)?;
    let machine = db::machines::get_machine(&*gateway, id).await?;
    db::machines::update_machine_status(&*gateway, id, status).await?;
    info!(
        "{} set machine '{}' status: {} -> {}",
        session.email, machine.name, machine.status, status
    );

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Machine '{}' is now {}", machine.name, status.label())
        })),
    ))
}

// DELETE /machines/:id
pub async fn delete_machine(
    CurrentSession(session): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let machine = db::machines::get_machine(&*gateway, id).await?;
    db::machines::delete_machine(&*gateway, id).await?;
    info!("{} deleted machine '{}'", session.email, machine.name);

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Machine '{}' deleted", machine.name)
        })),
    ))
}

// GET /machines/:id/movements
pub async fn get_movements(
    CurrentSession(_): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let movements = db::stock::get_stock_movements(&*gateway, id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Retrieved {} stock movements", movements.len()),
            "movements": movements
        })),
    ))
}

// POST /machines/:id/movements
pub async fn post_movement(
    CurrentSession(session): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> ApiResult {
    let request = forms::stock_movement_from(&body)?;
    let machine = db::machines::get_machine(&*gateway, id).await?;
    let movement = db::stock::log_stock_movement(
        &*gateway,
        &NewStockMovement {
            machine_id: machine.id,
            quantity: request.quantity,
            direction: request.direction,
            actor_id: session.user_id,
        },
    )
    .await?;
    info!(
        "{} logged stock {} of {} for machine '{}'",
        session.email, movement.direction, movement.quantity, machine.name
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Logged {} units {} for '{}'", movement.quantity, movement.direction, machine.name),
            "movement": movement
        })),
    ))
}

// GET /machines/:id/collections
pub async fn get_collections(
    CurrentSession(_): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let collections = db::cash::get_cash_collections(&*gateway, id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Retrieved {} cash collections", collections.len()),
            "collections": collections
        })),
    ))
}

// POST /machines/:id/collections
pub async fn post_collection(
    CurrentSession(session): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> ApiResult {
    let request = forms::cash_collection_from(&body)?;
    let machine = db::machines::get_machine(&*gateway, id).await?;
    let collection = db::cash::log_cash_collection(
        &*gateway,
        &NewCashCollection {
            machine_id: machine.id,
            amount: request.amount,
            actor_id: session.user_id,
        },
    )
    .await?;
    info!(
        "{} collected {} from machine '{}'",
        session.email, collection.amount, machine.name
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Collected {} from '{}'", collection.amount, machine.name),
            "collection": collection
        })),
    ))
}
