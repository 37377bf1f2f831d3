use super::ApiResult;
use crate::auth::extract::CurrentSession;
use crate::db::models::{Machine, MachineStatus};
use crate::db::{self, SharedGateway};
use crate::rules::MarkerColor;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

/// A machine as a map pin. Placement only; no distances or clustering.
#[derive(Debug, Serialize)]
struct MapMarker<'a> {
    id: Uuid,
    name: &'a str,
    location: &'a str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    status: MachineStatus,
    label: &'static str,
    color: MarkerColor,
}

impl<'a> From<&'a Machine> for MapMarker<'a> {
    fn from(machine: &'a Machine) -> Self {
        MapMarker {
            id: machine.id,
            name: &machine.name,
            location: &machine.location,
            latitude: machine.latitude,
            longitude: machine.longitude,
            status: machine.status,
            label: machine.status.label(),
            color: machine.status.marker_color(),
        }
    }
}

// GET /map
pub async fn get_map(
    CurrentSession(_): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
) -> ApiResult {
    let machines = db::machines::get_all_machines(&*gateway).await?;
    let unplaced = machines
        .iter()
        .filter(|m| m.latitude.is_none() || m.longitude.is_none())
        .count();
    let markers: Vec<MapMarker> = machines.iter().map(MapMarker::from).collect();

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Retrieved {} markers", markers.len()),
            "markers": markers,
            "unplaced": unplaced
        })),
    ))
}
