use super::ApiResult;
use crate::auth::extract::CurrentSession;
use crate::dashboard::DashboardStats;
use crate::db::{self, SharedGateway};
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use log::debug;
use serde_json::json;

// GET /dashboard
pub async fn get_dashboard(
    CurrentSession(session): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
) -> ApiResult {
    let (machines, open_orders) = futures::try_join!(
        db::machines::get_all_machines(&*gateway),
        db::orders::get_open_orders(&*gateway),
    )?;
    let stats = DashboardStats::compute(&machines, &open_orders);
    debug!("Computed dashboard for {}: {:?}", session.email, stats);

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Retrieved stats for {} machines", stats.total_machines),
            "stats": stats
        })),
    ))
}
