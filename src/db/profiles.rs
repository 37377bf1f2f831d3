use super::models::{NewProfile, UserProfile};
use super::{decode_rows, Gateway, GatewayError, Query, SortOrder, Table};
use uuid::Uuid;

/// Every profile ordered by name, for the assignee picker.
pub async fn get_profiles(gateway: &dyn Gateway) -> Result<Vec<UserProfile>, GatewayError> {
    let rows = gateway
        .select(
            Table::Profiles,
            &Query::new().order_by("name", SortOrder::Ascending),
        )
        .await?;
    decode_rows(rows)
}

/// A signed-up user may not have a profile row yet, so absence is not an error here.
pub async fn get_profile(
    gateway: &dyn Gateway,
    id: Uuid,
) -> Result<Option<UserProfile>, GatewayError> {
    let rows = gateway
        .select(Table::Profiles, &Query::new().eq("id", id)?)
        .await?;
    Ok(decode_rows(rows)?.into_iter().next())
}

pub async fn create_profile(
    gateway: &dyn Gateway,
    profile: &NewProfile,
) -> Result<UserProfile, GatewayError> {
    let row = gateway
        .insert(Table::Profiles, serde_json::to_value(profile)?)
        .await?;
    Ok(serde_json::from_value(row)?)
}

/// The stored profile for `profile.id`, inserting `profile` only when none
/// exists yet. Backends that create profiles from sign-up metadata win.
pub async fn ensure_profile(
    gateway: &dyn Gateway,
    profile: &NewProfile,
) -> Result<UserProfile, GatewayError> {
    match get_profile(gateway, profile.id).await? {
        Some(existing) => Ok(existing),
        None => create_profile(gateway, profile).await,
    }
}
