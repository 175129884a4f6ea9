//! Account and maintenance calls that sit outside the browse/poll flows.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::resource::Dataset;
use crate::session::User;
use crate::wire::reject_unsuccessful;
use crate::{ApiError, FailureKind};

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    user: Option<User>,
}

/// Exchange credentials for a token and store it in the client's session.
pub async fn login(client: &ApiClient, username: &str, password: &str) -> Result<User, ApiError> {
    let body = json!({ "username": username, "password": password });
    let response: LoginResponse = client.post_json("/login", Some(&body)).await?;
    let user = response.user.unwrap_or_else(|| User {
        username: username.to_string(),
        ..User::default()
    });
    client.session().set_token(Some(response.token));
    client.session().set_user(Some(user.clone()));
    Ok(user)
}

/// Current user for the session token.
pub async fn me(client: &ApiClient) -> Result<User, ApiError> {
    let body: Value = client.get_json("/me", &[]).await?;
    reject_unsuccessful(&body)?;
    let user_value = body.get("user").cloned().unwrap_or(body);
    let user: User = serde_json::from_value(user_value)
        .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
    client.session().set_user(Some(user.clone()));
    Ok(user)
}

/// Record count of one dataset.
pub async fn dataset_stats(client: &ApiClient, dataset: Dataset) -> Result<u64, ApiError> {
    let Some(path) = dataset.stats_path() else {
        return Err(ApiError::new(
            FailureKind::InvalidUrl,
            format!("{dataset} has no stats endpoint"),
        ));
    };
    let body: Value = client.get_json(path, &[]).await?;
    reject_unsuccessful(&body)?;
    body.get("stats")
        .and_then(Value::as_u64)
        .ok_or_else(|| ApiError::new(FailureKind::Decode, "stats response has no count"))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStat {
    pub collection_name: String,
    #[serde(default)]
    pub document_count: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub index_count: u64,
}

/// Per-collection document counts from `/stats`.
pub async fn collection_stats(client: &ApiClient) -> Result<Vec<CollectionStat>, ApiError> {
    let body: Value = client.get_json("/stats", &[]).await?;
    reject_unsuccessful(&body)?;
    let list = match body {
        Value::Array(_) => body,
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Array(Vec::new())),
        _ => Value::Array(Vec::new()),
    };
    serde_json::from_value(list).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

/// Mark adult-keyword references as reviewed, either as adult content or not.
pub async fn bulk_process_references(
    client: &ApiClient,
    record_ids: &[String],
    is_adult_content: bool,
) -> Result<String, ApiError> {
    if record_ids.is_empty() {
        return Err(ApiError::new(
            FailureKind::Rejected,
            "No records selected",
        ));
    }
    let body = json!({ "recordIds": record_ids, "isAdultContent": is_adult_content });
    let response: Value = client
        .post_json("/adult-keywords/references/bulk-process", Some(&body))
        .await?;
    reject_unsuccessful(&response)?;
    Ok(response
        .get("message")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format!("Processed {} records", record_ids.len())))
}

/// Remove every record of a dataset. Returns the deleted count when reported.
pub async fn delete_all(client: &ApiClient, dataset: Dataset) -> Result<Option<u64>, ApiError> {
    let Some((path, confirm)) = dataset.delete_all() else {
        return Err(ApiError::new(
            FailureKind::InvalidUrl,
            format!("{dataset} does not support delete-all"),
        ));
    };
    let body = confirm.map(|confirm| json!({ "confirm": confirm }));
    let response: Value = client.delete_json(path, body.as_ref()).await?;
    reject_unsuccessful(&response)?;
    Ok(response
        .get("deletedCount")
        .or_else(|| response.pointer("/data/deletedCount"))
        .and_then(Value::as_u64))
}
