use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::LOCATION;
use tracing::debug;

use crate::error::{Error, Result};
use crate::http::{Endpoint, ResourceClient};
use crate::k8s;

static ACCESS_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"access_token=([^&]+)").expect("static regex"));

pub struct Credentials {
    pub client_id: String,
    pub user: String,
    pub password: String,
}

/// One-shot OAuth challenge: the server answers with a redirect whose
/// fragment carries the bearer token.
pub async fn authorize(client: &ResourceClient, endpoint: &Endpoint, creds: &Credentials) -> Result<String> {
    let descriptor = k8s::authorize(endpoint, &creds.client_id, &creds.user, &creds.password)?;
    let response = client.fetch_body(&descriptor).await?;
    debug!(status = %response.status, "oauth challenge answered");

    let location = response
        .headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Auth(format!("no redirect in response ({})", response.status)))?;
    token_from_location(location)
        .ok_or_else(|| Error::Auth("redirect did not carry an access token".to_string()))
}

pub fn token_from_location(location: &str) -> Option<String> {
    ACCESS_TOKEN
        .captures(location)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
