use k8s_openapi::api::core::v1::{Namespace, Pod};
use serde::Deserialize;

use crate::error::Result;
use crate::http::{Endpoint, RequestDescriptor};
use crate::models::{ObjectList, PodRow, PodSnapshot, WatchEvent};

pub fn authorize(endpoint: &Endpoint, client_id: &str, user: &str, password: &str) -> Result<RequestDescriptor> {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", client_id)
        .append_pair("response_type", "token")
        .finish();
    RequestDescriptor::get(endpoint, format!("/oauth/authorize?{query}")).basic_auth(user, password)
}

pub fn namespaces(endpoint: &Endpoint, token: &str) -> Result<RequestDescriptor> {
    RequestDescriptor::get(endpoint, "/api/v1/namespaces").bearer(token)
}

fn pods_path(namespace: &str) -> String {
    let segment: String = url::form_urlencoded::byte_serialize(namespace.as_bytes()).collect();
    format!("/api/v1/namespaces/{segment}/pods")
}

pub fn pods(endpoint: &Endpoint, namespace: &str, token: &str) -> Result<RequestDescriptor> {
    RequestDescriptor::get(endpoint, pods_path(namespace)).bearer(token)
}

/// The watch carries the token in the query as well as the header.
pub fn watch_pods(
    endpoint: &Endpoint,
    namespace: &str,
    token: &str,
    resource_version: Option<&str>,
) -> Result<RequestDescriptor> {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("watch", "true");
    if let Some(rv) = resource_version {
        query.append_pair("resourceVersion", rv);
    }
    query.append_pair("access_token", token);
    let path = format!("{}?{}", pods_path(namespace), query.finish());
    RequestDescriptor::get(endpoint, path).bearer(token)
}

pub fn parse_pods(body: &[u8]) -> Result<PodSnapshot> {
    let list: ObjectList<Pod> = serde_json::from_slice(body)?;
    Ok(PodSnapshot {
        resource_version: list.metadata.resource_version,
        rows: list.items.iter().map(PodRow::from_pod).collect(),
    })
}

pub fn parse_namespaces(body: &[u8]) -> Result<Vec<String>> {
    let list: ObjectList<Namespace> = serde_json::from_slice(body)?;
    Ok(list.items.into_iter().filter_map(|n| n.metadata.name).collect())
}

#[derive(Deserialize)]
#[serde(tag = "type", content = "object", rename_all = "UPPERCASE")]
enum RawEvent {
    Added(Pod),
    Modified(Pod),
    Deleted(Pod),
    Bookmark {},
    Error(serde_json::Value),
}

/// Decode one newline-delimited watch event.
pub fn parse_watch_event(line: &[u8]) -> Result<WatchEvent> {
    let raw: RawEvent = serde_json::from_slice(line)?;
    let event = match raw {
        RawEvent::Added(pod) => WatchEvent::Added(PodRow::from_pod(&pod)),
        RawEvent::Modified(pod) => WatchEvent::Modified(PodRow::from_pod(&pod)),
        RawEvent::Deleted(pod) => WatchEvent::Deleted(pod.metadata.name.unwrap_or_default()),
        RawEvent::Bookmark {} => WatchEvent::Bookmark,
        RawEvent::Error(status) => WatchEvent::Error(
            status
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown watch error")
                .to_string(),
        ),
    };
    Ok(event)
}
