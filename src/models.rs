use chrono::{DateTime, TimeDelta, Utc};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ListMeta;
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;

/// `{"metadata": {...}, "items": [...]}` envelope of a list response.
#[derive(Debug, Deserialize)]
pub struct ObjectList<T> {
    #[serde(default)]
    pub metadata: ListMeta,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// One line of the pod table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRow {
    pub name: String,
    pub phase: String,
    pub started_at: Option<DateTime<Utc>>,
}

impl PodRow {
    pub fn from_pod(pod: &Pod) -> Self {
        let name = pod.metadata.name.clone().unwrap_or_default();
        let phase = pod
            .status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or("Unknown".to_string());
        Self {
            name,
            phase,
            started_at: start_time(pod),
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> String {
        match self.started_at {
            Some(start) => format_age(now - start),
            None => "-".to_string(),
        }
    }

    /// NAME, STATUS, AGE
    pub fn cells(&self, now: DateTime<Utc>) -> [String; 3] {
        [self.name.clone(), self.phase.clone(), self.age(now)]
    }
}

// `Time` serializes as RFC 3339 whatever clock crate backs it.
fn start_time(pod: &Pod) -> Option<DateTime<Utc>> {
    let time = pod.status.as_ref()?.start_time.as_ref()?;
    let raw = serde_json::to_value(time).ok()?;
    DateTime::parse_from_rfc3339(raw.as_str()?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Compact elapsed time: `3d4h`, `2h5m`, `4m10s`, `12s`.
pub fn format_age(elapsed: TimeDelta) -> String {
    let secs = elapsed.num_seconds().max(0);
    let (days, hours, mins, secs) = (secs / 86_400, secs / 3_600 % 24, secs / 60 % 60, secs % 60);
    if days > 0 {
        format!("{days}d{hours}h")
    } else if hours > 0 {
        format!("{hours}h{mins}m")
    } else if mins > 0 {
        format!("{mins}m{secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Result of one pod listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSnapshot {
    pub resource_version: Option<String>,
    pub rows: Vec<PodRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(PodRow),
    Modified(PodRow),
    Deleted(String),
    Bookmark,
    Error(String),
}

/// Everything the dashboard is told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Pods { namespace: String, rows: Vec<PodRow> },
    Watch { namespace: String, event: WatchEvent },
    Log(String),
    Namespaces(Vec<String>),
}

pub type UiSink = UnboundedSender<UiEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ages_are_compact() {
        assert_eq!(format_age(TimeDelta::seconds(12)), "12s");
        assert_eq!(format_age(TimeDelta::seconds(4 * 60 + 10)), "4m10s");
        assert_eq!(format_age(TimeDelta::seconds(2 * 3600 + 5 * 60 + 59)), "2h5m");
        assert_eq!(format_age(TimeDelta::seconds(3 * 86_400 + 4 * 3600)), "3d4h");
        assert_eq!(format_age(TimeDelta::seconds(-5)), "0s");
    }

    #[test]
    fn row_from_pod_without_status() {
        let pod: Pod = serde_json::from_value(serde_json::json!({"metadata": {"name": "pending"}})).unwrap();
        let row = PodRow::from_pod(&pod);
        assert_eq!(row.phase, "Unknown");
        assert_eq!(row.age(Utc::now()), "-");
    }

    #[test]
    fn row_cells() {
        let pod: Pod = serde_json::from_value(serde_json::json!({
            "metadata": {"name": "a"},
            "status": {"phase": "Running", "startTime": "2024-01-01T00:00:00Z"}
        }))
        .unwrap();
        let row = PodRow::from_pod(&pod);
        let now = DateTime::parse_from_rfc3339("2024-01-02T03:00:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(row.cells(now), ["a".to_string(), "Running".to_string(), "1d3h".to_string()]);
    }
}
