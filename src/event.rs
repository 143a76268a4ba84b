use serde::{Deserialize, Serialize};

/// An OOM kill as it appears in the syslog line, before any metadata lookup.
///
/// `container_id_prefix` is exactly the first 12 word characters after
/// `/docker/`; the Docker API accepts shortened identifiers, so the full id
/// is never needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveEvent {
    pub timestamp: i64,
    pub hostname: String,
    pub container_id_prefix: String,
}

/// Service ownership read from a container's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerMetadata {
    pub service: String,
    pub instance: String,
}

/// A fully enriched OOM event, ready for delivery to the sinks.
///
/// Field order is the wire key order of the emitted JSON object:
/// `timestamp, hostname, container_id, cluster, service, instance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OomEvent {
    pub timestamp: i64,
    pub hostname: String,
    pub container_id: String,
    pub cluster: String,
    pub service: String,
    pub instance: String,
}

impl OomEvent {
    /// Combine a captured event with its resolved metadata and the
    /// process-wide cluster identity. Total; no failure modes.
    pub fn enrich(primitive: PrimitiveEvent, metadata: ContainerMetadata, cluster: &str) -> Self {
        Self {
            timestamp: primitive.timestamp,
            hostname: primitive.hostname,
            container_id: primitive.container_id_prefix,
            cluster: cluster.to_string(),
            service: metadata.service,
            instance: metadata.instance,
        }
    }

    /// Single-line JSON form published to the event stream.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
