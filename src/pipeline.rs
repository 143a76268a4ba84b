use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::capture::extract_oom_event;
use crate::event::OomEvent;
use crate::resolver::{ContainerInspector, resolve_metadata};
use crate::sinks::{EventStreamSink, OpsLogRecord, OpsLogSink};

/// Component label carried on every operational-log record.
pub const LOG_COMPONENT: &str = "oom";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    Terminated,
}

/// Drives the capture loop: one line at a time, extract → resolve → enrich →
/// fan out, strictly in input order. The cluster identity is bound once at
/// construction and tags every event.
pub struct Pipeline<I, E, O> {
    inspector: I,
    event_stream: E,
    ops_log: O,
    cluster: String,
    stream_name: String,
}

impl<I, E, O> Pipeline<I, E, O>
where
    I: ContainerInspector,
    E: EventStreamSink,
    O: OpsLogSink,
{
    pub fn new(
        inspector: I,
        event_stream: E,
        ops_log: O,
        cluster: String,
        stream_name: String,
    ) -> Self {
        Self {
            inspector,
            event_stream,
            ops_log,
            cluster,
            stream_name,
        }
    }

    /// Consume the line sequence until end-of-stream. The only state
    /// transition is Running → Terminated at EOF (or on a read error, which
    /// ends the sequence the same way); per-line failures never leave
    /// Running.
    pub async fn run<R>(&mut self, reader: R) -> PipelineState
    where
        R: AsyncBufRead + Unpin,
    {
        let mut state = PipelineState::Running;
        let mut lines = reader.lines();

        while state == PipelineState::Running {
            match lines.next_line().await {
                Ok(Some(line)) => self.handle_line(&line).await,
                Ok(None) => state = PipelineState::Terminated,
                Err(e) => {
                    log::warn!("input stream error, shutting down: {e}");
                    state = PipelineState::Terminated;
                }
            }
        }
        state
    }

    async fn handle_line(&mut self, line: &str) {
        let Some(primitive) = extract_oom_event(line) else {
            return;
        };

        let metadata = match resolve_metadata(&self.inspector, &primitive.container_id_prefix).await
        {
            Ok(metadata) => metadata,
            Err(e) => {
                // The container has usually exited by the time the kill shows
                // up in the log; dropping the event is routine.
                log::debug!(
                    "dropping OOM event for container {}: {e}",
                    primitive.container_id_prefix
                );
                return;
            }
        };

        let event = OomEvent::enrich(primitive, metadata, &self.cluster);
        self.fan_out(&event).await;
    }

    /// Deliver to both sinks. Each delivery is guarded on its own; a failure
    /// in one never suppresses the other.
    async fn fan_out(&mut self, event: &OomEvent) {
        match event.to_json_line() {
            Ok(line) => {
                if let Err(e) = self.event_stream.publish(&self.stream_name, &line).await {
                    log::warn!(
                        "event stream delivery failed for container {}: {e}",
                        event.container_id
                    );
                }
            }
            Err(e) => log::warn!("failed to serialize OOM event: {e}"),
        }

        let record = OpsLogRecord {
            service: &event.service,
            instance: &event.instance,
            cluster: &event.cluster,
            component: LOG_COMPONENT,
            level: log::Level::Info,
            message: format!(
                "A process in the container {} on {} killed by OOM.",
                event.container_id, event.hostname
            ),
        };
        if let Err(e) = self.ops_log.submit(record).await {
            log::warn!(
                "operational log delivery failed for container {}: {e}",
                event.container_id
            );
        }
    }
}
