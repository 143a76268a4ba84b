use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable event-stream capability: publish one UTF-8 line tagged with a
/// logical stream name. Delivery semantics beyond a single attempt are the
/// backend's contract, not ours.
#[async_trait]
pub trait EventStreamSink: Send {
    async fn publish(&mut self, stream: &str, line: &str) -> Result<(), SinkError>;
}

/// One record for the operational logging backend.
pub struct OpsLogRecord<'a> {
    pub service: &'a str,
    pub instance: &'a str,
    pub cluster: &'a str,
    pub component: &'a str,
    pub level: log::Level,
    pub message: String,
}

/// Structured operational-log capability.
#[async_trait]
pub trait OpsLogSink: Send {
    async fn submit(&mut self, record: OpsLogRecord<'_>) -> Result<(), SinkError>;
}

/// Line-oriented TCP client for the Scribe-style event stream. Connects
/// lazily and keeps the connection across events; a write failure gets one
/// reconnect-and-retry before the error is reported to the caller.
pub struct ScribeSink {
    host: String,
    port: u16,
    conn: Option<TcpStream>,
}

impl ScribeSink {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            conn: None,
        }
    }

    async fn ensure_connected(&mut self) -> Result<&mut TcpStream, SinkError> {
        match self.conn {
            Some(ref mut stream) => Ok(stream),
            None => {
                let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
                log::debug!("connected to event stream at {}:{}", self.host, self.port);
                Ok(self.conn.insert(stream))
            }
        }
    }

    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), SinkError> {
        let conn = self.ensure_connected().await?;
        conn.write_all(frame).await?;
        conn.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl EventStreamSink for ScribeSink {
    async fn publish(&mut self, stream: &str, line: &str) -> Result<(), SinkError> {
        let frame = format!("{stream}\t{line}\n");

        if let Err(e) = self.write_frame(frame.as_bytes()).await {
            // A stale connection from a previous event should not cost this
            // event its delivery.
            log::debug!("event stream write failed, reconnecting: {e}");
            self.conn = None;
            if let Err(e) = self.write_frame(frame.as_bytes()).await {
                self.conn = None;
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Routes operational records through the `log` facade; `env_logger` renders
/// them with the component as target.
pub struct LogBackendSink;

#[async_trait]
impl OpsLogSink for LogBackendSink {
    async fn submit(&mut self, record: OpsLogRecord<'_>) -> Result<(), SinkError> {
        log::log!(
            target: record.component,
            record.level,
            "service={} instance={} cluster={} {}",
            record.service,
            record.instance,
            record.cluster,
            record.message
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_scribe_sink_frames_stream_and_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            socket.read_to_end(&mut buf).await.unwrap();
            buf
        });

        let mut sink = ScribeSink::new(addr.ip().to_string(), addr.port());
        sink.publish("tmp_paasta_oom_events", r#"{"timestamp":1}"#)
            .await
            .expect("publish must succeed");
        drop(sink);

        let received = server.await.unwrap();
        assert_eq!(received, b"tmp_paasta_oom_events\t{\"timestamp\":1}\n");
    }

    #[tokio::test]
    async fn test_scribe_sink_connection_refused_is_reported() {
        // Bind and drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut sink = ScribeSink::new(addr.ip().to_string(), addr.port());
        let result = sink.publish("tmp_paasta_oom_events", "{}").await;
        assert!(matches!(result, Err(SinkError::Io(_))), "{result:?}");
    }

    #[tokio::test]
    async fn test_log_backend_sink_accepts_records() {
        let mut sink = LogBackendSink;
        let record = OpsLogRecord {
            service: "foo",
            instance: "bar",
            cluster: "norcal-prod",
            component: "oom",
            level: log::Level::Info,
            message: "A process in the container abcdef012345 on host-1 killed by OOM.".to_string(),
        };
        sink.submit(record).await.expect("submit must succeed");
    }
}
