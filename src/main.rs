use bollard::Docker;

mod capture;
mod cli;
mod config;
mod event;
mod pipeline;
mod resolver;
mod sinks;

use pipeline::{Pipeline, PipelineState};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Docker connection error: {0}")]
    Docker(#[from] bollard::errors::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    env_logger::init();

    let config = config::SystemConfig::try_init()?;
    let docker = Docker::connect_with_local_defaults()?;

    log::info!(
        "oom-relay started for cluster {}, publishing to stream {}",
        config.cluster,
        config.scribe.stream
    );

    let inspector = resolver::DockerInspector::new(docker);
    let event_stream = sinks::ScribeSink::new(config.scribe.host, config.scribe.port);
    let ops_log = sinks::LogBackendSink;

    let mut pipeline = Pipeline::new(
        inspector,
        event_stream,
        ops_log,
        config.cluster,
        config.scribe.stream,
    );

    // syslog-ng owns the other end of stdin; EOF means it is gone and
    // process supervision decides about a restart.
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let state = pipeline.run(stdin).await;
    debug_assert_eq!(state, PipelineState::Terminated);

    log::info!("input stream closed, shutting down");
    Ok(())
}
