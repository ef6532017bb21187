use anyhow::Context;
use genscene_monitor::shared::utils::logger::init_logger;
use genscene_monitor::shared::utils::RetryConfig;
use genscene_monitor::{
    FileSnapshotStore, GenSceneClient, Job, JobKind, JobPoller, JobStateStore, MonitorConfig,
    PollerHooks,
};
use std::sync::Arc;

/// Headless monitor: watches the job ids given on the command line against
/// the Gen Scene Studio status API until interrupted. Mostly useful for
/// exercising the polling core outside the dashboard shell.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let base_url =
        std::env::var("GENSCENE_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
    let api_key = std::env::var("GENSCENE_API_KEY").ok();
    let snapshot_path = std::env::var("GENSCENE_SNAPSHOT_PATH")
        .unwrap_or_else(|_| ".genscene-monitor.json".to_string());

    let config = MonitorConfig::from_env();
    let store = Arc::new(
        JobStateStore::restore(config, Arc::new(FileSnapshotStore::new(&snapshot_path))).await,
    );

    // The store's config wins over the env defaults when a persisted
    // session carried its own settings.
    let effective = store.config().await;
    let client = GenSceneClient::new(&base_url, api_key)
        .context("failed to build status API client")?
        .with_retry_config(RetryConfig::from_monitor(
            effective.max_retries,
            effective.retry_base_delay_ms,
        ));

    let hooks = PollerHooks {
        on_status_change: Some(Arc::new(|id, prev, new| {
            log::info!("job {} moved from {} to {}", id, prev, new);
            Ok(())
        })),
        on_job_complete: Some(Arc::new(|snapshot| {
            log::info!("job {} completed ({} outputs)", snapshot.job_id, snapshot.outputs.len());
            Ok(())
        })),
        on_job_error: Some(Arc::new(|snapshot, reason| {
            log::error!("job {} failed: {}", snapshot.job_id, reason);
            Ok(())
        })),
    };

    let poller = JobPoller::new(Arc::clone(&store), Arc::new(client)).with_hooks(hooks);

    for id in std::env::args().skip(1) {
        store.add_job(Job::new(id.clone(), JobKind::BatchRender)).await;
        poller.add_job_id(id).await;
    }

    poller.start().await;
    log::info!("Monitoring against {} (ctrl-c to stop)", base_url);

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    poller.stop().await;

    let completed = store.completed_jobs().await;
    log::info!("Shutting down with {} completed jobs tracked", completed.len());
    Ok(())
}
