//! Repowatch
//!
//! Runs one watch cycle and exits. Schedule it externally (cron, CI) and
//! never run two cycles against the same state at once.
//!
//! Environment variables are listed on [`repowatch::WatchConfig::from_env`].
//! Log level is controlled by RUST_LOG (default: repowatch=info).
//!
//! Exit status is non-zero only for corrupt state, unreadable configuration,
//! or a failed save/publish. Probe and notification problems are logged.

use repowatch::alerts::Notifier;
use repowatch::config::{PublishTarget, WatchConfig};
use repowatch::probe::GitHubProber;
use repowatch::storage::publish::GitTarget;
use repowatch::storage::{DurableStatePublisher, FilePublisher, GitPublisher, StateStore};
use repowatch::{load_tracked, Coordinator, CycleReport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repowatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = WatchConfig::from_env()?;
    let entities = load_tracked(&config.config_path)?;

    tracing::debug!(
        config = %config.config_path.display(),
        state = %config.state_path.display(),
        tracked = entities.len(),
        "Starting watch cycle"
    );

    let prober = GitHubProber::new(
        config.api_base.clone(),
        config.github_token.clone(),
        config.http_timeout,
    )?;
    let notifier = Notifier::new(
        config.notify_target.clone(),
        config.web_base.clone(),
        config.http_timeout,
    )?;
    let store = StateStore::new(&config.state_path);

    let report = match &config.publish.target {
        PublishTarget::Git {
            remote,
            branch,
            author_name,
            author_email,
        } => {
            let repo_dir = config
                .state_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."))
                .to_path_buf();
            let file = config
                .state_path
                .file_name()
                .map(std::path::PathBuf::from)
                .ok_or("state path has no file name")?;

            let publisher = GitPublisher::new(GitTarget {
                repo_dir,
                file,
                remote: remote.clone(),
                branch: branch.clone(),
                author_name: author_name.clone(),
                author_email: author_email.clone(),
                timeout: config.publish.timeout,
            });
            run(prober, notifier, store, publisher, &config, &entities).await?
        }
        PublishTarget::File { path } => {
            let publisher = FilePublisher::new(path);
            run(prober, notifier, store, publisher, &config, &entities).await?
        }
    };

    if !report.alerted.is_empty() || report.published {
        tracing::info!(
            tracked = report.tracked,
            alerted = report.alerted.len(),
            notify_failures = report.notify_failures,
            published = report.published,
            "Watch cycle complete"
        );
    } else {
        tracing::debug!(tracked = report.tracked, "Watch cycle complete, nothing changed");
    }

    Ok(())
}

async fn run<D: DurableStatePublisher>(
    prober: GitHubProber,
    notifier: Notifier,
    store: StateStore,
    publisher: D,
    config: &WatchConfig,
    entities: &[String],
) -> Result<CycleReport, repowatch::CycleError> {
    Coordinator::new(prober, notifier, store, publisher)
        .with_publish_attempts(config.publish.attempts)
        .run_cycle(entities)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Watch cycle failed");
            e
        })
}
