pub mod cache;
pub mod cli;
pub mod core;
pub mod providers;
pub mod scheduler;
pub mod search;

use crate::cache::FundCache;
use crate::core::config::AppConfig;
use crate::providers::mfapi::MfapiProvider;
use crate::scheduler::{Job, Scheduler};
use anyhow::Result;
use futures::FutureExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Running cache service: the lookup surface a routing layer consumes.
///
/// Construction performs the initial directory build before any lookup
/// is accepted, then spawns the two background jobs: a periodic
/// directory rebuild and a periodic series invalidation.
pub struct App {
    cache: Arc<FundCache>,
    jobs: Vec<JoinHandle<()>>,
}

impl App {
    pub async fn start(config: AppConfig) -> Result<Self> {
        info!("Fund cache starting...");

        let source = Arc::new(MfapiProvider::new(&config.provider)?);
        let cache = Arc::new(FundCache::new(source, config.corrections.clone()));

        // A failed initial build is not fatal; lookups fail IndexUnready
        // until the scheduled rebuild gets through
        match cache.refresh_directory().await {
            Ok(count) => info!(funds = count, "initial directory build complete"),
            Err(err) => warn!(error = %err, "initial directory build failed"),
        }

        let mut scheduler = Scheduler::new();

        let rebuild_cache = Arc::clone(&cache);
        scheduler.register(Job::new(
            "directory-rebuild",
            config.refresh.directory_interval(),
            move || {
                let cache = Arc::clone(&rebuild_cache);
                async move {
                    if let Err(err) = cache.refresh_directory().await {
                        warn!(error = %err, "scheduled directory rebuild failed");
                    }
                }
                .boxed()
            },
        ));

        let invalidate_cache = Arc::clone(&cache);
        scheduler.register(Job::new(
            "series-invalidation",
            config.refresh.series_interval(),
            move || {
                let cache = Arc::clone(&invalidate_cache);
                async move {
                    cache.invalidate_series();
                }
                .boxed()
            },
        ));

        let jobs = scheduler.spawn();

        Ok(Self { cache, jobs })
    }

    pub fn cache(&self) -> &Arc<FundCache> {
        &self.cache
    }

    /// Stops the background jobs. Lookups against the cache keep
    /// working; nothing refreshes anymore.
    pub fn shutdown(&self) {
        for job in &self.jobs {
            job.abort();
        }
    }
}

pub enum AppCommand {
    Search { query: String },
    Info { scheme_code: u32 },
    Nav { scheme_code: u32 },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = App::start(config).await?;

    let result = match command {
        AppCommand::Search { query } => cli::print_search(app.cache(), &query),
        AppCommand::Info { scheme_code } => cli::print_info(app.cache(), scheme_code),
        AppCommand::Nav { scheme_code } => cli::print_nav(app.cache(), scheme_code).await,
    };

    app.shutdown();
    result
}
