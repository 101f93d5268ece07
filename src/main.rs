use std::{process, sync::Arc};

use foglio::{
    application::{
        blog::BlogService, error::AppError, sitemap::SitemapService,
        syndication::SyndicationService,
    },
    config,
    infra::{
        catalog::PostCatalog,
        error::InfraError,
        http::{self, HttpState},
        response_cache::InMemoryResponseCache,
        store::FsObjectStore,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(config::ServeArgs::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Rebuild(_) => run_rebuild(settings).await,
    }
}

fn build_catalog(settings: &config::Settings) -> Arc<PostCatalog> {
    let posts = Arc::new(FsObjectStore::new(settings.storage.posts_dir()));
    let files = Arc::new(FsObjectStore::new(settings.storage.files_dir()));
    let response_cache = Arc::new(InMemoryResponseCache::new());
    Arc::new(PostCatalog::new(posts, files).with_response_cache(response_cache))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let catalog = build_catalog(&settings);
    // Index readiness gates traffic: initialize fully before binding.
    catalog.initialize().await?;
    info!(posts = catalog.summary_count(), "catalog initialized");

    let blog = BlogService::new(catalog.clone(), &settings.blog);
    let syndication = SyndicationService::new(catalog.clone(), settings.blog.clone());
    let sitemap = SitemapService::new(catalog.clone(), settings.blog.clone());

    if settings.admin.token.is_none() {
        info!("no admin token configured; admin routes are disabled");
    }

    let state = HttpState {
        blog,
        syndication,
        sitemap,
        admin_token: settings.admin.token.clone(),
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.bind_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.bind_addr, "listening");

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_rebuild(settings: config::Settings) -> Result<(), AppError> {
    let catalog = build_catalog(&settings);
    catalog.initialize().await?;
    catalog.rebuild_summary_index().await?;
    info!(posts = catalog.summary_count(), "summary index rebuilt");
    Ok(())
}
