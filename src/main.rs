use std::{io::Write, process, time::Duration};

use folio::{
    application::{
        bench::{self, BenchConfig},
        error::AppError,
        loader::PostLoader,
    },
    config,
    domain::types::PostStatus,
    infra::{
        error::InfraError,
        loader::{ArchiveLoader, SeedLoader},
        telemetry,
    },
    store::{AdminFilter, PostStore, StoreConfig},
};
use serde::Serialize;
use time::OffsetDateTime;
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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Bench(Box::<config::BenchArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Bench(args) => run_bench(settings, *args).await,
        config::Command::Inspect(args) => run_inspect(settings, *args).await,
    }
}

async fn load_store(settings: &config::Settings) -> Result<PostStore, AppError> {
    let records = match settings.loader.archive.as_ref() {
        Some(path) => ArchiveLoader::new(path).load_all().await?,
        None => {
            SeedLoader::new(settings.loader.seed_posts, OffsetDateTime::now_utc())
                .load_all()
                .await?
        }
    };

    let (store, _applier) = PostStore::start(StoreConfig::from(&settings.store), records)?;
    Ok(store)
}

async fn run_bench(settings: config::Settings, args: config::BenchArgs) -> Result<(), AppError> {
    let store = load_store(&settings).await?;

    let report = bench::run(
        &store,
        BenchConfig {
            readers: args.readers,
            writers: args.writers,
            duration: Duration::from_secs(args.duration_seconds),
        },
    )
    .await?;

    print_json(&report)
}

async fn run_inspect(
    settings: config::Settings,
    args: config::InspectArgs,
) -> Result<(), AppError> {
    let store = load_store(&settings).await?;
    let queries = store.queries();
    let snapshot = store.snapshot();
    info!(
        posts = snapshot.len(),
        epoch = snapshot.epoch(),
        "Store ready for inspection"
    );

    if args.archives {
        return print_json(&queries.archives());
    }

    let status = args
        .status
        .as_deref()
        .map(str::parse::<PostStatus>)
        .transpose()?;

    let page = match (status, args.keyword) {
        (None, Some(keyword)) => queries.search(&keyword, args.page, args.page_size),
        (Some(status), keyword) => queries.list_admin(
            &AdminFilter {
                status: Some(status),
                keyword,
            },
            args.page,
            args.page_size,
        ),
        (None, None) => queries.list_recent(args.page, args.page_size),
    };

    print_json(&page)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).map_err(InfraError::from)?;
    writeln!(stdout).map_err(InfraError::from)?;
    Ok(())
}
