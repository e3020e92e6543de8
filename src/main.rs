use std::{path::Path, process, sync::Arc};

use serde::Serialize;
use tierlist::{
    application::{
        error::AppError,
        janitor::{AssetJanitor, JanitorConfig},
        tier_lists::{NewTierList, TierListChanges, TierListError, TierListService},
    },
    cache::{CacheConfig, TaggedCache},
    config::{self, Command, CreateArgs, ListArgs, Settings, ShowArgs, UpdateArgs},
    domain::{assets::AssetUrlResolver, payload::TierListData},
    infra::{
        cloudinary::CloudinaryAssetStore, db::PostgresRepositories, error::InfraError, telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    let chain = report.messages.join(": ");

    if dispatcher::has_been_set() {
        error!(source = report.source, error = %chain, "command failed");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(source = report.source, error = %chain, "command failed");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| InfraError::configuration(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Command::Migrate => run_migrate(&settings).await,
        Command::Show(args) => run_show(&settings, args).await,
        Command::List(args) => run_list(&settings, args).await,
        Command::Recent => run_recent(&settings).await,
        Command::Create(args) => run_create(&settings, args).await,
        Command::Update(args) => run_update(&settings, args).await,
    }
}

async fn run_migrate(settings: &Settings) -> Result<(), AppError> {
    let repositories = init_repositories(settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| InfraError::database(format!("failed to run migrations: {err}")))?;
    info!("migrations applied");
    Ok(())
}

async fn run_show(settings: &Settings, args: ShowArgs) -> Result<(), AppError> {
    let service = build_service(settings).await?;
    let tier_list = service.get_or_fail(args.id).await?;
    print_json(&tier_list)
}

async fn run_list(settings: &Settings, args: ListArgs) -> Result<(), AppError> {
    let service = build_service(settings).await?;
    let page = service
        .list_for_owner(args.owner, args.cursor.as_deref())
        .await?;
    print_json(&page)
}

async fn run_recent(settings: &Settings) -> Result<(), AppError> {
    let service = build_service(settings).await?;
    let recent = service.recent().await?;
    print_json(&recent)
}

async fn run_create(settings: &Settings, args: CreateArgs) -> Result<(), AppError> {
    let data = read_payload(&args.data).await?;
    let service = build_service(settings).await?;

    let created = service
        .store(
            args.owner,
            NewTierList {
                title: args.title,
                description: args.description,
                thumbnail: args.thumbnail,
                data,
                is_public: args.public,
            },
        )
        .await?;

    print_json(&created)
}

async fn run_update(settings: &Settings, args: UpdateArgs) -> Result<(), AppError> {
    if args.data.is_none()
        && args.title.is_none()
        && args.description_change().is_none()
        && args.thumbnail.is_none()
        && args.public.is_none()
    {
        return Err(AppError::validation("no changes supplied"));
    }

    let data = match args.data.as_deref() {
        Some(path) => Some(read_payload(path).await?),
        None => None,
    };

    let description = args.description_change();
    let service = build_service(settings).await?;
    let current = service.get_owned(args.id, args.owner).await?;

    let updated = service
        .update(
            &current,
            TierListChanges {
                title: args.title,
                description,
                thumbnail: args.thumbnail,
                data,
                is_public: args.public,
            },
        )
        .await?;

    service.janitor().drain().await;

    print_json(&updated)
}

async fn init_repositories(settings: &Settings) -> Result<PostgresRepositories, AppError> {
    let url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("database.url is required"))?;

    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(format!("failed to connect to database: {err}")))?;

    Ok(PostgresRepositories::new(pool))
}

async fn build_service(settings: &Settings) -> Result<TierListService, AppError> {
    let repositories = init_repositories(settings).await?;
    let cache = TaggedCache::in_memory(CacheConfig::from(&settings.cache));

    let assets = &settings.assets;
    let janitor = match assets.credentials.as_ref() {
        Some(credentials) => {
            let store = CloudinaryAssetStore::new(assets, credentials)?;
            AssetJanitor::new(
                Arc::new(store),
                JanitorConfig {
                    concurrency: assets.delete_concurrency.get() as usize,
                    timeout: assets.delete_timeout,
                },
            )
        }
        None => {
            info!("asset store credentials missing; orphaned images will only be logged");
            AssetJanitor::disabled()
        }
    };

    let resolver = AssetUrlResolver::new(
        assets.delivery_host.clone(),
        assets
            .credentials
            .as_ref()
            .map(|credentials| credentials.cloud_name.clone()),
    );

    Ok(TierListService::new(
        Arc::new(repositories),
        cache,
        janitor,
        resolver,
    ))
}

async fn read_payload(path: &Path) -> Result<TierListData, AppError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(InfraError::from)?;
    TierListData::from_json_str(&raw)
        .map_err(|err| AppError::from(TierListError::from(err)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
