use std::{process, sync::Arc};

use kinship::{
    application::{
        context::CommunityContext,
        directory::{BlogsDirectoryService, DirectoryRequest},
        error::AppError,
        hooks::Hooks,
        options::OptionService,
        repos::{NetworkOptionStore, SiteOptionStore},
    },
    cache::RequestCache,
    config::{self, Command},
    domain::{options::OptionValue, sites::UserId},
    infra::{
        db::PostgresRepositories, error::InfraError, memory::MemoryOptionStore,
        sites::StaticSiteDirectory, telemetry,
    },
    presentation::{
        directory::{DefaultTemplateParts, DirectoryHooks},
        l10n::IdentityLocalizer,
        nonce::NonceIssuer,
    },
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
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
    if dispatcher::has_been_set() {
        error!(source = report.source, causes = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(source = report.source, causes = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let (sites, network) = init_stores(&settings).await?;
    let context = CommunityContext::shared(settings.deployment.deployment());
    let options = OptionService::new(
        sites,
        network,
        Arc::new(RequestCache::new()),
        Hooks::shared(),
        Arc::clone(&context),
    );

    for raw in &cli_args.overrides.option_overrides {
        let (name, value) = parse_override(raw)?;
        context.set_override(name, value);
    }
    options.setup_option_filters();

    match cli_args.command {
        Command::Activate => {
            options.add_options().await;
            Ok(())
        }
        Command::Uninstall => {
            options.delete_options().await;
            Ok(())
        }
        Command::Get(args) => {
            let default = match args.default.as_deref() {
                Some(raw) => parse_value(raw)?,
                None => OptionValue::empty_text(),
            };
            print_json(&options.get_option_or(args.name, default).await)
        }
        Command::Set(args) => {
            let value = parse_value(&args.value)?;
            let changed = options.update_option(args.name, value).await;
            print_json(&changed)
        }
        Command::Delete(args) => {
            let removed = options.delete_option(args.name).await;
            print_json(&removed)
        }
        Command::RootOptions => print_json(&options.root_options().await),
        Command::Flags => print_json(&options.feature_flags().await),
        Command::RenderDirectory(args) => {
            let source = StaticSiteDirectory::load(&args.sites)?;
            let directory = BlogsDirectoryService::new(
                Arc::new(source),
                Arc::new(DirectoryHooks::new()),
                Arc::new(DefaultTemplateParts),
                Arc::new(IdentityLocalizer),
                NonceIssuer::new(settings.nonce.secret.clone()),
            );
            let request = DirectoryRequest {
                viewer: args.user_id.map(UserId),
                referer: args.referer,
                search_terms: args.search,
            };
            println!("{}", directory.render(&request).await?);
            Ok(())
        }
    }
}

async fn init_stores(
    settings: &config::Settings,
) -> Result<(Arc<dyn SiteOptionStore>, Arc<dyn NetworkOptionStore>), AppError> {
    let Some(url) = settings.database.url.as_deref() else {
        warn!(
            target = "kinship::main",
            "no database configured; options are kept in memory for this command only"
        );
        let store = Arc::new(MemoryOptionStore::new());
        let sites: Arc<dyn SiteOptionStore> = store.clone();
        let network: Arc<dyn NetworkOptionStore> = store;
        return Ok((sites, network));
    };

    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::from)?;
    PostgresRepositories::run_migrations(&pool).await?;
    info!(target = "kinship::main", "database ready");

    let repositories = Arc::new(PostgresRepositories::new(pool));
    let sites: Arc<dyn SiteOptionStore> = repositories.clone();
    let network: Arc<dyn NetworkOptionStore> = repositories;
    Ok((sites, network))
}

fn parse_value(raw: &str) -> Result<OptionValue, AppError> {
    serde_json::from_str(raw).map_err(|err| {
        AppError::validation(format!(
            "`{raw}` is not a boolean, JSON string or array of strings: {err}"
        ))
    })
}

fn parse_override(raw: &str) -> Result<(String, OptionValue), AppError> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| AppError::validation(format!("override `{raw}` must be NAME=JSON")))?;
    Ok((name.trim().to_string(), parse_value(value)?))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
