use acip::cli::init::{self, InitConfig, InitResult};
use acip::cli::output::Output;
use acip::cli::repl::{self, Repl};
use acip::cli::{mime_from_path, Cli, Commands, IntentCommands, KeyCommands};
use acip::db::{KvStore, StoreProvider};
use acip::dispatch::MISSING_KEY_MESSAGE;
use acip::intent::IntentStore;
use acip::utils::credentials::{mask, resolve_credential};
use acip::{AcipConfig, AppError, ConfigManager, DispatchController};
use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Some(Commands::Init { path, force }) = &cli.command {
        let result = init::run(
            InitConfig {
                path: path.clone(),
                force: *force,
            },
            &output,
        );
        return match result {
            InitResult::Success | InitResult::AlreadyExists => Ok(()),
            InitResult::Error(e) => anyhow::bail!("init failed: {}", e),
        };
    }

    let config_exists = cli.config.exists();
    let mut manager = if config_exists {
        ConfigManager::new(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?
    } else {
        ConfigManager::from_config(AcipConfig::default())
    };
    let config = manager.config();

    init_tracing(&config.app.log_level, cli.verbose, cli.log_json);
    if !config_exists {
        tracing::info!(
            "{} not found, using built-in defaults",
            cli.config.display()
        );
    }

    if let Some(Commands::Config { validate }) = &cli.command {
        return show_config(&config, *validate, &manager, output);
    }

    config.validate().context("Invalid configuration")?;

    let store = StoreProvider::from_config(&config.storage)
        .create_store()
        .await
        .context("Failed to open session storage")?;

    match cli.command {
        Some(Commands::Key(cmd)) => key_command(cmd, &config, store.as_ref(), output).await,
        Some(Commands::Intent(cmd)) => intent_command(cmd, &config, store, output).await,
        Some(Commands::Research { text }) => {
            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            let Some(controller) = build_controller(&config, store, output).await? else {
                return Ok(());
            };
            let controller = controller.with_progress(tx);

            let mut session = controller.open_session().await;
            if let Some(text) = text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                session.last_mission_text = Some(text.to_string());
            }

            let cancel = CancellationToken::new();
            let outcome = repl::drive(
                controller.research_now(&mut session, &cancel),
                &cancel,
                &mut rx,
                output,
            )
            .await;
            repl::render(output, &session, &outcome);
            Ok(())
        }
        Some(Commands::DescribeImage { path }) => {
            let Some(mime) = mime_from_path(&path) else {
                anyhow::bail!("Unsupported image type: {}", path.display());
            };
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;

            let Some(controller) = build_controller(&config, store, output).await? else {
                return Ok(());
            };
            let mut session = controller.open_session().await;
            let cancel = CancellationToken::new();
            let outcome = controller
                .describe_image(&mut session, &bytes, &mime, &cancel)
                .await;
            repl::render(output, &session, &outcome);
            Ok(())
        }
        Some(Commands::Chat) | None => {
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            let Some(controller) = build_controller(&config, store, output).await? else {
                return Ok(());
            };

            if config_exists {
                if let Err(e) = manager.start_watching() {
                    tracing::warn!("Config hot reload unavailable: {}", e);
                }
            }

            Repl::new(controller.with_progress(tx), manager, output, rx)
                .run()
                .await
        }
        Some(Commands::Init { .. }) | Some(Commands::Config { .. }) => Ok(()),
    }
}

fn init_tracing(log_level: &str, verbose: bool, json: bool) {
    let default_filter = if verbose { "debug" } else { log_level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("acip={0},{0}", default_filter)));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// `None` after telling the user the primary credential is missing
async fn build_controller(
    config: &AcipConfig,
    store: Arc<dyn KvStore>,
    output: Output,
) -> anyhow::Result<Option<DispatchController>> {
    match DispatchController::from_config(config, store).await {
        Ok(controller) => Ok(Some(controller)),
        Err(AppError::CredentialMissing(env)) => {
            output.warning(MISSING_KEY_MESSAGE);
            output.hint(&format!("acip key set {} <key>  또는  export {}=...", env, env));
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn show_config(
    config: &AcipConfig,
    validate: bool,
    manager: &ConfigManager,
    output: Output,
) -> anyhow::Result<()> {
    output.header("Configuration");
    output.kv("file", &manager.path().display().to_string());
    output.kv("session", &config.app.session_id);
    output.kv("primary", &config.research.primary);
    output.kv(
        "secondary",
        config.research.secondary_name().unwrap_or("(disabled)"),
    );
    output.kv("search", &format!("{:?}", config.search.provider));
    output.kv(
        "readiness",
        &format!(
            "{} of topic/purpose/goal, > {} chars",
            config.dispatch.readiness_threshold, config.dispatch.min_field_chars
        ),
    );
    output.kv("triggers", &config.dispatch.trigger_phrases.join(", "));

    output.subheader("Providers");
    let mut names: Vec<_> = config.providers.keys().collect();
    names.sort();
    for name in names {
        if let Some(provider) = config.get_provider(name) {
            output.list_item(&format!("{} ({}, {})", name, provider.kind(), provider.model()));
        }
    }

    if validate {
        let warnings = config
            .validate_with_warnings()
            .context("Configuration is invalid")?;
        if warnings.is_empty() {
            output.success("Configuration is valid");
        } else {
            for warning in warnings {
                output.warning(&warning.to_string());
            }
        }
    }
    Ok(())
}

fn known_credentials(config: &AcipConfig) -> Vec<String> {
    let mut names: Vec<String> = config
        .providers
        .values()
        .filter_map(|p| p.credential_env().map(str::to_string))
        .collect();
    names.push(config.search.api_key_env.clone());
    names.sort();
    names.dedup();
    names
}

async fn key_command(
    cmd: KeyCommands,
    config: &AcipConfig,
    store: &dyn KvStore,
    output: Output,
) -> anyhow::Result<()> {
    match cmd {
        KeyCommands::Set { name, value } => {
            let value = value.trim();
            if value.is_empty() {
                anyhow::bail!("Refusing to store an empty credential");
            }
            store.set(&name, value).await?;
            output.success(&format!("{} stored ({})", name, mask(value)));
        }
        KeyCommands::Remove { name } => {
            store.remove(&name).await?;
            output.success(&format!("{} removed", name));
        }
        KeyCommands::List => {
            output.header("Credentials");
            for name in known_credentials(config) {
                let status = match resolve_credential(&name, store).await {
                    Some(value) => format!("set ({})", mask(&value)),
                    None => "not set".to_string(),
                };
                output.kv(&name, &status);
            }
        }
    }
    Ok(())
}

async fn intent_command(
    cmd: IntentCommands,
    config: &AcipConfig,
    store: Arc<dyn KvStore>,
    output: Output,
) -> anyhow::Result<()> {
    let intents = IntentStore::new(store, &config.app.session_id);
    match cmd {
        IntentCommands::Show => {
            let model = intents.load().await;
            output.intent(&model);
        }
        IntentCommands::Reset { forget_name } => {
            intents.reset().await?;
            output.success("Intent record cleared");
            if forget_name {
                intents.clear_user_name().await?;
                output.success("User name forgotten");
            }
        }
    }
    Ok(())
}
