use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use clap::Parser;
use tracing::info;

use murmur_core::config::MurmurConfig;
use murmur_core::MurmurError;
use murmur_extensions::{Extension, ExtensionRegistry, FrameworkExtension, RegistryBuilder};
use murmur_ipc::CommandBus;
use murmur_pipeline::{CompletionGateway, Orchestrator};
use murmur_plugins::{
    DateTimeContext, DirectoryBootstrap, EchoProbeTrigger, KnownUsersContext, PersonaContext,
    RelayIpc, StatusIpc, TaskMarkerPreprocessor, TextMessageHandler, ThreadResetCommand,
};
use murmur_threads::{KeyValStore, KnownUsers, SqliteKeyValStore, ThreadStore};

mod app;
mod completion;
mod http;
mod textserv;

#[derive(Parser, Debug)]
#[command(name = "murmur-gateway", about = "Murmur conversational-assistant gateway")]
struct Args {
    /// Path to murmur.toml (default: ~/.murmur/murmur.toml, or MURMUR_CONFIG).
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur_gateway=info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();

    // Config: explicit flag > MURMUR_CONFIG env > ~/.murmur/murmur.toml.
    // Missing or invalid wiring is fatal — there is no degraded mode.
    let config_path = args.config.or_else(|| std::env::var("MURMUR_CONFIG").ok());
    let config = MurmurConfig::load(config_path.as_deref())?;

    // Single SQLite file behind the key-value boundary.
    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");
    let conn = rusqlite::Connection::open(&db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    murmur_threads::keyval::init_db(&conn)?;

    let kv: Arc<dyn KeyValStore> = Arc::new(SqliteKeyValStore::new(conn));
    let threads = Arc::new(ThreadStore::new(Arc::clone(&kv)));
    let users = Arc::new(KnownUsers::new(Arc::clone(&kv)));

    let gateway: Arc<dyn CompletionGateway> = Arc::new(completion::HttpCompletionGateway::new(
        config.assistant.completion.clone(),
    ));
    info!(gateway = gateway.name(), model = %config.assistant.completion.model, "completion gateway ready");

    // Build the extension registry from the enumerated config list, then
    // freeze it. The relay extension gets the orchestrator injected into its
    // slot right after the orchestrator exists, still during startup.
    let pipeline_slot: murmur_plugins::relay_ipc::PipelineSlot = Arc::new(OnceLock::new());
    let registry = Arc::new(build_registry(
        &config,
        &threads,
        &users,
        &kv,
        &pipeline_slot,
    )?);

    // One-off framework extension setup, registration order, fail-fast.
    for fw in registry.framework() {
        fw.setup().await?;
        info!(extension = fw.name(), "framework extension set up");
    }

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&registry),
        Arc::clone(&threads),
        gateway,
        &config.pipeline,
    ));
    let _ = pipeline_slot.set(orchestrator);

    // Command bus: one consumer task over the shared inbound queue.
    let (ipc_handle, bus) = CommandBus::new(Arc::clone(&registry));
    tokio::spawn(bus.run());

    let state = Arc::new(app::AppState::new(
        config,
        Arc::clone(&registry),
        ipc_handle,
    ));

    if state.config.text_server.enabled {
        let text_state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = textserv::run(text_state).await {
                tracing::error!(error = %e, "text server exited");
            }
        });
    }

    let router = app::build_router(Arc::clone(&state));
    let addr: SocketAddr = format!(
        "{}:{}",
        state.config.gateway.bind, state.config.gateway.port
    )
    .parse()?;
    info!("murmur gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

/// Construct every enabled extension explicitly and register it.
///
/// This is the whole discovery mechanism: an enumerated list in config,
/// matched name-by-name to a constructor. Unknown names are fatal.
fn build_registry(
    config: &MurmurConfig,
    threads: &Arc<ThreadStore>,
    users: &Arc<KnownUsers>,
    kv: &Arc<dyn KeyValStore>,
    pipeline_slot: &murmur_plugins::relay_ipc::PipelineSlot,
) -> murmur_core::Result<ExtensionRegistry> {
    let enabled = &config.extensions.enabled;

    // First pass: triggers and augmenters, whose declared trigger words and
    // cache keys feed the bookkeeping extensions constructed below.
    let mut built_triggers = Vec::new();
    for name in enabled {
        if name == "echo_probe" {
            built_triggers.push(Arc::new(EchoProbeTrigger::new(Arc::clone(kv))));
        }
    }
    let trigger_words: Vec<String> = built_triggers
        .iter()
        .flat_map(|t| {
            use murmur_extensions::ConversationalTrigger;
            t.triggers().to_vec()
        })
        .collect();
    // No built-in augmenters ship today; retrieval adapters arrive through
    // deployment-specific builds and contribute their cache keys here.
    let cache_keys: Vec<String> = Vec::new();

    let mut trigger_iter = built_triggers.into_iter();
    let mut builder = RegistryBuilder::new();
    for name in enabled {
        match name.as_str() {
            "thread_reset" => {
                builder.register_command_processor(Arc::new(ThreadResetCommand::new(
                    Arc::clone(threads),
                    cache_keys.clone(),
                )));
            }
            "datetime_context" => {
                builder.register_context_provider(Arc::new(DateTimeContext));
            }
            "persona_context" => {
                builder.register_context_provider(Arc::new(PersonaContext::new(
                    config.assistant.persona.clone(),
                )));
            }
            "known_users_context" => {
                builder
                    .register_context_provider(Arc::new(KnownUsersContext::new(Arc::clone(users))));
            }
            "task_markers" => {
                builder.register_preprocessor(Arc::new(TaskMarkerPreprocessor::new(
                    Arc::clone(threads),
                    trigger_words.clone(),
                )));
            }
            "echo_probe" => {
                let trigger = trigger_iter
                    .next()
                    .expect("trigger built in the first pass");
                builder.register_trigger(trigger);
            }
            "status_ipc" => {
                builder.register_ipc_command(Arc::new(StatusIpc::new()));
            }
            "relay_ipc" => {
                builder.register_ipc_command(Arc::new(RelayIpc::new(Arc::clone(pipeline_slot))));
            }
            "text_handler" => {
                builder.register_message_handler(Arc::new(TextMessageHandler::new(Arc::clone(
                    pipeline_slot,
                ))));
            }
            "directory_bootstrap" => {
                builder.register_framework(Arc::new(DirectoryBootstrap::new(Arc::clone(users))));
            }
            unknown => {
                return Err(MurmurError::Config(format!(
                    "unknown extension in extensions.enabled: {unknown}"
                )));
            }
        }
    }

    Ok(builder.build())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
