mod bot;
mod config;
mod server;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{
    ChatKind, InlineQueryResult, InlineQueryResultArticle, InputMessageContent, InputMessageContentText,
};
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use bot::commands::{self, Command};
use bot::{AppState, Database, Quoted, Request, TelegramClient, TextGenerator, handlers, inline};
use config::{Config, DEFAULT_LOG_DIR, TextGenProvider};

struct BotState {
    app: AppState,
    telegram: Arc<TelegramClient>,
    /// Our own @username, used to ignore commands addressed to other bots.
    bot_username: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    let log_dir = config
        .as_ref()
        .map(|c| c.log_dir.clone())
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR));
    let guard = init_logging(&log_dir);

    let config = match config {
        Ok(config) => config,
        Err(e) => exit_with_error(format!("Cannot start: {e}"), guard),
    };

    info!("🚀 Starting quipbot...");
    match config.admin_id {
        Some(admin) => info!("Admin ID: {}", admin),
        None => warn!("ADMIN_ID not set, every admin command will be rejected"),
    }

    let textgen = TextGenerator::new(config.textgen.clone(), config.textgen_model.clone());
    match &config.textgen {
        TextGenProvider::Gemini { .. } => info!("Text generation: Gemini ({})", textgen.model()),
        TextGenProvider::OpenRouter { .. } => info!("Text generation: OpenRouter ({})", textgen.model()),
        TextGenProvider::Disabled => warn!("No text-generation API key, /ask and /translate will fail"),
    }

    let db = match Database::open(&config.database_url) {
        Ok(db) => db,
        Err(e) => exit_with_error(format!("Failed to open database {}: {e}", config.database_url), guard),
    };

    let bot = Bot::new(&config.bot_token);

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            info!("Bot user ID: {}, username: @{}", me.id, me.username());
            Some(me.username().to_string())
        }
        Err(e) => {
            warn!("Failed to get bot info: {e}");
            None
        }
    };

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register command menu: {e}");
    }

    match server::spawn(config.port).await {
        Ok(addr) => info!("Liveness endpoint on http://{addr}/"),
        Err(e) => warn!("Liveness server disabled, cannot bind port {}: {e}", config.port),
    }

    let state = Arc::new(BotState {
        app: AppState::new(config.admin_id, db, textgen),
        telegram: Arc::new(TelegramClient::new(bot.clone())),
        bot_username,
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_inline_query().endpoint(handle_inline_query));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.kind);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build();

    let shutdown = dispatcher.shutdown_token();
    tokio::spawn(async move {
        wait_for_terminate().await;
        info!("🛑 Termination signal received, stopping...");
        match shutdown.shutdown() {
            Ok(stopping) => stopping.await,
            Err(e) => warn!("Dispatcher was not running: {e:?}"),
        }
    });

    dispatcher.dispatch().await;
    info!("👋 quipbot stopped");
}

fn init_logging(log_dir: &Path) -> Option<WorkerGuard> {
    let filter = || EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let log_file = std::fs::create_dir_all(log_dir).and_then(|_| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("quipbot.log"))
    });

    let (file_layer, guard) = match log_file {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("Failed to open log file in {}: {e}", log_dir.display());
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(filter()),
        )
        .with(file_layer)
        .init();

    guard
}

/// Log, flush the file writer and exit with status 1.
fn exit_with_error(message: String, guard: Option<WorkerGuard>) -> ! {
    error!("{message}");
    drop(guard);
    std::process::exit(1);
}

#[cfg(unix)]
async fn wait_for_terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_terminate() {
    // Ctrl-C is covered by the dispatcher itself.
    std::future::pending::<()>().await;
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let user = match msg.from {
        Some(ref u) => u,
        None => return Ok(()),
    };

    let text = match msg.text() {
        Some(t) => t,
        None => return Ok(()),
    };

    let sender_id = user.id.0 as i64;
    state.app.track(sender_id);

    let Some((command, args)) = commands::parse(text, state.bot_username.as_deref()) else {
        return Ok(());
    };

    let username = user.username.as_deref().unwrap_or(&user.first_name);
    info!("/{} from {} ({}) in chat {}", command.name(), username, sender_id, msg.chat.id);

    let reply_to = msg.reply_to_message().map(|reply| Quoted {
        message_id: reply.id.0,
        user_id: reply.from.as_ref().map(|u| u.id.0 as i64),
        text: reply.text().or_else(|| reply.caption()).unwrap_or("").to_string(),
    });

    let request = Request {
        sender_id,
        first_name: user.first_name.clone(),
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        is_group: matches!(msg.chat.kind, ChatKind::Public(_)),
        args: args.to_string(),
        reply_to,
    };

    let reply = handlers::handle(&state.app, &state.telegram, command, &request).await;
    // Failures are logged by send_reply
    state.telegram.send_reply(msg.chat.id, &reply.text, reply.html).await.ok();

    Ok(())
}

async fn handle_inline_query(bot: Bot, query: InlineQuery, state: Arc<BotState>) -> ResponseResult<()> {
    let entries = inline::answer(&state.app, &query.query).await;
    debug!("Inline query {:?} from {} → {} result(s)", query.query, query.from.id, entries.len());

    let results: Vec<InlineQueryResult> = entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let content = InputMessageContent::Text(InputMessageContentText::new(entry.text));
            InlineQueryResult::Article(
                InlineQueryResultArticle::new(i.to_string(), entry.title, content).description(entry.description),
            )
        })
        .collect();

    if let Err(e) = bot.answer_inline_query(query.id, results).cache_time(0).await {
        warn!("Failed to answer inline query: {e}");
    }

    Ok(())
}
