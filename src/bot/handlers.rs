//! Command handlers. Each command produces exactly one reply.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use teloxide::utils::html::escape;
use tracing::{debug, info, warn};

use crate::bot::calc;
use crate::bot::commands::{self, AdminCommand, Command, Invocation};
use crate::bot::replies;
use crate::bot::state::{AppState, format_duration};
use crate::bot::telegram::ChatActions;
use crate::bot::textgen;

const DEFAULT_MUTE: Duration = Duration::from_secs(60 * 60);
const MAX_MUTE: Duration = Duration::from_secs(366 * 24 * 60 * 60);
const DEFAULT_PURGE: i32 = 10;
const MAX_PURGE: i32 = 100;
const DEFAULT_TRANSLATE_LANGUAGE: &str = "English";

const DB_FAILURE: &str = "⚠️ Database error, please try again later.";
const GROUP_ONLY: &str = "This command only works in groups.";

/// The message a command was replied to.
#[derive(Debug, Clone, Default)]
pub struct Quoted {
    pub message_id: i32,
    pub user_id: Option<i64>,
    pub text: String,
}

/// Everything a handler may read about the incoming command.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub sender_id: i64,
    pub first_name: String,
    pub chat_id: i64,
    pub message_id: i32,
    pub is_group: bool,
    /// Text after the command token, trimmed.
    pub args: String,
    pub reply_to: Option<Quoted>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Send with HTML parse mode.
    pub html: bool,
}

impl Reply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), html: false }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self { text: text.into(), html: true }
    }
}

fn usage(command: impl Into<Invocation>, args: &str) -> Reply {
    Reply::plain(format!("Usage: /{} {}", command.into().name(), args))
}

/// Run one command. Never fails: every error becomes a reply.
pub async fn handle<C: ChatActions>(
    state: &AppState,
    actions: &Arc<C>,
    command: Invocation,
    req: &Request,
) -> Reply {
    match command {
        Invocation::Public(command) => public(state, command, req).await,
        Invocation::Admin(command) if state.is_admin(req.sender_id) => admin(state, actions, command, req).await,
        Invocation::Admin(command) => {
            info!("Rejected /{} from non-admin {}", Invocation::from(command).name(), req.sender_id);
            Reply::plain(replies::NOT_AUTHORIZED)
        }
    }
}

async fn public(state: &AppState, command: Command, req: &Request) -> Reply {
    let args = req.args.as_str();
    match command {
        // ==================== STATIC ====================
        Command::Start => Reply::plain(replies::start(&req.first_name)),
        Command::Help => Reply::plain(format!("📖 Available commands:\n{}", commands::help_text())),
        Command::About => Reply::plain(replies::about()),
        Command::Ping => Reply::plain(replies::ping()),
        Command::Joke => Reply::plain(replies::joke()),
        Command::Fact => Reply::plain(replies::fact()),
        Command::Quote => Reply::plain(replies::quote()),
        Command::Motivate => Reply::plain(replies::motivate()),
        Command::Tip => Reply::plain(replies::tip()),
        Command::Rules => Reply::plain(replies::rules()),
        Command::Hello => Reply::plain(replies::hello(&req.first_name)),
        Command::Support => Reply::plain(replies::support()),

        // ==================== RANDOMIZED ====================
        Command::Flip => Reply::plain(replies::flip()),
        Command::Roll => Reply::plain(replies::roll()),
        Command::Random => Reply::plain(replies::random_number()),
        Command::EightBall => with_text(command, args, "<question>", replies::eight_ball),
        Command::Rate => with_text(command, args, "<something>", replies::rate),
        Command::Choose => match replies::choose(args) {
            Some(reply) => Reply::plain(reply),
            None => usage(command, "option1, option2[, ...]"),
        },
        Command::Compliment => Reply::plain(replies::compliment()),
        Command::Roast => Reply::plain(replies::roast()),
        Command::Fortune => Reply::plain(replies::fortune()),
        Command::Password => {
            let length = args.parse().unwrap_or(replies::PASSWORD_DEFAULT);
            Reply::html(format!("🔑 <code>{}</code>", escape(&replies::password(length))))
        }
        Command::Luck => Reply::plain(replies::luck()),

        // ==================== TEXT TRANSFORMS ====================
        Command::Echo => with_text(command, args, "<text>", str::to_string),
        Command::Reverse => with_text(command, args, "<text>", replies::reverse),
        Command::Upper => with_text(command, args, "<text>", replies::upper),
        Command::Lower => with_text(command, args, "<text>", replies::lower),
        Command::Title => with_text(command, args, "<text>", replies::title),
        Command::Count => with_text(command, args, "<text>", replies::count),
        Command::Mock => with_text(command, args, "<text>", replies::mock),
        Command::Clap => with_text(command, args, "<text>", replies::clap),

        // ==================== ARITHMETIC ====================
        Command::Calc => calculate(args),

        // ==================== INFO ====================
        Command::Id => {
            let mut text = format!(
                "👤 Your id: <code>{}</code>\n💬 Chat id: <code>{}</code>",
                req.sender_id, req.chat_id
            );
            if let Some(user_id) = req.reply_to.as_ref().and_then(|q| q.user_id) {
                text.push_str(&format!("\n↩️ Replied user id: <code>{user_id}</code>"));
            }
            Reply::html(text)
        }
        Command::Time => Reply::plain(format!("🕒 {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))),
        Command::Uptime => Reply::plain(format!("⏱️ Uptime: {}", format_duration(state.uptime()))),

        // ==================== EXTERNAL SERVICE ====================
        Command::Ask => {
            if args.is_empty() {
                return usage(command, "<question>");
            }
            generate(state, &textgen::ask_prompt(args)).await
        }
        Command::Translate => {
            let Some(text) = req.reply_to.as_ref().map(|q| q.text.trim()).filter(|t| !t.is_empty()) else {
                return Reply::plain("Reply to a text message with /translate [language].");
            };
            let language = if args.is_empty() { DEFAULT_TRANSLATE_LANGUAGE } else { args };
            generate(state, &textgen::translate_prompt(text, language)).await
        }
    }
}

async fn admin<C: ChatActions>(state: &AppState, actions: &Arc<C>, command: AdminCommand, req: &Request) -> Reply {
    let args = req.args.as_str();
    match command {
        AdminCommand::Shutdown => {
            state.set_active(false);
            info!("🔴 Tracking paused by admin");
            Reply::plain("🔴 Bot is now off: user tracking paused.")
        }
        AdminCommand::Poweron => {
            state.set_active(true);
            info!("🟢 Tracking resumed by admin");
            Reply::plain("🟢 Bot is now on: user tracking resumed.")
        }
        AdminCommand::Broadcast => {
            if args.is_empty() {
                return usage(command, "<message>");
            }
            broadcast(state, actions.as_ref(), args).await
        }
        AdminCommand::Ban => {
            let Some((user_id, _)) = target(req) else {
                return usage(command, "<user_id> (or reply to a message)");
            };
            match state.db.ban(user_id) {
                Ok(true) => Reply::plain(format!("🚫 User {user_id} has been banned.")),
                Ok(false) => Reply::plain(format!("User {user_id} is already banned.")),
                Err(e) => {
                    warn!("Ban of {} failed: {}", user_id, e);
                    Reply::plain(DB_FAILURE)
                }
            }
        }
        AdminCommand::Unban => {
            let Some((user_id, _)) = target(req) else {
                return usage(command, "<user_id> (or reply to a message)");
            };
            match state.db.unban(user_id) {
                Ok(true) => Reply::plain(format!("✅ User {user_id} has been unbanned.")),
                Ok(false) => Reply::plain(format!("User {user_id} is not banned.")),
                Err(e) => {
                    warn!("Unban of {} failed: {}", user_id, e);
                    Reply::plain(DB_FAILURE)
                }
            }
        }
        AdminCommand::Banned => match state.db.list_banned_user_ids() {
            Ok(ids) if ids.is_empty() => Reply::plain("No banned users."),
            Ok(ids) => Reply::html(id_list(&format!("🚫 Banned users ({}):", ids.len()), &ids)),
            Err(e) => {
                warn!("Listing banned users failed: {}", e);
                Reply::plain(DB_FAILURE)
            }
        },
        AdminCommand::Stats => stats(state),
        AdminCommand::Users => {
            let ids = state.seen_user_ids();
            if ids.is_empty() {
                Reply::plain("No users seen this session yet.")
            } else {
                Reply::html(id_list(&format!("👥 Users seen this session ({}):", ids.len()), &ids))
            }
        }
        AdminCommand::Kick => {
            if !req.is_group {
                return Reply::plain(GROUP_ONLY);
            }
            let Some((user_id, _)) = target(req) else {
                return usage(command, "<user_id> (or reply to a message)");
            };
            match actions.kick_user(req.chat_id, user_id).await {
                Ok(()) => Reply::plain(format!("👢 User {user_id} has been kicked.")),
                Err(_) => Reply::plain("❌ Failed to kick user. Make sure I am an admin with ban rights."),
            }
        }
        AdminCommand::Purge => purge(actions.as_ref(), req).await,
        AdminCommand::Mute => {
            if !req.is_group {
                return Reply::plain(GROUP_ONLY);
            }
            let Some((user_id, rest)) = target(req) else {
                return usage(command, "[user_id] [duration, e.g. 30m, 2h, 1d] (or reply to a message)");
            };
            let Some(duration) = parse_duration(rest) else {
                return usage(command, "[user_id] [duration, e.g. 30m, 2h, 1d] (or reply to a message)");
            };
            mute(state, actions, req.chat_id, user_id, duration).await
        }
        AdminCommand::Unmute => {
            if !req.is_group {
                return Reply::plain(GROUP_ONLY);
            }
            let Some((user_id, _)) = target(req) else {
                return usage(command, "<user_id> (or reply to a message)");
            };
            match actions.unmute_user(req.chat_id, user_id).await {
                Ok(()) => {
                    if state.unmutes.cancel(req.chat_id, user_id) {
                        debug!("Cancelled scheduled unmute for {} in chat {}", user_id, req.chat_id);
                    }
                    Reply::plain(format!("🔊 User {user_id} has been unmuted."))
                }
                Err(_) => Reply::plain("❌ Failed to unmute user. Make sure I am an admin with restrict rights."),
            }
        }
        AdminCommand::Mutes => {
            let pending = state.unmutes.pending();
            if pending.is_empty() {
                return Reply::plain("No scheduled unmutes.");
            }
            let now = Utc::now();
            let lines: Vec<String> = pending
                .iter()
                .map(|(chat_id, user_id, until)| {
                    let left = (*until - now).to_std().unwrap_or(Duration::ZERO);
                    format!("• user {user_id} in chat {chat_id}: {}", format_duration(left))
                })
                .collect();
            Reply::plain(format!("⏰ Scheduled unmutes:\n{}", lines.join("\n")))
        }
    }
}

/// Reply with `transform(args)`, or usage when there is no text.
fn with_text<F, S>(command: Command, args: &str, placeholder: &str, transform: F) -> Reply
where
    F: Fn(&str) -> S,
    S: Into<String>,
{
    if args.is_empty() {
        return usage(command, placeholder);
    }
    Reply::plain(transform(args))
}

pub fn calculate(args: &str) -> Reply {
    if args.is_empty() {
        return usage(Command::Calc, "<expression>");
    }
    match calc::evaluate(args) {
        Ok(value) => Reply::plain(calc::format_number(value)),
        Err(e) => {
            debug!("Calc {:?} failed: {}", args, e);
            Reply::plain(replies::INVALID_EXPRESSION)
        }
    }
}

async fn generate(state: &AppState, prompt: &str) -> Reply {
    match state.textgen.generate(prompt).await {
        Ok(text) => Reply::plain(text),
        Err(e) => {
            warn!("Text generation failed: {}", e);
            Reply::plain(replies::SERVICE_FAILURE)
        }
    }
}

/// Send `text` to every stored active user. Per-recipient failures are skipped.
pub async fn broadcast<C: ChatActions>(state: &AppState, actions: &C, text: &str) -> Reply {
    let recipients = match state.db.list_active_user_ids() {
        Ok(ids) => ids,
        Err(e) => {
            warn!("Loading broadcast recipients failed: {}", e);
            return Reply::plain(DB_FAILURE);
        }
    };

    let mut delivered = 0;
    for &user_id in &recipients {
        match actions.send_text(user_id, text).await {
            Ok(()) => delivered += 1,
            Err(e) => debug!("Broadcast to {} skipped: {}", user_id, e),
        }
    }

    info!("📢 Broadcast delivered to {}/{} users", delivered, recipients.len());
    Reply::plain(format!("📢 Broadcast sent to {}/{} users.", delivered, recipients.len()))
}

async fn purge<C: ChatActions>(actions: &C, req: &Request) -> Reply {
    let count = match req.args.as_str() {
        "" => DEFAULT_PURGE,
        raw => match raw.parse::<i32>() {
            Ok(n) => n.clamp(1, MAX_PURGE),
            Err(_) => return usage(AdminCommand::Purge, "[count, 1-100]"),
        },
    };

    // The command itself, then the `count` message ids before it.
    let mut deleted = 0;
    let mut last_error = None;
    for message_id in (req.message_id - count..=req.message_id).rev().filter(|&id| id > 0) {
        match actions.delete_message(req.chat_id, message_id).await {
            Ok(()) => deleted += 1,
            Err(e) => last_error = Some(e),
        }
    }

    if deleted == 0 {
        if let Some(e) = last_error {
            warn!("{}", e);
        }
        return Reply::plain("❌ Failed to delete messages. Make sure I am an admin with delete rights.");
    }
    info!("🧹 Purged {} message(s) in chat {}", deleted, req.chat_id);
    Reply::plain(format!("🧹 Deleted {deleted} message(s)."))
}

async fn mute<C: ChatActions>(
    state: &AppState,
    actions: &Arc<C>,
    chat_id: i64,
    user_id: i64,
    duration: Duration,
) -> Reply {
    // `duration` is capped at MAX_MUTE by parse_duration
    let until = Utc::now() + chrono::Duration::seconds(duration.as_secs() as i64);
    match actions.mute_user(chat_id, user_id, until).await {
        Ok(()) => {
            state.unmutes.schedule(Arc::clone(actions), chat_id, user_id, until);
            Reply::plain(format!("🔇 User {user_id} muted for {}.", format_duration(duration)))
        }
        // Logged by the ChatActions implementation
        Err(_) => Reply::plain("❌ Failed to mute user. Make sure I am an admin with restrict rights."),
    }
}

fn stats(state: &AppState) -> Reply {
    let (active, banned) = match (state.db.count_active_users(), state.db.count_banned_users()) {
        (Ok(active), Ok(banned)) => (active, banned),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Loading stats failed: {}", e);
            return Reply::plain(DB_FAILURE);
        }
    };
    Reply::html(format!(
        "📊 <b>Bot stats</b>\nActive users: {}\nBanned users: {}\nSeen this session: {}\nTracking: {}\nUptime: {}",
        active,
        banned,
        state.seen_count(),
        if state.is_active() { "on 🟢" } else { "off 🔴" },
        format_duration(state.uptime()),
    ))
}

fn id_list(header: &str, ids: &[i64]) -> String {
    let lines: Vec<String> = ids.iter().map(|id| format!("• <code>{id}</code>")).collect();
    format!("{}\n{}", escape(header), lines.join("\n"))
}

/// Target user and the remaining arguments.
///
/// A reply picks the replied-to sender and leaves every argument to the
/// command, so `/mute 30` on a reply means thirty minutes. An explicit
/// leading id wins over the reply only when more arguments follow it
/// (`<id> <duration>`). Without a reply the leading id is required.
fn target(req: &Request) -> Option<(i64, &str)> {
    let args = req.args.as_str();
    let (first, rest) = match args.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (args, ""),
    };
    let explicit = first.parse::<i64>().ok().filter(|&id| id > 0);
    let replied = req.reply_to.as_ref().and_then(|q| q.user_id);

    match (explicit, replied) {
        (Some(user_id), Some(_)) if !rest.is_empty() => Some((user_id, rest)),
        (_, Some(user_id)) => Some((user_id, args)),
        (Some(user_id), None) => Some((user_id, rest)),
        (None, None) => None,
    }
}

/// `30s`, `10m`, `2h`, `1d`, or bare minutes. Empty means the default.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Some(DEFAULT_MUTE);
    }

    let unit_start = input.find(|c: char| !c.is_ascii_digit()).unwrap_or(input.len());
    if unit_start == 0 {
        return None;
    }
    let num: u64 = input[..unit_start].parse().ok()?;
    let seconds_per_unit = match input[unit_start..].trim().to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" => 1,
        "" | "m" | "min" | "mins" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 60 * 60,
        "d" | "day" | "days" => 24 * 60 * 60,
        _ => return None,
    };

    let duration = Duration::from_secs(num.checked_mul(seconds_per_unit)?);
    (!duration.is_zero() && duration <= MAX_MUTE).then_some(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration(""), Some(DEFAULT_MUTE));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(600)));
        assert_eq!(parse_duration("10m"), Some(Duration::from_secs(600)));
        assert_eq!(parse_duration("2H"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("1 day"), Some(Duration::from_secs(86400)));
    }

    #[test]
    fn test_parse_duration_rejects() {
        assert_eq!(parse_duration("0m"), None);
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration("5y"), None);
        assert_eq!(parse_duration("400d"), None);
        assert_eq!(parse_duration("99999999999999999999"), None);
    }

    #[test]
    fn test_target_prefers_explicit_id() {
        let req = Request {
            args: "42 10m".into(),
            reply_to: Some(Quoted { user_id: Some(7), ..Default::default() }),
            ..Default::default()
        };
        assert_eq!(target(&req), Some((42, "10m")));
    }

    #[test]
    fn test_target_from_reply() {
        let req = Request {
            args: "10m".into(),
            reply_to: Some(Quoted { user_id: Some(7), ..Default::default() }),
            ..Default::default()
        };
        assert_eq!(target(&req), Some((7, "10m")));
    }

    #[test]
    fn test_target_reply_keeps_bare_number_as_argument() {
        let req = Request {
            args: "30".into(),
            reply_to: Some(Quoted { user_id: Some(7), ..Default::default() }),
            ..Default::default()
        };
        assert_eq!(target(&req), Some((7, "30")));

        let req = Request { args: "30".into(), ..Default::default() };
        assert_eq!(target(&req), Some((30, "")));
    }

    #[test]
    fn test_target_missing() {
        assert_eq!(target(&Request::default()), None);
        let req = Request { args: "alice".into(), ..Default::default() };
        assert_eq!(target(&req), None);
    }

    #[test]
    fn test_calculate() {
        assert_eq!(calculate("2+2"), Reply::plain("4"));
        assert_eq!(calculate("10/0"), Reply::plain(replies::INVALID_EXPRESSION));
        assert_eq!(calculate("DROP TABLE"), Reply::plain(replies::INVALID_EXPRESSION));
        assert_eq!(calculate(""), Reply::plain("Usage: /calc <expression>"));
    }
}
