//! Process-wide application state shared with every handler.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use teloxide::types::UserId;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bot::database::Database;
use crate::bot::telegram::ChatActions;
use crate::bot::textgen::TextGenerator;

/// A pending automatic unmute.
pub struct ScheduledUnmute {
    pub until: DateTime<Utc>,
    handle: JoinHandle<()>,
}

/// Timed unmutes keyed by `(chat_id, user_id)`.
///
/// Entries live only in memory: a restart drops every pending unmute.
/// Telegram still lifts the restriction at `until` on its own.
#[derive(Default)]
pub struct UnmuteScheduler {
    tasks: Mutex<HashMap<(i64, i64), ScheduledUnmute>>,
}

impl UnmuteScheduler {
    fn tasks(&self) -> MutexGuard<'_, HashMap<(i64, i64), ScheduledUnmute>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Schedule an unmute at `until`, replacing any pending one for the same user.
    pub fn schedule<C: ChatActions>(
        self: &Arc<Self>,
        actions: Arc<C>,
        chat_id: i64,
        user_id: i64,
        until: DateTime<Utc>,
    ) {
        let delay = (until - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let scheduler = Arc::clone(self);

        // Hold the lock across spawn so the task cannot remove its entry
        // before it has been inserted.
        let mut tasks = self.tasks();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut tasks = scheduler.tasks();
                if !tasks.get(&(chat_id, user_id)).is_some_and(|entry| entry.until == until) {
                    return; // replaced by a newer mute
                }
                tasks.remove(&(chat_id, user_id));
            }
            match actions.unmute_user(chat_id, user_id).await {
                Ok(()) => info!("⏰ Auto-unmuted user {} in chat {}", user_id, chat_id),
                Err(e) => warn!("Auto-unmute failed for user {} in chat {}: {}", user_id, chat_id, e),
            }
        });

        if let Some(previous) = tasks.insert((chat_id, user_id), ScheduledUnmute { until, handle }) {
            previous.handle.abort();
            debug!("Replaced pending unmute for user {} in chat {}", user_id, chat_id);
        }
    }

    /// Abort a pending unmute. Returns `true` if one existed.
    pub fn cancel(&self, chat_id: i64, user_id: i64) -> bool {
        match self.tasks().remove(&(chat_id, user_id)) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Pending unmutes as `(chat_id, user_id, until)`, soonest first.
    pub fn pending(&self) -> Vec<(i64, i64, DateTime<Utc>)> {
        let mut list: Vec<_> = self
            .tasks()
            .iter()
            .map(|(&(chat, user), entry)| (chat, user, entry.until))
            .collect();
        list.sort_by_key(|&(_, _, until)| until);
        list
    }
}

/// Shared state handed to every handler through the dispatcher.
pub struct AppState {
    pub admin_id: Option<UserId>,
    pub db: Database,
    pub textgen: TextGenerator,
    pub unmutes: Arc<UnmuteScheduler>,
    bot_active: AtomicBool,
    seen_users: Mutex<BTreeSet<i64>>,
    started_at: Instant,
}

impl AppState {
    pub fn new(admin_id: Option<UserId>, db: Database, textgen: TextGenerator) -> Self {
        Self {
            admin_id,
            db,
            textgen,
            unmutes: Arc::new(UnmuteScheduler::default()),
            bot_active: AtomicBool::new(true),
            seen_users: Mutex::new(BTreeSet::new()),
            started_at: Instant::now(),
        }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_id.is_some_and(|admin| admin.0 as i64 == user_id)
    }

    pub fn is_active(&self) -> bool {
        self.bot_active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, active: bool) {
        self.bot_active.store(active, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    fn seen(&self) -> MutexGuard<'_, BTreeSet<i64>> {
        self.seen_users.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn seen_user_ids(&self) -> Vec<i64> {
        self.seen().iter().copied().collect()
    }

    pub fn seen_count(&self) -> usize {
        self.seen().len()
    }

    /// Record that `user_id` sent a text message.
    ///
    /// Skipped for banned users, and for everyone but the admin while the
    /// bot is switched off. Storage failures are logged, never returned.
    /// Returns whether the message was tracked.
    pub fn track(&self, user_id: i64) -> bool {
        if !self.is_active() && !self.is_admin(user_id) {
            return false;
        }
        match self.db.is_banned(user_id) {
            Ok(true) => return false,
            Ok(false) => {}
            Err(e) => {
                warn!("Ban check failed for {}: {}", user_id, e);
                return false;
            }
        }

        match self.db.get_active_user(user_id) {
            Ok(None) => info!("👤 New user {}", user_id),
            Ok(Some(user)) => debug!(
                "User {} seen again (first {}, last {})",
                user.user_id, user.first_seen, user.last_seen
            ),
            Err(e) => warn!("User lookup failed for {}: {}", user_id, e),
        }

        self.seen().insert(user_id);
        if let Err(e) = self.db.record_activity(user_id) {
            warn!("Failed to record activity for {}: {}", user_id, e);
        }
        true
    }
}

/// Human-friendly duration, e.g. `1d 2h 5m`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (days, hours, minutes, seconds) = (secs / 86400, (secs % 86400) / 3600, (secs % 3600) / 60, secs % 60);
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(admin: Option<u64>) -> AppState {
        AppState::new(admin.map(UserId), Database::in_memory().unwrap(), TextGenerator::disabled())
    }

    #[test]
    fn test_track_records_user() {
        let state = state(None);
        assert!(state.track(10));
        assert!(state.track(10));
        assert_eq!(state.seen_user_ids(), vec![10]);
        assert_eq!(state.db.count_active_users().unwrap(), 1);
    }

    #[test]
    fn test_banned_user_not_tracked() {
        let state = state(None);
        state.db.ban(10).unwrap();
        assert!(!state.track(10));
        assert_eq!(state.seen_count(), 0);
        assert_eq!(state.db.count_active_users().unwrap(), 0);
    }

    #[test]
    fn test_inactive_bot_tracks_only_admin() {
        let state = state(Some(1));
        state.set_active(false);
        assert!(!state.track(2));
        assert!(state.track(1));
        assert_eq!(state.seen_user_ids(), vec![1]);

        state.set_active(true);
        assert!(state.track(2));
    }

    #[test]
    fn test_is_admin() {
        assert!(state(Some(5)).is_admin(5));
        assert!(!state(Some(5)).is_admin(6));
        assert!(!state(None).is_admin(0));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(59)), "59s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h");
        assert_eq!(format_duration(Duration::from_secs(90061)), "1d 1h 1m 1s");
    }
}
