use crate::collectors::collect_status;
use crate::config::{Config, SourcesConfig};
use crate::format::{format_status, Markup};
use chrono::Local;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, Message, MessageId,
    ParseMode,
};
use teloxide::utils::html;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

const ACCESS_DENIED: &str = "❌ У вас нет доступа к этому боту.";
const RATE_LIMITED: &str = "Слишком много запросов. Попробуйте чуть позже.";
const COLLECTING: &str = "📊 Получаю данные о системе...";

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("ошибка запроса Telegram: {0}")]
    Request(#[from] teloxide::RequestError),
}

#[derive(Clone)]
struct TelegramRuntime {
    host_label: String,
    sources: SourcesConfig,
    allowed_users: Arc<HashSet<u64>>,
    limiter: Arc<Mutex<RateLimiter>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Start,
    Help,
    Status,
    Refresh,
}

impl Action {
    fn from_command(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        let normalized = first.split('@').next()?.to_lowercase();
        match normalized.as_str() {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/status" => Some(Self::Status),
            _ => None,
        }
    }

    fn from_callback(data: &str) -> Option<Self> {
        match data {
            "refresh" => Some(Self::Refresh),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

pub async fn run_bot(
    bot: Bot,
    config: Arc<Config>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), TelegramError> {
    let me = bot.get_me().await?;
    info!(username = %me.username(), "Telegram-бот авторизован");

    let cfg = &config.telegram;
    if cfg.allowed_user_ids.is_empty() {
        warn!("telegram.allowed_user_ids пуст: бот отвечает всем пользователям");
    }

    let runtime = TelegramRuntime {
        host_label: config.host_label.clone(),
        sources: config.sources.clone(),
        allowed_users: Arc::new(cfg.allowed_user_ids.iter().copied().collect()),
        limiter: Arc::new(Mutex::new(RateLimiter::new(cfg.rate_limit_per_minute))),
    };

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![runtime])
        .build();

    let mut dispatch_handle = tokio::spawn(async move {
        dispatcher.dispatch().await;
    });

    tokio::select! {
        _ = shutdown.changed() => {
            dispatch_handle.abort();
            let _ = (&mut dispatch_handle).await;
            info!("остановка Telegram-бота");
            Ok(())
        }
        result = &mut dispatch_handle => {
            match result {
                Ok(()) => Ok(()),
                Err(join_err) if join_err.is_cancelled() => Ok(()),
                Err(join_err) => {
                    warn!(error = %join_err, "задача Telegram завершилась с ошибкой");
                    Ok(())
                }
            }
        }
    }
}

async fn handle_message(bot: Bot, msg: Message, runtime: TelegramRuntime) -> ResponseResult<()> {
    let Some(user_id) = msg.from().map(|u| u.id.0) else {
        return Ok(());
    };
    if !is_allowed(user_id, &runtime.allowed_users) {
        info!(user_id, "отказано в доступе");
        bot.send_message(msg.chat.id, ACCESS_DENIED).await?;
        return Ok(());
    }

    if !consume_rate_limit(&runtime, user_id).await {
        bot.send_message(msg.chat.id, RATE_LIMITED).await?;
        return Ok(());
    }

    let action = msg
        .text()
        .and_then(Action::from_command)
        .unwrap_or(Action::Start);
    debug!(user_id, action = ?action, "команда Telegram");

    match action {
        Action::Start => {
            bot.send_message(msg.chat.id, welcome_text(&runtime.host_label))
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Action::Help => {
            bot.send_message(msg.chat.id, help_text(&runtime.host_label))
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Action::Status | Action::Refresh => {
            let placeholder = bot.send_message(msg.chat.id, COLLECTING).await?;
            let text = render_status(&runtime).await;
            upsert_status_message(&bot, msg.chat.id, Some(placeholder.id), text).await?;
        }
    }
    Ok(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    runtime: TelegramRuntime,
) -> ResponseResult<()> {
    let user_id = q.from.id.0;
    if !is_allowed(user_id, &runtime.allowed_users) {
        bot.answer_callback_query(q.id).text(ACCESS_DENIED).await?;
        return Ok(());
    }
    if !consume_rate_limit(&runtime, user_id).await {
        bot.answer_callback_query(q.id).text(RATE_LIMITED).await?;
        return Ok(());
    }

    let action = q.data.as_deref().and_then(Action::from_callback);
    let Some(message) = q.message.as_ref() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    match action {
        Some(Action::Refresh) => {
            let text = render_status(&runtime).await;
            if let Err(err) = bot
                .edit_message_text(message.chat.id, message.id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(status_keyboard())
                .await
            {
                debug!(error = %err, "не удалось обновить сообщение со статусом");
            }
        }
        Some(Action::Help) => {
            bot.send_message(message.chat.id, help_text(&runtime.host_label))
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Some(Action::Start) | Some(Action::Status) | None => {}
    }

    bot.answer_callback_query(q.id).await?;
    Ok(())
}

async fn render_status(runtime: &TelegramRuntime) -> String {
    let snapshot = collect_status(&runtime.sources).await;
    format_status(
        &snapshot,
        Markup::Html,
        Local::now().naive_local(),
        &runtime.host_label,
    )
}

async fn upsert_status_message(
    bot: &Bot,
    chat_id: ChatId,
    existing: Option<MessageId>,
    text: String,
) -> ResponseResult<()> {
    if let Some(msg_id) = existing {
        let result = bot
            .edit_message_text(chat_id, msg_id, text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(status_keyboard())
            .await;
        match result {
            Ok(_) => return Ok(()),
            Err(err) => warn!(error = %err, "не удалось отредактировать сообщение, отправляем новое"),
        }
    }

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(status_keyboard())
        .await?;
    Ok(())
}

fn status_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("🔄 Обновить", "refresh"),
        InlineKeyboardButton::callback("Помощь", "help"),
    ]])
}

fn welcome_text(host_label: &str) -> String {
    let host = html::escape(host_label);
    [
        format!("🤖 <b>{host} Monitor Bot</b>"),
        String::new(),
        "Доступные команды:".to_string(),
        "/status - Показать статус системы".to_string(),
        "/help - Показать эту справку".to_string(),
        String::new(),
        "Используйте /status для получения информации о температуре, загрузке CPU и памяти."
            .to_string(),
    ]
    .join("\n")
}

fn help_text(host_label: &str) -> String {
    let host = html::escape(host_label);
    [
        format!("🤖 <b>{host} Monitor Bot - Справка</b>"),
        String::new(),
        "<b>Команды:</b>".to_string(),
        "/start - Запустить бота".to_string(),
        "/status - Показать статус системы".to_string(),
        "/help - Показать эту справку".to_string(),
        String::new(),
        "<b>Что показывает /status:</b>".to_string(),
        "• Температура CPU".to_string(),
        "• Загрузка процессора (1, 5, 15 минут)".to_string(),
        "• Использование памяти".to_string(),
        "• Свободное место на диске".to_string(),
        "• Время работы системы".to_string(),
        String::new(),
        "<b>Статусы:</b>".to_string(),
        "✅ - Нормальное состояние".to_string(),
        "⚠ - Повышенные показатели".to_string(),
        "❌ - Критические показатели".to_string(),
        String::new(),
        "<i>Данные собираются заново при каждом запросе.</i>".to_string(),
    ]
    .join("\n")
}

async fn consume_rate_limit(runtime: &TelegramRuntime, user_id: u64) -> bool {
    let now = now_unix();
    let mut limiter = runtime.limiter.lock().await;
    limiter.allow(user_id, now)
}

pub fn is_allowed(user_id: u64, allowed: &HashSet<u64>) -> bool {
    allowed.is_empty() || allowed.contains(&user_id)
}

#[derive(Debug)]
struct RateLimiter {
    limit_per_minute: u32,
    timestamps_by_user: HashMap<u64, VecDeque<i64>>,
}

impl RateLimiter {
    fn new(limit_per_minute: u32) -> Self {
        Self {
            limit_per_minute,
            timestamps_by_user: HashMap::new(),
        }
    }

    fn allow(&mut self, user_id: u64, now_unix: i64) -> bool {
        self.timestamps_by_user
            .retain(|_, queue| queue.back().is_some_and(|ts| now_unix - ts < 60));

        let queue = self.timestamps_by_user.entry(user_id).or_default();
        while let Some(ts) = queue.front().copied() {
            if now_unix - ts >= 60 {
                queue.pop_front();
            } else {
                break;
            }
        }

        if queue.len() >= self.limit_per_minute as usize {
            return false;
        }

        queue.push_back(now_unix);
        true
    }
}

pub fn resolve_token(cfg: &crate::config::TelegramConfig) -> Result<String, String> {
    if let Ok(v) = std::env::var(&cfg.bot_token_env) {
        if !v.trim().is_empty() {
            return Ok(v.trim().to_string());
        }
    }
    if let Some(v) = cfg
        .bot_token
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    {
        return Ok(v);
    }

    Err(format!(
        "не найден токен Telegram: задайте '{}' в окружении или telegram.bot_token в config",
        cfg.bot_token_env
    ))
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelegramConfig;

    #[test]
    fn allow_list_checks_user_ids() {
        let allowed: HashSet<u64> = [100].into_iter().collect();
        assert!(is_allowed(100, &allowed));
        assert!(!is_allowed(101, &allowed));
    }

    #[test]
    fn empty_allow_list_admits_everyone() {
        assert!(is_allowed(42, &HashSet::new()));
    }

    #[test]
    fn rate_limiter_enforces_limit() {
        let mut limiter = RateLimiter::new(2);
        assert!(limiter.allow(1, 10));
        assert!(limiter.allow(1, 20));
        assert!(!limiter.allow(1, 30));
        assert!(limiter.allow(2, 30));
        assert!(limiter.allow(1, 71));
    }

    #[test]
    fn rate_limiter_forgets_idle_users() {
        let mut limiter = RateLimiter::new(5);
        for user_id in 0..100 {
            assert!(limiter.allow(user_id, 0));
        }
        assert_eq!(limiter.timestamps_by_user.len(), 100);

        assert!(limiter.allow(7, 120));
        assert_eq!(limiter.timestamps_by_user.len(), 1);
        assert!(limiter.timestamps_by_user.contains_key(&7));
    }

    #[test]
    fn commands_are_parsed_with_bot_suffix() {
        assert_eq!(Action::from_command("/status"), Some(Action::Status));
        assert_eq!(
            Action::from_command("/STATUS@pi_monitor_bot now"),
            Some(Action::Status)
        );
        assert_eq!(Action::from_command("/help"), Some(Action::Help));
        assert_eq!(Action::from_command("/start"), Some(Action::Start));
        assert_eq!(Action::from_command("hello"), None);
        assert_eq!(Action::from_callback("refresh"), Some(Action::Refresh));
        assert_eq!(Action::from_callback("unknown"), None);
    }

    #[test]
    fn help_lists_commands_and_escapes_label() {
        let text = help_text("Pi <lab>");
        assert!(text.contains("Pi &lt;lab&gt; Monitor Bot"));
        for cmd in ["/start", "/status", "/help"] {
            assert!(text.contains(cmd), "нет {cmd}");
        }
        assert!(welcome_text("Raspberry Pi").starts_with("🤖 <b>Raspberry Pi Monitor Bot</b>"));
    }

    #[test]
    fn token_from_config_when_env_missing() {
        let cfg = TelegramConfig {
            bot_token_env: "PIMONITOR_TEST_MISSING_TOKEN_ENV".to_string(),
            bot_token: Some("  123:abc  ".to_string()),
            ..TelegramConfig::default()
        };
        std::env::remove_var("PIMONITOR_TEST_MISSING_TOKEN_ENV");
        assert_eq!(resolve_token(&cfg).unwrap(), "123:abc");

        let empty = TelegramConfig {
            bot_token_env: "PIMONITOR_TEST_MISSING_TOKEN_ENV".to_string(),
            ..TelegramConfig::default()
        };
        assert!(resolve_token(&empty)
            .unwrap_err()
            .contains("PIMONITOR_TEST_MISSING_TOKEN_ENV"));
    }
}
