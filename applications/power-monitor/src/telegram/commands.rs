use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::client::TelegramClient;
use super::types::{CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, Update};
use crate::error::Result;
use crate::outage::PowerMonitor;
use crate::render;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Bot commands understood by the chat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Status,
    Stats,
    History,
    Analytics,
    Forecast,
}

impl Command {
    /// Parse `/name@bot args`. Bot suffix and arguments are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "status" => Some(Self::Status),
            "stats" => Some(Self::Stats),
            "history" => Some(Self::History),
            "analytics" => Some(Self::Analytics),
            "forecast" => Some(Self::Forecast),
            _ => None,
        }
    }
}

/// Inline keyboard buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Stats,
    Status,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "stats" => Some(Self::Stats),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Reply {
    fn text(text: String) -> Self {
        Self {
            text,
            keyboard: None,
        }
    }
}

pub fn main_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![
            InlineKeyboardButton::callback("📊 Statistics", "stats"),
            InlineKeyboardButton::callback("🔌 Status", "status"),
        ]],
    }
}

/// Build the reply to a command. Read-only with respect to the monitor.
pub async fn respond(command: Command, monitor: &PowerMonitor, group_label: &str) -> Reply {
    match command {
        Command::Start | Command::Help => Reply {
            text: render::welcome(group_label),
            keyboard: Some(main_keyboard()),
        },
        Command::Status => Reply::text(render::status(&monitor.status().await)),
        Command::Stats => Reply::text(render::statistics(monitor.statistics().await.as_ref())),
        Command::History => Reply::text(render::history(&monitor.history().await)),
        Command::Analytics => Reply::text(render::analytics(monitor.analytics().await.as_ref())),
        Command::Forecast => Reply::text(render::forecast(&monitor.forecast().await)),
    }
}

/// Compact report shown in place of the message that carried the button.
pub async fn respond_callback(action: CallbackAction, monitor: &PowerMonitor) -> String {
    match action {
        CallbackAction::Stats => render::statistics_short(monitor.statistics().await.as_ref()),
        CallbackAction::Status => render::status_short(&monitor.status().await),
    }
}

/// Long-polling command loop.
pub struct ChatBot {
    client: TelegramClient,
    monitor: PowerMonitor,
    group_label: String,
    poll_timeout_secs: u64,
}

impl ChatBot {
    pub fn new(
        client: TelegramClient,
        monitor: PowerMonitor,
        group_label: String,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            monitor,
            group_label,
            poll_timeout_secs,
        }
    }

    /// Poll for updates until the task is cancelled.
    pub async fn run(self) {
        info!("Starting chat command loop");
        let mut offset: Option<i64> = None;

        loop {
            let updates = match self
                .client
                .get_updates(offset, self.poll_timeout_secs)
                .await
            {
                Ok(updates) => updates,
                Err(e) => {
                    error!(error = %e, "failed to fetch updates; retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = Some(update.update_id + 1);
                if let Err(e) = self.handle_update(update).await {
                    warn!(error = %e, "failed to answer update");
                }
            }
        }
    }

    async fn handle_update(&self, update: Update) -> Result<()> {
        if let Some(message) = update.message {
            self.handle_message(message).await
        } else if let Some(callback) = update.callback_query {
            self.handle_callback(callback).await
        } else {
            Ok(())
        }
    }

    async fn handle_message(&self, message: Message) -> Result<()> {
        let Some(command) = message.text.as_deref().and_then(Command::parse) else {
            return Ok(());
        };
        debug!(?command, chat_id = message.chat.id, "handling command");

        let reply = respond(command, &self.monitor, &self.group_label).await;
        self.client
            .send_message(
                &message.chat.id.to_string(),
                &reply.text,
                reply.keyboard.as_ref(),
            )
            .await?;
        Ok(())
    }

    async fn handle_callback(&self, callback: CallbackQuery) -> Result<()> {
        // Answer first so the client stops showing the spinner.
        self.client.answer_callback_query(&callback.id).await?;

        let Some(action) = callback.data.as_deref().and_then(CallbackAction::parse) else {
            return Ok(());
        };
        let Some(message) = callback.message else {
            return Ok(());
        };
        debug!(?action, chat_id = message.chat.id, "handling callback");

        let text = respond_callback(action, &self.monitor).await;
        self.client
            .edit_message_text(&message.chat.id.to_string(), message.message_id, &text)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Arc;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/help"), Some(Command::Help));
        assert_eq!(Command::parse("/status"), Some(Command::Status));
        assert_eq!(Command::parse("/stats"), Some(Command::Stats));
        assert_eq!(Command::parse("/history"), Some(Command::History));
        assert_eq!(Command::parse("/analytics"), Some(Command::Analytics));
        assert_eq!(Command::parse("/forecast"), Some(Command::Forecast));
    }

    #[test]
    fn test_parse_ignores_bot_suffix_and_arguments() {
        assert_eq!(Command::parse("/stats@PowerBot"), Some(Command::Stats));
        assert_eq!(Command::parse("  /status now please"), Some(Command::Status));
    }

    #[test]
    fn test_parse_rejects_unknown_and_plain_text() {
        assert_eq!(Command::parse("/reboot"), None);
        assert_eq!(Command::parse("status"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("/"), None);
    }

    #[test]
    fn test_parse_callbacks() {
        assert_eq!(CallbackAction::parse("stats"), Some(CallbackAction::Stats));
        assert_eq!(CallbackAction::parse("status"), Some(CallbackAction::Status));
        assert_eq!(CallbackAction::parse("history"), None);
    }

    #[tokio::test]
    async fn test_start_reply_carries_keyboard() {
        let monitor = PowerMonitor::new(Arc::new(ManualClock::new(at(9, 0))));
        let reply = respond(Command::Start, &monitor, "3.2").await;

        assert!(reply.text.contains("3.2"));
        assert_eq!(reply.keyboard, Some(main_keyboard()));
    }

    #[tokio::test]
    async fn test_commands_do_not_change_state() {
        let clock = Arc::new(ManualClock::new(at(9, 0)));
        let monitor = PowerMonitor::new(clock.clone());
        monitor.power_lost().await;
        clock.set(at(9, 30));

        for command in [
            Command::Status,
            Command::Stats,
            Command::History,
            Command::Analytics,
            Command::Forecast,
        ] {
            let reply = respond(command, &monitor, "3.2").await;
            assert!(reply.keyboard.is_none());
        }

        let report = monitor.status().await;
        assert_eq!(report.status, crate::outage::PowerStatus::Down);
        assert_eq!(report.since, Some(at(9, 0)));
    }

    #[tokio::test]
    async fn test_status_callback_is_compact() {
        let monitor = PowerMonitor::new(Arc::new(ManualClock::new(at(9, 0))));
        let text = respond_callback(CallbackAction::Status, &monitor).await;
        assert_eq!(text, "🟢 Power is on");
    }
}
