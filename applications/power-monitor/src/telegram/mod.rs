pub mod client;
pub mod commands;
pub mod types;

pub use client::TelegramClient;
pub use commands::{respond, respond_callback, CallbackAction, ChatBot, Command, Reply};
