//! Messenger abstraction for chat I/O.

pub mod cli;
pub mod messenger;
pub mod telegram;

pub use cli::CliMessenger;
pub use messenger::*;
pub use telegram::TelegramMessenger;
