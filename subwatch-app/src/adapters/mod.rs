//! Platform-agnostic adapters: storage, scanning and alert delivery.

#[cfg(feature = "discord-alerts")]
mod discord_notifier;
mod passive_scanner;

#[cfg(feature = "discord-alerts")]
pub use discord_notifier::DiscordNotifier;
pub use passive_scanner::PassiveScanner;

#[cfg(feature = "sqlite-store")]
mod sqlite;

#[cfg(feature = "sqlite-store")]
pub use sqlite::SqliteStore;
