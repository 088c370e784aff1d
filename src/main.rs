use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use twitch_chat::chat::Chat;
use twitch_chat::config::{LEGACY_CONFIG_FILE, load_legacy_settings, load_settings};
use twitch_chat::error::Result as AppResult;

#[tokio::main(flavor = "current_thread")]
async fn main() -> AppResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_PKG_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = if Path::new(LEGACY_CONFIG_FILE).is_file() {
        tracing::info!(path = LEGACY_CONFIG_FILE, "Loading legacy config file");
        load_legacy_settings(LEGACY_CONFIG_FILE)?
    } else {
        load_settings()?
    };
    tracing::info!(
        nick = %settings.nick,
        channel = %settings.channel,
        "Configuration loaded"
    );

    let mut chat = Chat::new(settings);
    chat.run().await
}
