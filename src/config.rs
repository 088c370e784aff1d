use crate::error::{ConfigError, Result as AppResult};
use crate::irc::Settings;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use std::path::Path;

/// Plain-text file with the nick, token and channel on its first three
/// non-empty lines.
pub const LEGACY_CONFIG_FILE: &str = "config";
pub const CONFIG_FILE_STEM: &str = "chat";
pub const ENV_PREFIX: &str = "TWITCH_CHAT";

const REQUIRED_KEYS: [&str; 3] = ["nick", "token", "channel"];

/// Loads settings from an optional `chat.{toml,yaml,json,...}` file,
/// overridden by `TWITCH_CHAT_NICK`, `TWITCH_CHAT_TOKEN` and
/// `TWITCH_CHAT_CHANNEL`.
pub fn load_settings() -> AppResult<Settings> {
    let builder = Config::builder()
        .add_source(File::with_name(CONFIG_FILE_STEM).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX));
    settings_from_builder(builder)
}

fn settings_from_builder(builder: ConfigBuilder<DefaultState>) -> AppResult<Settings> {
    let config = builder.build()?;

    for key in REQUIRED_KEYS {
        if config.get_string(key).is_err() {
            return Err(ConfigError::Missing(key.to_string()).into());
        }
    }

    Ok(config.try_deserialize()?)
}

pub fn load_legacy_settings(path: impl AsRef<Path>) -> AppResult<Settings> {
    let content = std::fs::read_to_string(path)?;
    parse_legacy_settings(&content)
}

fn parse_legacy_settings(content: &str) -> AppResult<Settings> {
    let mut lines = content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty());

    let mut next = |key: &str| {
        lines
            .next()
            .map(str::to_string)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    };
    let nick = next("nick")?;
    let token = next("token")?;
    let channel = next("channel")?;

    Ok(Settings {
        nick,
        token,
        channel,
    })
}
