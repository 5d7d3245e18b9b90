use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use parrot_config::Config;
use parrot_config::generator::GeneratorConfig;
use serde::{Deserialize, Serialize};

const MAIN_PROFILE: &str = "main";

/// Per-user profile directory
pub fn profiles_dir() -> anyhow::Result<PathBuf> {
    let root = dirs::config_dir().context("no user config directory on this platform")?;
    Ok(root.join("parrot").join("profiles"))
}

/// Represents a user profile
#[derive(Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub value: Config,
}

/// Create the profile folder and the main profile if missing
pub fn init_profiles(dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir)?;

    let main_profile = profile_path(dir, MAIN_PROFILE);
    if !main_profile.exists() {
        let mut value = Config::new();
        // Keys stay in the environment
        value.generator.api_key.clear();

        let profile = Profile {
            name: MAIN_PROFILE.into(),
            value,
        };
        fs::write(&main_profile, serde_json::to_string_pretty(&profile)?)?;
        tracing::info!(path = %main_profile.display(), "Created main profile");
    }

    Ok(())
}

/// Load a profile by name, falling back to main, then to defaults
pub fn load_profile(dir: &Path, name: &str) -> anyhow::Result<Config> {
    let requested = profile_path(dir, name);
    let main = profile_path(dir, MAIN_PROFILE);

    let config = if requested.exists() {
        read_profile(&requested)?
    } else if main.exists() {
        tracing::warn!("Profile {name} not found, falling back to main profile");
        read_profile(&main)?
    } else {
        tracing::warn!("No profiles found, using defaults");
        Config::new()
    };

    Ok(with_env_secrets(config))
}

/// Load a bare config file, as passed with `--config`
pub fn load_config_file(path: &Path) -> anyhow::Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: Config = serde_json::from_str(&data)?;
    Ok(with_env_secrets(config))
}

fn profile_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}

fn read_profile(path: &Path) -> anyhow::Result<Config> {
    let data = fs::read_to_string(path)?;
    let profile: Profile = serde_json::from_str(&data)
        .with_context(|| format!("parsing profile {}", path.display()))?;
    Ok(profile.value)
}

fn with_env_secrets(mut config: Config) -> Config {
    if config.generator.api_key.is_empty() {
        config.generator.api_key = GeneratorConfig::new().api_key;
    }
    config
}
