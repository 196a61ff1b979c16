/*
    leakroot  -  a memory leak root-cause analyzer
    Copyright (C) 2026  The leakroot Authors

    This program is free software: you can redistribute it and/or modify it
    under the terms of the GNU General Public License as published by the
    Free Software Foundation, either version 3 of the License, or (at your
    option) any later version.

    This program is distributed in the hope that it will be useful, but
    WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License
    for more details.

    You should have received a copy of the GNU General Public License along
    with this program. If not, see <https://www.gnu.org/licenses/>.
*/

// The two configuration sources named in the external interfaces: an
// environment variable override, and a credential file the `configure`
// subcommand writes interactively. There is no layered configuration file
// for other settings.
use serde::{Deserialize, Serialize};
use std::env;
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

const APP_DIR_NAME: &str = "leakroot";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine the user's home directory")]
    NoHomeDirectory,

    #[error("could not read credentials file: {0}")]
    Read(String),

    #[error("could not write credentials file: {0}")]
    Write(String),

    #[error("no API key configured; run `leakroot configure` or set LEAKROOT_API_KEY")]
    MissingApiKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Credentials {
    api_key: String,
}

fn config_dir() -> Result<PathBuf, ConfigError> {
    let home = env::var_os("HOME").ok_or(ConfigError::NoHomeDirectory)?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
}

fn credentials_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("credentials"))
}

pub struct Settings {
    pub api_key: Option<String>,
    pub max_trace_steps: u64,
    pub platform: Option<String>,
}

const DEFAULT_MAX_TRACE_STEPS: u64 = 2_000_000;

impl Settings {
    // Resolve settings from the environment first, falling back to the
    // persisted credentials file for the API key only.
    pub fn load() -> Result<Settings, ConfigError> {
        let api_key = match env::var("LEAKROOT_API_KEY") {
            Ok(key) if !key.is_empty() => Some(key),
            _ => read_stored_api_key()?,
        };

        let max_trace_steps = env::var("LEAKROOT_MAX_TRACE_STEPS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_TRACE_STEPS);

        let platform = env::var("LEAKROOT_PLATFORM").ok();

        Ok(Settings {
            api_key,
            max_trace_steps,
            platform,
        })
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }
}

fn read_stored_api_key() -> Result<Option<String>, ConfigError> {
    let path = credentials_path()?;
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::Read(e.to_string()))?;
    let creds: Credentials = serde_json::from_str(&text).map_err(|e| ConfigError::Read(e.to_string()))?;
    Ok(Some(creds.api_key))
}

// Interactive `configure` subcommand: prompt for an API key on stdin and
// persist it to the credentials file, owner-only readable and writable.
pub fn run_configure() -> Result<(), Box<dyn Error>> {
    print!("Enter your leakroot API key: ");
    io::stdout().flush()?;

    let mut api_key = String::new();
    io::stdin().read_line(&mut api_key)?;
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        return Err("no API key entered".into());
    }

    let dir = config_dir()?;
    fs::create_dir_all(&dir)?;

    let path = dir.join("credentials");
    let contents = serde_json::to_string_pretty(&Credentials { api_key })?;
    fs::write(&path, contents)?;
    set_owner_only_permissions(&path)?;

    println!("Credentials saved to {}", path.display());
    Ok(())
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &std::path::Path) -> Result<(), Box<dyn Error>> {
    use std::os::unix::fs::PermissionsExt;
    let permissions = fs::Permissions::from_mode(0o600);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &std::path::Path) -> Result<(), Box<dyn Error>> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_max_trace_steps_is_reasonable() {
        assert!(DEFAULT_MAX_TRACE_STEPS > 0);
    }

    #[test]
    fn missing_api_key_is_a_distinct_error() {
        let settings = Settings {
            api_key: None,
            max_trace_steps: 1,
            platform: None,
        };
        assert!(matches!(settings.require_api_key(), Err(ConfigError::MissingApiKey)));
    }
}
