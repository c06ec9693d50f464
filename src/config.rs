use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const TOKEN_ENV_VAR: &str = "OAUTH_2_LICHESS_KEY";

#[derive(Serialize, Deserialize, Default)]
struct Config {
    api_token: Option<String>,
}

fn get_config_path() -> Result<PathBuf, AppError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("config directory not found".to_string()))?;
    Ok(config_dir.join("lcc").join("config.toml"))
}

/// Writes the token to the user config file, readable only by the owner.
pub fn save_api_token(token: &str) -> Result<PathBuf, AppError> {
    let config_path = get_config_path()?;
    save_api_token_to(&config_path, token)?;
    Ok(config_path)
}

fn save_api_token_to(config_path: &Path, token: &str) -> Result<(), AppError> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let config = Config {
        api_token: Some(token.trim().to_string()),
    };
    let toml_string = toml::to_string(&config)
        .map_err(|e| AppError::Config(format!("failed to serialize config: {e}")))?;

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(config_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.metadata()?.permissions();
        perms.set_mode(0o600);
        file.set_permissions(perms)?;
    }

    file.write_all(toml_string.as_bytes())?;
    Ok(())
}

/// Resolves the bearer token: environment (including `.env`) first, then the config file.
pub fn load_api_token() -> Result<String, AppError> {
    let env_token = std::env::var(TOKEN_ENV_VAR).ok();
    match get_config_path() {
        Ok(config_path) => load_api_token_with(env_token, &config_path),
        Err(_) => non_blank(env_token).ok_or(AppError::MissingToken),
    }
}

fn load_api_token_with(
    env_token: Option<String>,
    config_path: &Path,
) -> Result<String, AppError> {
    if let Some(token) = non_blank(env_token) {
        tracing::debug!("using API token from {}", TOKEN_ENV_VAR);
        return Ok(token);
    }
    load_api_token_from(config_path)?.ok_or(AppError::MissingToken)
}

fn non_blank(token: Option<String>) -> Option<String> {
    token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn load_api_token_from(config_path: &Path) -> Result<Option<String>, AppError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(config_path)?;
    let config: Config = toml::from_str(&contents).map_err(|e| {
        AppError::Config(format!("failed to parse {}: {e}", config_path.display()))
    })?;

    tracing::debug!("using API token from {}", config_path.display());
    Ok(non_blank(config.api_token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let config: Config = toml::from_str("api_token = \"lip_secret\"").unwrap();
        assert_eq!(config.api_token, Some("lip_secret".to_string()));
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        assert_eq!(load_api_token_from(&path).unwrap(), None);
    }

    #[test]
    fn test_blank_token_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "api_token = \"   \"").unwrap();
        assert_eq!(load_api_token_from(&path).unwrap(), None);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "api_token = ").unwrap();
        assert!(matches!(
            load_api_token_from(&path),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("lcc").join("config.toml");

        save_api_token_to(&path, "lip_abc123\n").unwrap();
        assert_eq!(
            load_api_token_from(&path).unwrap(),
            Some("lip_abc123".to_string())
        );
    }

    #[test]
    fn test_api_token_loading_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        save_api_token_to(&path, "file_token").unwrap();

        let token = load_api_token_with(Some("env_token".to_string()), &path).unwrap();
        assert_eq!(token, "env_token");

        let token = load_api_token_with(Some("  ".to_string()), &path).unwrap();
        assert_eq!(token, "file_token");

        let token = load_api_token_with(None, &path).unwrap();
        assert_eq!(token, "file_token");
    }

    #[test]
    fn test_no_token_anywhere_is_missing_token() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        assert!(matches!(
            load_api_token_with(None, &path),
            Err(AppError::MissingToken)
        ));
        assert!(matches!(
            load_api_token_with(Some(String::new()), &path),
            Err(AppError::MissingToken)
        ));
    }

    #[test]
    #[cfg(unix)]
    fn test_save_api_token_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        save_api_token_to(&path, "lip_perm").unwrap();

        let metadata = fs::metadata(&path).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }
}
