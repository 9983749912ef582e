// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tablero_app::{ScreenKind, Session, UserGrade};

const CONFIG_VERSION: i64 = 1;
const DEFAULT_SERVER_BASE_URL: &str = "http://localhost:4000";
const DEFAULT_ADMIN_NAME: &str = "admin";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            ui: Ui::default(),
            session: SessionConfig::default(),
            server: Server::default(),
            labels: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
    pub max_upload_size: Option<i64>,
    pub cache_ttl_days: Option<i64>,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            db_path: None,
            max_upload_size: Some(tablero_db::MAX_UPLOAD_SIZE),
            cache_ttl_days: Some(30),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Ui {
    pub start_screen: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub admin_name: Option<String>,
    pub grade: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            admin_name: Some(DEFAULT_ADMIN_NAME.to_owned()),
            grade: Some("admin".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub mode: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            mode: Some("local".to_owned()),
            base_url: Some(DEFAULT_SERVER_BASE_URL.to_owned()),
            timeout: Some("5s".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    Local,
    Remote,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("TABLERO_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set TABLERO_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(tablero_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and move values under [storage], [ui], [session], and [server]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            tablero_db::validate_db_path(db_path)?;
        }

        if let Some(max_size) = self.storage.max_upload_size
            && max_size <= 0
        {
            bail!(
                "storage.max_upload_size in {} must be positive, got {}",
                path.display(),
                max_size
            );
        }

        if let Some(ttl_days) = self.storage.cache_ttl_days
            && ttl_days < 0
        {
            bail!(
                "storage.cache_ttl_days in {} must be non-negative, got {}",
                path.display(),
                ttl_days
            );
        }

        if let Some(screen) = &self.ui.start_screen
            && ScreenKind::parse(screen).is_none()
        {
            bail!(
                "ui.start_screen in {} names unknown screen {screen:?}",
                path.display()
            );
        }

        if let Some(grade) = &self.session.grade
            && UserGrade::parse(grade).is_none()
        {
            bail!(
                "session.grade in {} must be normal, vip, or admin, got {grade:?}",
                path.display()
            );
        }

        match self.server.mode.as_deref() {
            None | Some("local") | Some("remote") => {}
            Some(other) => bail!(
                "server.mode in {} must be \"local\" or \"remote\", got {other:?}",
                path.display()
            ),
        }

        if let Some(timeout) = &self.server.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "server.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => tablero_db::default_db_path(),
        }
    }

    pub fn max_upload_size(&self) -> i64 {
        self.storage
            .max_upload_size
            .unwrap_or(tablero_db::MAX_UPLOAD_SIZE)
    }

    pub fn cache_ttl_days(&self) -> i64 {
        self.storage.cache_ttl_days.unwrap_or(30)
    }

    pub fn start_screen(&self) -> ScreenKind {
        self.ui
            .start_screen
            .as_deref()
            .and_then(ScreenKind::parse)
            .unwrap_or(ScreenKind::Users)
    }

    pub fn session(&self) -> Session {
        let name = self
            .session
            .admin_name
            .as_deref()
            .unwrap_or(DEFAULT_ADMIN_NAME);
        let grade = self
            .session
            .grade
            .as_deref()
            .and_then(UserGrade::parse)
            .unwrap_or(UserGrade::Admin);
        Session::new(name, grade)
    }

    pub fn server_mode(&self) -> ServerMode {
        match self.server.mode.as_deref() {
            Some("remote") => ServerMode::Remote,
            _ => ServerMode::Local,
        }
    }

    pub fn server_base_url(&self) -> &str {
        self.server
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn server_timeout(&self) -> Result<Duration> {
        parse_duration(self.server.timeout.as_deref().unwrap_or("5s"))
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# tablero config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/tablero/tablero.db)\n# db_path = \"/absolute/path/to/tablero.db\"\nmax_upload_size = {}\ncache_ttl_days = 30\n\n[ui]\nstart_screen = \"users\"\n\n[session]\nadmin_name = \"admin\"\ngrade = \"admin\"\n\n[server]\nmode = \"local\"\nbase_url = \"{}\"\ntimeout = \"5s\"\n\n[labels]\n# users = \"Members\"\n",
            path.display(),
            tablero_db::MAX_UPLOAD_SIZE,
            DEFAULT_SERVER_BASE_URL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, ServerMode, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;
    use tablero_app::{ScreenKind, UserGrade};

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.start_screen(), ScreenKind::Users);
        assert_eq!(config.server_mode(), ServerMode::Local);
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[server]\nmode=\"local\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        assert!(error.to_string().contains("version = 1"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[storage]\nmax_upload_size = 1024\n[ui]\nstart_screen = \"payments\"\n[session]\nadmin_name = \"Sora\"\ngrade = \"vip\"\n[server]\nmode = \"remote\"\nbase_url = \"http://localhost:4000/\"\ntimeout = \"2s\"\n[labels]\nusers = \"Members\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.max_upload_size(), 1024);
        assert_eq!(config.start_screen(), ScreenKind::Payments);
        assert_eq!(config.session().admin_name, "Sora");
        assert_eq!(config.session().grade, UserGrade::Vip);
        assert_eq!(config.server_mode(), ServerMode::Remote);
        assert_eq!(config.server_base_url(), "http://localhost:4000");
        assert_eq!(config.server_timeout()?, Duration::from_secs(2));
        assert_eq!(
            config.labels().collect::<Vec<_>>(),
            vec![("users", "Members")]
        );
        Ok(())
    }

    #[test]
    fn unknown_start_screen_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nstart_screen = \"dashboard\"\n")?;
        assert!(Config::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn unknown_server_mode_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[server]\nmode = \"p2p\"\n")?;
        assert!(Config::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_storage_value() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"https://evil.example/tablero.db\"\n")?;
        let error = Config::load(&path).expect_err("URI db_path should fail validation");
        assert!(error.to_string().contains("looks like a URI"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("TABLERO_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("TABLERO_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("oops").is_err());
        Ok(())
    }

    #[test]
    fn zero_timeout_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[server]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn example_config_includes_required_sections() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[storage]"));
        assert!(example.contains("[session]"));
        assert!(example.contains("[server]"));
        assert!(example.contains("[labels]"));
        Ok(())
    }
}
