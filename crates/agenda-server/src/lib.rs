//! Wiring for the agenda server binary: configuration loading and the
//! top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use agenda_core::{hours::BusinessHours, service::Scheduler, store::NoveltyStore};
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `AGENDA_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// Overrides for the working-day and allowed-time bounds.
  #[serde(default)]
  pub hours:      BusinessHours,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/agenda/agenda.db") }

impl ServerConfig {
  /// Layer the optional file at `path` under `AGENDA_*` environment
  /// variables.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::layered(path, environment())
  }

  fn layered(path: &Path, env: config::Environment) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(env)
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// `AGENDA_PORT` sets `port`; `AGENDA_HOURS__BASE_START` sets
/// `hours.base_start`.
fn environment() -> config::Environment {
  config::Environment::with_prefix("AGENDA")
    .prefix_separator("_")
    .separator("__")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API mounted under `/api`, with request tracing.
pub fn router<S>(scheduler: Arc<Scheduler<S>>) -> Router
where
  S: NoveltyStore + 'static,
{
  Router::new()
    .nest("/api", agenda_api::api_router(scheduler))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::fs;

  use agenda_store_sqlite::SqliteStore;
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;

  use super::*;

  fn write_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{name}-{}.toml", std::process::id()));
    fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/agenda.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.hours, BusinessHours::default());
  }

  #[test]
  fn file_overrides_hours() {
    let path = write_config(
      "agenda-hours",
      r#"
host = "0.0.0.0"
port = 9000
store_path = "/tmp/agenda.db"

[hours]
base_start = "09:00:00"
base_end = "18:00:00"
"#,
    );
    let cfg = ServerConfig::load(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(cfg.address(), "0.0.0.0:9000");
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/agenda.db"));
    assert_eq!(cfg.hours.base_start.to_string(), "09:00:00");
    assert_eq!(cfg.hours.base_end.to_string(), "18:00:00");
    // Unset bounds keep their defaults.
    assert_eq!(cfg.hours.min_allowed, BusinessHours::default().min_allowed);
    assert!(cfg.hours.validate().is_ok());
  }

  #[test]
  fn environment_overrides_file_with_single_underscore_prefix() {
    let path = write_config("agenda-env", "port = 9000\n");
    let vars = config::Map::from([
      ("AGENDA_PORT".to_owned(), "9123".to_owned()),
      ("AGENDA_HOST".to_owned(), "0.0.0.0".to_owned()),
      ("AGENDA_HOURS__BASE_END".to_owned(), "19:00:00".to_owned()),
    ]);
    let cfg = ServerConfig::layered(&path, environment().source(Some(vars))).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(cfg.address(), "0.0.0.0:9123");
    assert_eq!(cfg.hours.base_end.to_string(), "19:00:00");
    assert_eq!(cfg.hours.base_start, BusinessHours::default().base_start);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/agenda.db")),
      PathBuf::from(home).join("agenda.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs.db")), PathBuf::from("/abs.db"));
  }

  #[tokio::test]
  async fn api_is_nested_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let app = router(Arc::new(Scheduler::new(store, BusinessHours::default())));

    let resp = app
      .clone()
      .oneshot(Request::get("/api/novelties/today").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
      .oneshot(Request::get("/novelties/today").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
