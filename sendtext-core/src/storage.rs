//! Database target resolution, performed once at service start-up.
//!
//! One of three backends is selected from environment-supplied connection
//! strings: MySQL, PostgreSQL, or an SQLite folder. The default is an embedded
//! SQLite folder under the configured data path.

use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Prefix for database names on networked engines and SQLite URI folders
const DB_PREFIX: &str = "sendtext";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to create database folder {path}: {source}")]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid port in database URI: {0}")]
    InvalidPort(String),

    #[error("Could not determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// Connection strings and engine switches read from the environment
#[derive(Debug, Clone)]
pub struct DatabaseEnv {
    pub mysql_uri: String,
    pub postgresql_uri: String,
    pub sqlite_uri: String,
    pub enable_mysql: bool,
    pub enable_postgresql: bool,
    pub enable_sqlite: bool,
}

impl Default for DatabaseEnv {
    fn default() -> Self {
        Self {
            mysql_uri: String::new(),
            postgresql_uri: String::new(),
            sqlite_uri: String::new(),
            enable_mysql: true,
            enable_postgresql: true,
            enable_sqlite: true,
        }
    }
}

impl DatabaseEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key)
                .map(|value| value.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(true)
        };
        Self {
            mysql_uri: lookup("MYSQL_URI").unwrap_or_default(),
            postgresql_uri: lookup("POSTGRESQL_URI").unwrap_or_default(),
            sqlite_uri: lookup("SQLITE_URI").unwrap_or_default(),
            enable_mysql: flag("ENABLE_MYSQL"),
            enable_postgresql: flag("ENABLE_POSTGRESQL"),
            enable_sqlite: flag("ENABLE_SQLITE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEngine {
    MySql,
    PostgreSql,
}

impl NetworkEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkEngine::MySql => "mysql",
            NetworkEngine::PostgreSql => "postgresql",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// SQLite files in a local folder
    EmbeddedFile { folder: PathBuf, from_uri: bool },
    Networked {
        engine: NetworkEngine,
        username: String,
        password: String,
        host: String,
        port: u16,
        base_uri: String,
    },
}

impl DatabaseTarget {
    pub fn engine_name(&self) -> &'static str {
        match self {
            DatabaseTarget::EmbeddedFile { .. } => "sqlite",
            DatabaseTarget::Networked { engine, .. } => engine.as_str(),
        }
    }
}

/// Resolved target plus the URI of each store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseLayout {
    pub target: DatabaseTarget,
    pub apscheduler: String,
    pub timer_tasks: String,
    pub metadata: String,
    pub jobs: String,
}

impl DatabaseLayout {
    pub fn uris(&self) -> [(&'static str, &str); 4] {
        [
            ("apscheduler", &self.apscheduler),
            ("timer_tasks", &self.timer_tasks),
            ("metadata", &self.metadata),
            ("jobs", &self.jobs),
        ]
    }
}

impl fmt::Display for DatabaseLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = match &self.target {
            DatabaseTarget::Networked { password, .. } if !password.is_empty() => {
                Some(format!(":{}@", password))
            }
            _ => None,
        };
        writeln!(f, "engine: {}", self.target.engine_name())?;
        for (name, uri) in self.uris() {
            let shown = match &secret {
                Some(secret) => uri.replace(secret.as_str(), ":******@"),
                None => uri.to_string(),
            };
            writeln!(f, "{}: {}", name, shown)?;
        }
        Ok(())
    }
}

fn mysql_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^mysql://(.+?):(.+?)@(.+?):(\d+)").expect("mysql pattern is valid")
    })
}

fn postgres_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^postgres://(.+?):(.+?)@(.+?):(\d+)").expect("postgres pattern is valid")
    })
}

fn sqlite_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^sqlite:///(.+)$").expect("sqlite pattern is valid"))
}

/// Forward slashes, no trailing slash
fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => path,
    }
}

fn ensure_folder(folder: &Path) -> Result<(), DatabaseError> {
    if !folder.exists() {
        std::fs::create_dir_all(folder).map_err(|source| DatabaseError::CreateFolder {
            path: folder.to_path_buf(),
            source,
        })?;
        tracing::info!(folder = %folder.display(), "Created database folder");
    }
    Ok(())
}

fn networked(
    engine: NetworkEngine,
    uri: &str,
    captures: regex::Captures<'_>,
) -> Result<DatabaseTarget, DatabaseError> {
    let port = captures[4]
        .parse::<u16>()
        .map_err(|_| DatabaseError::InvalidPort(captures[4].to_string()))?;
    Ok(DatabaseTarget::Networked {
        engine,
        username: captures[1].to_string(),
        password: captures[2].to_string(),
        host: captures[3].to_string(),
        port,
        base_uri: normalize(uri),
    })
}

/// Pick the database backend and derive the URI of every store.
pub fn resolve_database(data_path: &Path, env: &DatabaseEnv) -> Result<DatabaseLayout, DatabaseError> {
    let target = if let Some(captures) = env
        .enable_mysql
        .then(|| mysql_pattern().captures(&env.mysql_uri))
        .flatten()
    {
        tracing::info!("Found environment variable MYSQL_URI");
        networked(NetworkEngine::MySql, &env.mysql_uri, captures)?
    } else if let Some(captures) = env
        .enable_postgresql
        .then(|| postgres_pattern().captures(&env.postgresql_uri))
        .flatten()
    {
        tracing::info!("Found environment variable POSTGRESQL_URI");
        networked(NetworkEngine::PostgreSql, &env.postgresql_uri, captures)?
    } else if let Some(captures) = env
        .enable_sqlite
        .then(|| sqlite_pattern().captures(&env.sqlite_uri))
        .flatten()
    {
        tracing::info!(uri = %env.sqlite_uri, "Found environment variable SQLITE_URI");
        let folder = PathBuf::from(&captures[1]);
        let folder = if folder.is_absolute() {
            folder
        } else {
            std::env::current_dir()
                .map_err(DatabaseError::CurrentDir)?
                .join(folder)
        };
        DatabaseTarget::EmbeddedFile {
            folder,
            from_uri: true,
        }
    } else {
        DatabaseTarget::EmbeddedFile {
            folder: data_path.to_path_buf(),
            from_uri: false,
        }
    };

    let layout = match &target {
        DatabaseTarget::Networked { base_uri, .. } => {
            let uri = |name: &str| format!("{}/{}_{}", base_uri, DB_PREFIX, name);
            DatabaseLayout {
                apscheduler: uri("apscheduler"),
                timer_tasks: uri("timertasks"),
                metadata: uri("metadata"),
                jobs: uri("jobs"),
                target: target.clone(),
            }
        }
        DatabaseTarget::EmbeddedFile { folder, from_uri } => {
            ensure_folder(folder)?;
            let base = normalize(&folder.to_string_lossy());
            let uri = |file: &str| format!("sqlite:///{}/{}.db", base, file);
            if *from_uri {
                DatabaseLayout {
                    apscheduler: uri(&format!("{}_apscheduler", DB_PREFIX)),
                    timer_tasks: uri(&format!("{}_timertasks", DB_PREFIX)),
                    metadata: uri(&format!("{}_metadata", DB_PREFIX)),
                    jobs: uri(&format!("{}_jobs", DB_PREFIX)),
                    target: target.clone(),
                }
            } else {
                DatabaseLayout {
                    apscheduler: uri("apscheduler"),
                    timer_tasks: uri("timer_tasks"),
                    metadata: uri("metadata"),
                    jobs: uri("jobs"),
                    target: target.clone(),
                }
            }
        }
    };
    tracing::debug!(engine = layout.target.engine_name(), "Database layout resolved");
    Ok(layout)
}
