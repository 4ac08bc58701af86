//! Configuración central del servidor.
//! Carga variables de entorno (.env una sola vez) y produce un `AppConfig`
//! inmutable. Los flags de línea de comandos del binario pisan estos valores.
use std::env;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use thiserror::Error;
use trial_core::WorkflowPolicy;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv();
});

pub const DEFAULT_LISTEN: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 3001));
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:5173";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Backend de almacenamiento. `Auto` usa Postgres si hay `DATABASE_URL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StorageMode {
    #[default]
    Auto,
    Memory,
    Postgres,
}

impl FromStr for StorageMode {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(StorageMode::Auto),
            "memory" => Ok(StorageMode::Memory),
            "postgres" => Ok(StorageMode::Postgres),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub listen: SocketAddr,
    /// Base de las URLs de reporte codificadas en el QR.
    pub public_url: String,
    pub policy: WorkflowPolicy,
    pub storage: StorageMode,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let read = |key: &'static str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let invalid = |key: &'static str, value: String| ConfigError::Invalid { key, value };

        let listen = match read("TRIALFLOW_LISTEN") {
            Some(v) => v.parse().map_err(|_| invalid("TRIALFLOW_LISTEN", v))?,
            None => DEFAULT_LISTEN,
        };
        let public_url = read("TRIALFLOW_PUBLIC_URL").unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string());
        let storage = match read("TRIALFLOW_STORAGE") {
            Some(v) => v.parse().map_err(|_| invalid("TRIALFLOW_STORAGE", v))?,
            None => StorageMode::Auto,
        };
        let flag = |key: &'static str| -> Result<bool, ConfigError> {
            match read(key) {
                None => Ok(false),
                Some(v) => parse_bool(&v).ok_or_else(|| invalid(key, v)),
            }
        };
        let policy = WorkflowPolicy { enforce_step_order: flag("TRIALFLOW_ENFORCE_STEP_ORDER")?,
                                      validate_fields: flag("TRIALFLOW_VALIDATE_FIELDS")? };
        Ok(AppConfig { listen,
                       public_url,
                       policy,
                       storage })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
