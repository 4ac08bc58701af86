//! trialflow
//!
//! Crate raíz del servidor de seguimiento de trials:
//! - `config`: `AppConfig` desde entorno / `.env`.
//! - `server`: selección de store (memoria o Postgres) y router HTTP.
//!
//! El modelo y las reglas viven en `trial-core`; la persistencia en
//! `trial-persistence`; la superficie REST en `trial-api`.

pub mod config;
pub mod server;

pub use config::{AppConfig, ConfigError, StorageMode};
