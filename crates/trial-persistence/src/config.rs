//! Configuración de conexión desde variables de entorno.
//! Usa `DATABASE_URL` y parámetros opcionales de pool.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_MIN_CONNECTIONS: u32 = 2;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    /// Lee `DATABASE_URL` (obligatoria), `DATABASE_MIN_CONNECTIONS` y
    /// `DATABASE_MAX_CONNECTIONS`. Valores no numéricos caen al default.
    pub fn from_env() -> Result<Self, PersistenceError> {
        init_dotenv();
        let url = env::var("DATABASE_URL").map_err(|_| PersistenceError::Config("DATABASE_URL is not set".into()))?;
        Ok(Self { url,
                  min_connections: read_u32("DATABASE_MIN_CONNECTIONS").unwrap_or(DEFAULT_MIN_CONNECTIONS),
                  max_connections: read_u32("DATABASE_MAX_CONNECTIONS").unwrap_or(DEFAULT_MAX_CONNECTIONS) })
    }

    /// `true` si hay una URL de base de datos disponible (entorno o `.env`).
    pub fn is_configured() -> bool {
        init_dotenv();
        env::var("DATABASE_URL").map(|v| !v.trim().is_empty()).unwrap_or(false)
    }
}

fn read_u32(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Forzar carga temprana de .env desde aplicaciones externas.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
