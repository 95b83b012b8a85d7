use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Sqlite,
    File,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sql" | "db" => Ok(StorageBackend::Sqlite),
            "file" | "json" => Ok(StorageBackend::File),
            other => Err(AppError::Config(format!(
                "invalid STORAGE_BACKEND `{other}` (expected `sqlite` or `file`)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub storage_backend: StorageBackend,
    pub cars_file: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://carsharing.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => StorageBackend::default(),
        };

        let cars_file = env::var("CARS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("cars.json"));

        Ok(Self {
            database_url,
            listen_addr,
            storage_backend,
            cars_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("sqlite".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert_eq!(" JSON ".parse::<StorageBackend>().unwrap(), StorageBackend::File);
        assert!(matches!(
            "redis".parse::<StorageBackend>(),
            Err(AppError::Config(_))
        ));
    }
}
