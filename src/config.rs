use std::net::{IpAddr, SocketAddr};

use crate::error::RegistryError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_POOL_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    pub listen_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_pool_size: usize,
}

impl RegistryConfig {
    pub fn from_env() -> Result<Self, RegistryError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, RegistryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host: IpAddr = lookup("REGISTRY_HOST")
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
            .parse()
            .map_err(|e| RegistryError::ConfigError {
                message: format!("Invalid REGISTRY_HOST: {}", e),
            })?;

        let port: u16 = match lookup("REGISTRY_PORT") {
            Some(raw) => raw.parse().map_err(|e| RegistryError::ConfigError {
                message: format!("Invalid REGISTRY_PORT '{}': {}", raw, e),
            })?,
            None => DEFAULT_PORT,
        };

        let database_pool_size = match lookup("DATABASE_POOL_SIZE") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(RegistryError::ConfigError {
                        message: format!("Invalid DATABASE_POOL_SIZE '{}'", raw),
                    })
                }
            },
            None => DEFAULT_POOL_SIZE,
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        Ok(Self {
            listen_addr: SocketAddr::new(host, port),
            database_url,
            database_pool_size,
        })
    }

    /// Database URL with the credentials section masked, for logging.
    pub fn redacted_database_url(&self) -> Option<String> {
        self.database_url.as_deref().map(redact_credentials)
    }
}

fn redact_credentials(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end + 3 => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}
