use thiserror::Error;
use yaml_rust::{Yaml, YamlLoader};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("invalid yaml: {0}")]
    Yaml(#[from] yaml_rust::ScanError),
    #[error("the config file is empty")]
    Empty,
    #[error("{0} not found!")]
    Missing(&'static str),
    #[error("{name} is out of range: {value}")]
    OutOfRange { name: &'static str, value: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origin: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    /// Empty means "generate one at startup".
    pub jwt_secret: String,
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    pub base_url: String,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub mysql: MySqlConfig,
    pub auth: AuthConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let buf = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
        Self::from_yaml_str(&buf)
    }

    pub fn from_yaml_str(buf: &str) -> Result<Self, ConfigError> {
        let docs = YamlLoader::load_from_str(buf)?;
        let config = docs.first().ok_or(ConfigError::Empty)?;

        let server = &config["server"];
        let creds = &config["mysql"];
        let auth = &config["auth"];
        let catalog = &config["catalog"];

        Ok(AppConfig {
            server: ServerConfig {
                host: server["host"].as_str().unwrap_or("0.0.0.0").to_string(),
                port: bounded(server, "port", "server.port", 8080)?,
                allowed_origin: server["allowed-origin"].as_str().map(str::to_string),
            },
            mysql: MySqlConfig {
                host: required_str(creds, "host", "mysql.host")?,
                port: bounded(creds, "port", "mysql.port", 3306)?,
                username: required_str(creds, "username", "mysql.username")?,
                password: required_str(creds, "password", "mysql.password")?,
                database: required_str(creds, "database", "mysql.database")?,
                max_connections: bounded(creds, "max-connections", "mysql.max-connections", 5)?,
            },
            auth: AuthConfig {
                jwt_secret: auth["jwt-secret"].as_str().unwrap_or("").to_string(),
                secure_cookie: auth["secure-cookie"].as_bool().unwrap_or(false),
            },
            catalog: CatalogConfig {
                base_url: catalog["base-url"].as_str().unwrap_or("http://localhost:3000").to_string(),
                page_size: bounded(catalog, "page-size", "catalog.page-size", 100)?,
            },
        })
    }

    /// `JWT_SECRET` in the environment wins over the file.
    pub fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
    }
}

fn required_str(section: &Yaml, key: &str, name: &'static str) -> Result<String, ConfigError> {
    section[key].as_str()
        .map(str::to_string)
        .ok_or(ConfigError::Missing(name))
}

/// An integer that must fit `T`; absent means `default`.
fn bounded<T: TryFrom<i64>>(section: &Yaml, key: &str, name: &'static str, default: T) -> Result<T, ConfigError> {
    match section[key].as_i64() {
        Some(value) => T::try_from(value).map_err(|_| ConfigError::OutOfRange { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
server:
  host: 127.0.0.1
  port: 9000
  allowed-origin: https://shop.example.com
mysql:
  host: db
  port: 3307
  username: app
  password: hunter2
  database: storefront
auth:
  jwt-secret: s3cret
  secure-cookie: true
catalog:
  base-url: https://catalog.example.com
  page-size: 50
"#;

    #[test]
    fn reads_every_section() {
        let config = AppConfig::from_yaml_str(FULL).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.allowed_origin.as_deref(), Some("https://shop.example.com"));
        assert_eq!(config.mysql.port, 3307);
        assert_eq!(config.mysql.database, "storefront");
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert!(config.auth.secure_cookie);
        assert_eq!(config.catalog.page_size, 50);
    }

    #[test]
    fn optional_values_fall_back() {
        let config = AppConfig::from_yaml_str(
            "mysql:\n  host: db\n  username: app\n  password: pw\n  database: storefront\n"
        ).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.mysql.port, 3306);
        assert_eq!(config.auth.jwt_secret, "");
        assert!(!config.auth.secure_cookie);
        assert_eq!(config.catalog.page_size, 100);
    }

    #[test]
    fn missing_database_credentials_are_reported() {
        let err = AppConfig::from_yaml_str("mysql:\n  host: db\n").unwrap_err();
        assert_eq!(err.to_string(), "mysql.username not found!");
        assert!(matches!(AppConfig::from_yaml_str(""), Err(ConfigError::Empty)));
    }

    #[test]
    fn oversized_numbers_are_rejected() {
        let creds = "mysql:\n  host: db\n  username: app\n  password: pw\n  database: storefront\n";

        let err = AppConfig::from_yaml_str(&format!("server:\n  port: 70000\n{creds}")).unwrap_err();
        assert_eq!(err.to_string(), "server.port is out of range: 70000");

        let err = AppConfig::from_yaml_str(&creds.replace("host: db", "host: db\n  port: -1")).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { name: "mysql.port", value: -1 }));

        let err = AppConfig::from_yaml_str(&format!("{creds}catalog:\n  page-size: -5\n")).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { name: "catalog.page-size", .. }));
    }
}
