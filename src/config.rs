use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 5] = ["mp4", "mov", "avi", "mkv", "webm"];

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct UploadsSection {
    pub upload_dir: Option<String>,
    pub allowed_extensions: Option<Vec<String>>,
    pub max_file_size: Option<u64>,
    pub upload_buffer_size: Option<usize>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub database_path: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct MaintenanceSection {
    pub orphan_sweep_interval_seconds: Option<u64>,
    pub orphan_grace_seconds: Option<u64>,
}

/// Layout of `config.toml`. Every key is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub uploads: UploadsSection,
    pub database: DatabaseSection,
    pub maintenance: MaintenanceSection,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub database_path: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub max_file_size: u64,
    pub upload_buffer_size: usize,
    pub max_connections: u32,
    pub orphan_sweep_interval_seconds: u64,
    pub orphan_grace_seconds: u64,
}

impl Config {
    /// Defaults, then `config.toml` in the working directory, then environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        let config_path = base_dir.join("config.toml");
        let config_file = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<ConfigFile>(&content)?
        } else {
            ConfigFile::default()
        };

        Ok(Self::resolve(&base_dir, config_file, |key| std::env::var(key).ok()))
    }

    // Backward compatibility
    pub fn from_env() -> Self {
        Self::load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Merge a parsed config file with environment overrides looked up through `env`.
    pub fn resolve(
        base_dir: &Path,
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let defaults = Self::defaults_in(base_dir);

        let host = env("HOST")
            .or(file.server.host)
            .unwrap_or(defaults.host);

        let port = env("PORT")
            .and_then(|p| p.parse().ok())
            .or(file.server.port)
            .unwrap_or(defaults.port);

        let upload_dir = env("UPLOAD_DIR")
            .or(file.uploads.upload_dir)
            .map(|dir| absolutize(base_dir, &dir))
            .unwrap_or(defaults.upload_dir);

        let database_path = env("DATABASE_PATH")
            .or(file.database.database_path)
            .map(|path| absolutize(base_dir, &path))
            .unwrap_or(defaults.database_path);

        let max_file_size = env("MAX_FILE_SIZE")
            .and_then(|v| v.parse().ok())
            .or(file.uploads.max_file_size)
            .unwrap_or(defaults.max_file_size);

        let allowed_extensions = file
            .uploads
            .allowed_extensions
            .map(|exts| {
                exts.into_iter()
                    .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                    .filter(|ext| !ext.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|exts| !exts.is_empty())
            .unwrap_or(defaults.allowed_extensions);

        let upload_buffer_size = file
            .uploads
            .upload_buffer_size
            .filter(|&v| v > 0)
            .unwrap_or(defaults.upload_buffer_size);

        let max_connections = file
            .database
            .max_connections
            .filter(|&v| v > 0)
            .unwrap_or(defaults.max_connections);

        Self {
            host,
            port,
            upload_dir,
            database_path,
            allowed_extensions,
            max_file_size,
            upload_buffer_size,
            max_connections,
            orphan_sweep_interval_seconds: file
                .maintenance
                .orphan_sweep_interval_seconds
                .unwrap_or(defaults.orphan_sweep_interval_seconds),
            orphan_grace_seconds: file
                .maintenance
                .orphan_grace_seconds
                .unwrap_or(defaults.orphan_grace_seconds),
        }
    }

    /// Default configuration rooted at `base_dir`.
    pub fn defaults_in(base_dir: &Path) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            upload_dir: base_dir.join("uploads"),
            database_path: base_dir.join("videos.db"),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_file_size: 500 * 1024 * 1024,
            upload_buffer_size: 65536,
            max_connections: 5,
            orphan_sweep_interval_seconds: 0,
            orphan_grace_seconds: 3600,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::defaults_in(&base_dir)
    }
}

fn absolutize(base_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_match_original_layout() {
        let config = Config::resolve(Path::new("/srv/app"), ConfigFile::default(), no_env);
        assert_eq!(config.port, 5000);
        assert_eq!(config.upload_dir, PathBuf::from("/srv/app/uploads"));
        assert_eq!(config.database_path, PathBuf::from("/srv/app/videos.db"));
        assert_eq!(
            config.allowed_extensions,
            vec!["mp4", "mov", "avi", "mkv", "webm"]
        );
        assert_eq!(config.orphan_sweep_interval_seconds, 0);
    }

    #[test]
    fn file_values_are_read_and_env_wins() {
        let file: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 8080

            [uploads]
            upload_dir = "media"
            allowed_extensions = [".MP4", "webm"]
            max_file_size = 1024

            [maintenance]
            orphan_sweep_interval_seconds = 600
            "#,
        )
        .unwrap();

        let env: HashMap<&str, &str> =
            [("PORT", "9000"), ("DATABASE_PATH", "/var/lib/videos.db")].into();
        let config = Config::resolve(Path::new("/srv/app"), file, |key| {
            env.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.port, 9000);
        assert_eq!(config.upload_dir, PathBuf::from("/srv/app/media"));
        assert_eq!(config.database_path, PathBuf::from("/var/lib/videos.db"));
        assert_eq!(config.allowed_extensions, vec!["mp4", "webm"]);
        assert_eq!(config.max_file_size, 1024);
        assert_eq!(config.orphan_sweep_interval_seconds, 600);
        assert_eq!(config.orphan_grace_seconds, 3600);
    }

    #[test]
    fn unparsable_env_port_falls_back() {
        let config = Config::resolve(Path::new("/srv"), ConfigFile::default(), |key| {
            (key == "PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.port, 5000);
    }
}
