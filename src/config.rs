use serde::{Deserialize, Serialize};

use std::{env, fs, path::Path, path::PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    pub document_store: DocumentStoreConfig,
    pub blob_store: BlobStoreConfig,
    /// Run the image consistency repair pass on this interval. Disabled when unset.
    #[serde(default)]
    pub reconcile_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentStoreConfig {
    Postgres {
        dsn: String,
    },
    Firestore {
        project_id: String,
        #[serde(default = "default_firestore_database")]
        database: String,
        #[serde(default = "default_collection")]
        collection: String,
        #[serde(default = "default_firestore_endpoint")]
        endpoint: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        auth_token: Option<String>,
    },
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlobStoreConfig {
    Firebase {
        bucket: String,
        #[serde(default = "default_storage_endpoint")]
        endpoint: String,
        #[serde(default)]
        auth_token: Option<String>,
    },
    Filesystem {
        root: PathBuf,
        #[serde(default)]
        public_base_url: Option<String>,
    },
    Memory,
}

const fn default_http_port() -> u16 {
    8000
}

fn default_firestore_database() -> String {
    "(default)".to_string()
}

fn default_collection() -> String {
    "notes".to_string()
}

fn default_firestore_endpoint() -> String {
    "https://firestore.googleapis.com".to_string()
}

fn default_storage_endpoint() -> String {
    "https://firebasestorage.googleapis.com".to_string()
}

pub fn parse_config(contents: &str) -> Result<Config, Box<dyn std::error::Error>> {
    serde_yaml::from_str(contents).map_err(Into::into)
}

fn read_config(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn load_from_env() -> Result<Config, Box<dyn std::error::Error>> {
    let http_port = match non_empty_var("HTTP_PORT") {
        Some(port) => port
            .parse::<u16>()
            .map_err(|e| format!("Failed to parse HTTP_PORT: {e}"))?,
        None => default_http_port(),
    };

    let document_store = if let Some(dsn) = non_empty_var("PG_DSN") {
        DocumentStoreConfig::Postgres { dsn }
    } else if let Some(project_id) = non_empty_var("FIRESTORE_PROJECT_ID") {
        DocumentStoreConfig::Firestore {
            project_id,
            database: default_firestore_database(),
            collection: default_collection(),
            endpoint: non_empty_var("FIRESTORE_ENDPOINT")
                .unwrap_or_else(default_firestore_endpoint),
            api_key: non_empty_var("FIREBASE_API_KEY"),
            auth_token: non_empty_var("FIREBASE_AUTH_TOKEN"),
        }
    } else {
        tracing::warn!("Neither PG_DSN nor FIRESTORE_PROJECT_ID is set, notes are kept in memory");
        DocumentStoreConfig::Memory
    };

    let blob_store = if let Some(bucket) = non_empty_var("FIREBASE_STORAGE_BUCKET") {
        BlobStoreConfig::Firebase {
            bucket,
            endpoint: non_empty_var("FIREBASE_STORAGE_ENDPOINT")
                .unwrap_or_else(default_storage_endpoint),
            auth_token: non_empty_var("FIREBASE_AUTH_TOKEN"),
        }
    } else if let Some(root) = non_empty_var("BLOB_STORAGE_PATH") {
        BlobStoreConfig::Filesystem {
            root: PathBuf::from(root),
            public_base_url: non_empty_var("BLOB_PUBLIC_BASE_URL"),
        }
    } else {
        tracing::warn!(
            "Neither FIREBASE_STORAGE_BUCKET nor BLOB_STORAGE_PATH is set, images are kept in memory"
        );
        BlobStoreConfig::Memory
    };

    let reconcile_interval_secs = match non_empty_var("RECONCILE_INTERVAL_SECS") {
        Some(secs) => Some(
            secs.parse::<u64>()
                .map_err(|e| format!("Failed to parse RECONCILE_INTERVAL_SECS: {e}"))?,
        ),
        None => None,
    };

    Ok(Config {
        http_port,
        document_store,
        blob_store,
        reconcile_interval_secs,
    })
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    // Retrieve env variable
    let config_path = env::var("NOTEBOOK_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    // Try env path
    if Path::new(&config_path).exists() {
        return read_config(&config_path);
    }

    // Fallback to config.yaml
    if Path::new("config.yaml").exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path
        );
        return read_config("config.yaml");
    }

    // Fallback to config.example.yaml
    if Path::new("config.example.yaml").exists() {
        tracing::warn!(
            "Config file '{}' and 'config.yaml' not found, falling back to 'config.example.yaml'\
             \n This file should not be used and should be replaced with actual data",
            config_path
        );
        return read_config("config.example.yaml");
    }

    // Fallback to environment variables
    tracing::info!(
        "No config file found, attempting to load configuration from environment variables"
    );
    load_from_env().map_err(|e| {
        format!(
            "Config file not found and environment variables are invalid. \
             Tried: '{config_path}', 'config.yaml', 'config.example.yaml', and environment variables. \
             Error: {e}"
        )
        .into()
    })
}
