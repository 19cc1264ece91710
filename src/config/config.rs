use crate::data::column_order::ColumnPins;
use crate::services::structure_service::{OrphanPolicy, TreeOptions};
use crate::state::navigation::NavigationDefaults;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variables that override values from the config file
pub const ENV_API_TOKEN: &str = "GRID_SYNC_API_TOKEN";
pub const ENV_EXPORT_CLIENT_ID: &str = "GRID_SYNC_EXPORT_CLIENT_ID";
pub const ENV_EXPORT_CLIENT_SECRET: &str = "GRID_SYNC_EXPORT_CLIENT_SECRET";
pub const ENV_EXPORT_DATASET_ID: &str = "GRID_SYNC_EXPORT_DATASET_ID";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub navigation: NavigationConfig,
    pub tree: TreeConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the document store REST API
    pub base_url: String,

    /// Base URL used to build browser links to documents
    pub browser_url: String,

    /// Bearer token. Prefer the environment variable over storing it here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Document opened on start
    pub default_document_id: String,

    /// Table opened on start
    pub default_table_id: String,

    /// Column ids shown first, per table id
    pub pinned_columns: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Deepest page level shown, root pages are level 0. Unset shows all levels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    /// "hide" or "unfiled"
    pub orphans: OrphanPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// OAuth token endpoint of the analytics store
    pub auth_url: String,

    /// Base URL of the analytics store API
    pub api_base_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is not set
    pub filter: String,

    /// Also write logs to a file in the data directory
    pub log_to_file: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://coda.io/apis/v1".to_string(),
            browser_url: "https://coda.io".to_string(),
            token: None,
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        let default_table_id = "grid-AugbPR9_CK".to_string();
        let mut pinned_columns = HashMap::new();
        pinned_columns.insert(
            default_table_id.clone(),
            [
                "c-tPm_VB9vIS",
                "c-ALBQZX2Wa9",
                "c-eXa5blRRhA",
                "c-wU3aA-DtG1",
                "c-EFovGRleen",
                "c-7A2xbfGGmf",
            ]
            .iter()
            .map(|id| id.to_string())
            .collect(),
        );

        Self {
            default_document_id: "aICF0Nr9qq".to_string(),
            default_table_id,
            pinned_columns,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            auth_url: "https://api.domo.com/oauth/token".to_string(),
            api_base_url: "https://api.domo.com/v1".to_string(),
            client_id: None,
            client_secret: None,
            dataset_id: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            log_to_file: true,
        }
    }
}

impl From<&TreeConfig> for TreeOptions {
    fn from(config: &TreeConfig) -> Self {
        TreeOptions {
            max_depth: config.max_depth,
            orphans: config.orphans,
        }
    }
}

impl NavigationConfig {
    pub fn defaults(&self) -> NavigationDefaults {
        NavigationDefaults {
            document_id: self.default_document_id.clone(),
            table_id: self.default_table_id.clone(),
        }
    }

    pub fn pins(&self) -> ColumnPins {
        ColumnPins::new(self.pinned_columns.clone())
    }
}

impl Config {
    /// Load config from the default location, creating it on first run.
    /// A `.env` file and the environment override file values.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let config_path = Self::get_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let default_config = Self::default();
            default_config.save_to(&config_path)?;
            default_config
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Apply overrides from a key lookup, normally the process environment
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(ENV_API_TOKEN) {
            self.api.token = Some(token);
        }
        if let Some(id) = non_empty(ENV_EXPORT_CLIENT_ID) {
            self.export.client_id = Some(id);
        }
        if let Some(secret) = non_empty(ENV_EXPORT_CLIENT_SECRET) {
            self.export.client_secret = Some(secret);
        }
        if let Some(dataset) = non_empty(ENV_EXPORT_DATASET_ID) {
            self.export.dataset_id = Some(dataset);
        }
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("grid-sync").join("config.toml"))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# grid-sync configuration file
# Location: ~/.config/grid-sync/config.toml (Linux)
#           ~/Library/Application Support/grid-sync/config.toml (macOS)
#           %APPDATA%\grid-sync\config.toml (Windows)

[api]
base_url = "https://coda.io/apis/v1"
browser_url = "https://coda.io"
# The token is best supplied through GRID_SYNC_API_TOKEN (or a .env file)
# token = "..."

[navigation]
# Document and table opened on start
default_document_id = "aICF0Nr9qq"
default_table_id = "grid-AugbPR9_CK"

# Columns shown first, per table. Other columns follow in API order.
[navigation.pinned_columns]
grid-AugbPR9_CK = ["c-tPm_VB9vIS", "c-ALBQZX2Wa9", "c-eXa5blRRhA", "c-wU3aA-DtG1", "c-EFovGRleen", "c-7A2xbfGGmf"]

[tree]
# Deepest page level shown in the structure view (root pages are level 0).
# Leave unset to show every level.
# max_depth = 1

# Pages and tables whose parent cannot be resolved: "hide" or "unfiled"
orphans = "hide"

[export]
auth_url = "https://api.domo.com/oauth/token"
api_base_url = "https://api.domo.com/v1"
# Prefer GRID_SYNC_EXPORT_CLIENT_ID / _CLIENT_SECRET / _DATASET_ID
# client_id = "..."
# client_secret = "..."
# dataset_id = "..."

[logging]
# Used when RUST_LOG is not set
filter = "info"
log_to_file = true
"#
        .to_string()
    }
}
