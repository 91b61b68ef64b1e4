use serde::Deserialize;

/// Pitstop runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// SQLite database path
    pub db_path: String,
    /// Recognition workflow trigger URL
    pub workflow_url: Option<String>,
    /// Shared secret the workflow validates
    pub workflow_secret: Option<String>,
    /// Optional status URL template with an `{execution_id}` placeholder
    pub workflow_status_template: Option<String>,
    /// Optional vision API key forwarded on status polls
    pub vision_api_key: Option<String>,
    /// Optional cloud folder id forwarded on status polls
    pub vision_folder_id: Option<String>,
    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            db_path: "pitstop.db".to_string(),
            workflow_url: None,
            workflow_secret: None,
            workflow_status_template: None,
            vision_api_key: None,
            vision_folder_id: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: std::env::var("PITSTOP_BIND").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PITSTOP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            db_path: std::env::var("PITSTOP_DB").unwrap_or_else(|_| "pitstop.db".to_string()),
            workflow_url: std::env::var("WORKFLOW_OCR_URL").ok(),
            workflow_secret: std::env::var("WORKFLOW_OCR_SECRET").ok(),
            workflow_status_template: std::env::var("WORKFLOW_OCR_STATUS_TEMPLATE").ok(),
            vision_api_key: std::env::var("VISION_API_KEY").ok(),
            vision_folder_id: std::env::var("VISION_FOLDER_ID").ok(),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}
