use std::path::PathBuf;

use serde::Deserialize;

/// Connection settings for the remote document backend. Injected at
/// construction; nothing reads these from ambient globals.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub api_key: String,
    pub project_id: String,
    pub app_id: String,
}

impl RemoteConfig {
    /// Collection holding one user's daily records, one document per day.
    pub fn collection_path(&self, user_scope: &str) -> String {
        format!(
            "artifacts/{}/users/{}/daily-records",
            self.app_id, user_scope
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    /// Where last-viewed month / last-selected date are persisted.
    pub prefs_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let remote = RemoteConfig {
            api_key: std::env::var("ONIGIRI_API_KEY")?,
            project_id: std::env::var("ONIGIRI_PROJECT_ID")?,
            app_id: std::env::var("ONIGIRI_APP_ID")?,
        };
        let prefs_path = std::env::var("ONIGIRI_PREFS_PATH")
            .unwrap_or_else(|_| "onigiri-note-prefs.json".into())
            .into();
        Ok(Self { remote, prefs_path })
    }

    /// Placeholder configuration for in-memory sessions and tests.
    pub fn fake() -> Self {
        Self {
            remote: RemoteConfig {
                api_key: "fake".into(),
                project_id: "fake".into(),
                app_id: "fake".into(),
            },
            prefs_path: std::env::temp_dir().join("onigiri-note-prefs.json"),
        }
    }
}
