use anyhow::Result;
use rusqlite::{params, OptionalExtension};

use crate::db::{models::PermissionState, Database};
use crate::language::Language;

const DARK_MODE_KEY: &str = "dark_mode";
const PERMISSIONS_KEY: &str = "permissions";
const ONBOARDING_SEEN_KEY: &str = "onboarding_seen";
const LANGUAGE_KEY: &str = "language";

impl Database {
    async fn set_flag(&self, key: &'static str, value: String) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO app_flags (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_flag(&self, key: &'static str) -> Result<Option<String>> {
        self.execute(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM app_flags WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    pub async fn set_dark_mode(&self, enabled: bool) -> Result<()> {
        self.set_flag(DARK_MODE_KEY, enabled.to_string()).await
    }

    pub async fn dark_mode(&self) -> Result<bool> {
        Ok(self
            .get_flag(DARK_MODE_KEY)
            .await?
            .map(|value| value == "true")
            .unwrap_or(false))
    }

    pub async fn set_permissions(&self, state: &PermissionState) -> Result<()> {
        self.set_flag(PERMISSIONS_KEY, serde_json::to_string(state)?)
            .await
    }

    pub async fn permissions(&self) -> Result<PermissionState> {
        let raw = self.get_flag(PERMISSIONS_KEY).await?;
        Ok(raw
            .and_then(|value| serde_json::from_str(&value).ok())
            .unwrap_or_default())
    }

    pub async fn set_onboarding_seen(&self, seen: bool) -> Result<()> {
        self.set_flag(ONBOARDING_SEEN_KEY, seen.to_string()).await
    }

    pub async fn onboarding_seen(&self) -> Result<bool> {
        Ok(self
            .get_flag(ONBOARDING_SEEN_KEY)
            .await?
            .map(|value| value == "true")
            .unwrap_or(false))
    }

    pub async fn set_language(&self, language: Language) -> Result<()> {
        self.set_flag(LANGUAGE_KEY, language.tag().to_string())
            .await
    }

    /// `None` when no choice has been stored or the stored tag is not
    /// one we recognise.
    pub async fn language(&self) -> Result<Option<Language>> {
        Ok(self
            .get_flag(LANGUAGE_KEY)
            .await?
            .and_then(|tag| Language::from_tag(&tag)))
    }
}
