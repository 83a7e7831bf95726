use anyhow::Result;
use kassa_db::models::ProviderKind;
use kassa_db::repositories::SettingsRepository;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

pub const MAINTENANCE: &str = "maintenance";
pub const REFILL_ENABLED: &str = "refill_enabled";
pub const SUPPORT: &str = "support";

pub fn way_key(kind: ProviderKind) -> String {
    format!("way_{}", kind.as_str())
}

/// Runtime toggles, cached in memory and written through to Postgres.
#[derive(Clone)]
pub struct SettingsService {
    repo: Option<SettingsRepository>,
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl SettingsService {
    pub fn new(repo: SettingsRepository) -> Self {
        Self {
            repo: Some(repo),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Cache-only instance.
    pub fn in_memory() -> Self {
        Self {
            repo: None,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn load(&self) -> Result<()> {
        if let Some(repo) = &self.repo {
            let rows = repo.get_all().await?;
            let mut cache = self.cache.write().await;
            cache.extend(rows);
        }
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.cache.read().await.get(key).cloned()
    }

    /// The cache is updated even when persisting fails.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.cache
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        if let Some(repo) = &self.repo {
            if let Err(e) = repo.set(key, value).await {
                warn!(key, error = %e, "setting not persisted");
                return Err(e);
            }
        }
        Ok(())
    }

    pub async fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key).await.as_deref() {
            Some("1" | "true" | "on") => true,
            Some("0" | "false" | "off") => false,
            _ => default,
        }
    }

    pub async fn set_flag(&self, key: &str, on: bool) -> Result<()> {
        self.set(key, if on { "true" } else { "false" }).await
    }

    pub async fn is_maintenance(&self) -> bool {
        self.flag(MAINTENANCE, false).await
    }

    pub async fn is_refill_enabled(&self) -> bool {
        self.flag(REFILL_ENABLED, true).await
    }

    pub async fn is_way_enabled(&self, kind: ProviderKind) -> bool {
        self.flag(&way_key(kind), true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flags_have_defaults() {
        let settings = SettingsService::in_memory();
        assert!(!settings.is_maintenance().await);
        assert!(settings.is_refill_enabled().await);
        assert!(settings.is_way_enabled(ProviderKind::Qiwi).await);
    }

    #[tokio::test]
    async fn flags_round_trip_through_cache() {
        let settings = SettingsService::in_memory();
        settings.set_flag(MAINTENANCE, true).await.unwrap();
        settings.set_flag(&way_key(ProviderKind::Yoomoney), false).await.unwrap();

        assert!(settings.is_maintenance().await);
        assert!(!settings.is_way_enabled(ProviderKind::Yoomoney).await);
        assert!(settings.is_way_enabled(ProviderKind::CactusPay).await);
    }

    #[tokio::test]
    async fn garbage_values_fall_back_to_default() {
        let settings = SettingsService::in_memory();
        settings.set(REFILL_ENABLED, "maybe").await.unwrap();
        assert!(settings.is_refill_enabled().await);
        assert_eq!(settings.get(SUPPORT).await, None);
    }
}
