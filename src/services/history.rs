use anyhow::{Context, Result};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::{HistoryItem, Recipe, SavedRecipe, ScanResult};

pub const HISTORY_KEY: &str = "scanHistory";
pub const PREFERENCES_KEY: &str = "dietaryPreferences";
pub const SAVED_RECIPES_KEY: &str = "savedRecipes";

/// Whole-value key/value persistence. Every write replaces the previous
/// snapshot for that key.
#[async_trait::async_trait]
pub trait SnapshotStorage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>>;
    async fn store(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process storage, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SnapshotStorage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn store(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Scan history, saved recipes and dietary preferences on top of a
/// [`SnapshotStorage`].
pub struct HistoryStore {
    storage: Arc<dyn SnapshotStorage>,
    // serialises read-modify-write of snapshots
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(storage: Arc<dyn SnapshotStorage>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn append(&self, result: ScanResult) -> Result<HistoryItem> {
        self.append_at(Utc::now().timestamp_millis(), result).await
    }

    async fn append_at(&self, now_millis: i64, result: ScanResult) -> Result<HistoryItem> {
        let _guard = self.write_lock.lock().await;
        let mut history: Vec<HistoryItem> = self.load_for_update(HISTORY_KEY).await?;

        // two scans within the same millisecond get consecutive ids
        let mut timestamp = now_millis;
        while history.iter().any(|item| item.id == timestamp.to_string()) {
            timestamp += 1;
        }

        let item = HistoryItem::new(timestamp, result);
        history.insert(0, item.clone());
        self.store_snapshot(HISTORY_KEY, &history).await?;

        log::info!(
            "📝 Saved scan {} ({} ingredients, {} recipes, {} in history)",
            item.id,
            item.found_ingredients.len(),
            item.recipes.len(),
            history.len()
        );
        Ok(item)
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<HistoryItem>> {
        self.load_snapshot(HISTORY_KEY).await
    }

    pub async fn clear_history(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store_snapshot(HISTORY_KEY, &Vec::<HistoryItem>::new()).await?;
        log::info!("🗑️ Scan history cleared");
        Ok(())
    }

    pub async fn get_preferences(&self) -> Result<BTreeSet<String>> {
        self.load_snapshot(PREFERENCES_KEY).await
    }

    pub async fn set_preferences(&self, preferences: &BTreeSet<String>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store_snapshot(PREFERENCES_KEY, preferences).await?;
        log::info!("🥗 Dietary preferences updated: {:?}", preferences);
        Ok(())
    }

    /// Bookmarks a recipe; an existing bookmark with the same title is replaced.
    pub async fn save_recipe(&self, recipe: Recipe) -> Result<SavedRecipe> {
        if recipe.title.trim().is_empty() {
            anyhow::bail!("Cannot save a recipe without a title");
        }

        let _guard = self.write_lock.lock().await;
        let mut saved: Vec<SavedRecipe> = self.load_for_update(SAVED_RECIPES_KEY).await?;
        saved.retain(|s| s.recipe.title != recipe.title);

        let entry = SavedRecipe {
            recipe,
            saved_at: Utc::now().timestamp_millis(),
        };
        saved.insert(0, entry.clone());
        self.store_snapshot(SAVED_RECIPES_KEY, &saved).await?;

        log::info!("⭐ Recipe saved: {}", entry.recipe.title);
        Ok(entry)
    }

    /// Newest first.
    pub async fn saved_recipes(&self) -> Result<Vec<SavedRecipe>> {
        self.load_snapshot(SAVED_RECIPES_KEY).await
    }

    pub async fn remove_saved_recipe(&self, title: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut saved: Vec<SavedRecipe> = self.load_for_update(SAVED_RECIPES_KEY).await?;
        let before = saved.len();
        saved.retain(|s| s.recipe.title != title);

        if saved.len() == before {
            return Ok(false);
        }

        self.store_snapshot(SAVED_RECIPES_KEY, &saved).await?;
        log::info!("🗑️ Saved recipe removed: {}", title);
        Ok(true)
    }

    /// Read-only access: a corrupt snapshot reads as empty.
    async fn load_snapshot<T>(&self, key: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let Some(raw) = self.storage.load(key).await? else {
            return Ok(T::default());
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                log::warn!("⚠️ Ignoring corrupt '{}' snapshot: {}", key, e);
                Ok(T::default())
            }
        }
    }

    /// Read before a rewrite. A corrupt snapshot is an error so it never
    /// gets replaced by an empty one.
    async fn load_for_update<T>(&self, key: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let Some(raw) = self.storage.load(key).await? else {
            return Ok(T::default());
        };

        serde_json::from_str(&raw)
            .with_context(|| format!("Refusing to overwrite corrupt '{}' snapshot", key))
    }

    async fn store_snapshot<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize '{}' snapshot", key))?;
        self.storage.store(key, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (Arc<MemoryStorage>, HistoryStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = HistoryStore::new(storage.clone());
        (storage, store)
    }

    fn scan(ingredient: &str) -> ScanResult {
        ScanResult {
            found_ingredients: vec![ingredient.to_string()],
            recipes: vec![Recipe {
                title: format!("{} pie", ingredient),
                ..Default::default()
            }],
        }
    }

    #[tokio::test]
    async fn test_append_is_newest_first() {
        let (_, store) = store();

        store.append_at(1_000, scan("apple")).await.unwrap();
        let second = store.append_at(2_000, scan("pear")).await.unwrap();

        assert_eq!(second.id, "2000");
        assert_eq!(second.timestamp, 2_000);

        let history = store.list().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].found_ingredients, vec!["pear".to_string()]);
        assert_eq!(history[1].found_ingredients, vec!["apple".to_string()]);
    }

    #[tokio::test]
    async fn test_same_millisecond_ids_are_unique() {
        let (_, store) = store();

        let first = store.append_at(5, scan("a")).await.unwrap();
        let second = store.append_at(5, scan("b")).await.unwrap();

        assert_eq!(first.id, "5");
        assert_eq!(second.id, "6");
    }

    #[tokio::test]
    async fn test_history_is_stored_as_snapshot() {
        let (storage, store) = store();
        store.append_at(7, scan("leek")).await.unwrap();

        let raw = storage.load(HISTORY_KEY).await.unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(json[0]["id"], "7");
        assert_eq!(json[0]["foundIngredients"][0], "leek");
        assert_eq!(json[0]["recipes"][0]["title"], "leek pie");
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_reads_as_empty() {
        let (storage, store) = store();
        storage.store(HISTORY_KEY, "{not json").await.unwrap();

        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_history_is_not_overwritten() {
        let (storage, store) = store();
        let raw = r#"[{"id":"1","timestamp":1,"foundIngredients":[],"recipes":[]},{"id":"2"}]"#;
        storage.store(HISTORY_KEY, raw).await.unwrap();

        assert!(store.append(scan("kale")).await.is_err());
        assert_eq!(storage.load(HISTORY_KEY).await.unwrap().as_deref(), Some(raw));
    }

    #[tokio::test]
    async fn test_corrupt_saved_recipes_are_not_overwritten() {
        let (storage, store) = store();
        storage.store(SAVED_RECIPES_KEY, "[{\"title\":1}]").await.unwrap();

        let recipe = Recipe {
            title: "Soup".to_string(),
            ..Default::default()
        };
        assert!(store.save_recipe(recipe).await.is_err());
        assert!(store.remove_saved_recipe("Soup").await.is_err());
        assert_eq!(
            storage.load(SAVED_RECIPES_KEY).await.unwrap().as_deref(),
            Some("[{\"title\":1}]")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_keep_every_item() {
        let (_, store) = store();
        let store = Arc::new(store);

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.append(scan(&format!("item{}", i))).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let history = store.list().await.unwrap();
        assert_eq!(history.len(), 20);

        let ids: BTreeSet<&str> = history.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let (_, store) = store();
        store.append(scan("fig")).await.unwrap();

        store.clear_history().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preferences_roundtrip() {
        let (_, store) = store();
        assert!(store.get_preferences().await.unwrap().is_empty());

        let prefs: BTreeSet<String> = ["vegan".to_string(), "keto".to_string()].into_iter().collect();
        store.set_preferences(&prefs).await.unwrap();

        assert_eq!(store.get_preferences().await.unwrap(), prefs);
    }

    #[tokio::test]
    async fn test_saved_recipes_replace_by_title() {
        let (_, store) = store();

        let mut recipe = Recipe {
            title: "Pancakes".to_string(),
            cook_time: "20 minutes".to_string(),
            ..Default::default()
        };
        store.save_recipe(recipe.clone()).await.unwrap();
        store
            .save_recipe(Recipe {
                title: "Salad".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        recipe.cook_time = "25 minutes".to_string();
        store.save_recipe(recipe).await.unwrap();

        let saved = store.saved_recipes().await.unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].recipe.title, "Pancakes");
        assert_eq!(saved[0].recipe.cook_time, "25 minutes");
        assert_eq!(saved[1].recipe.title, "Salad");
    }

    #[tokio::test]
    async fn test_remove_saved_recipe() {
        let (_, store) = store();
        store
            .save_recipe(Recipe {
                title: "Soup".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(store.remove_saved_recipe("Soup").await.unwrap());
        assert!(!store.remove_saved_recipe("Soup").await.unwrap());
        assert!(store.saved_recipes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_untitled_recipe_cannot_be_saved() {
        let (_, store) = store();
        assert!(store.save_recipe(Recipe::default()).await.is_err());
    }
}
