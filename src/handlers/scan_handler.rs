use anyhow::Result;
use std::sync::Arc;

use crate::models::HistoryItem;
use crate::services::{dietary_hint, inspect_response, HistoryStore, ImageInput, VisionService};

#[derive(Debug)]
pub enum ScanOutcome {
    Completed {
        item: HistoryItem,
        /// False when the reply had none of the expected markers, so an empty
        /// result means "unreadable answer" rather than "nothing edible".
        recognized: bool,
    },
    /// The model could not be queried; nothing was parsed or stored.
    AnalysisUnavailable(String),
}

pub struct ScanHandler {
    vision: Arc<dyn VisionService>,
    history: Arc<HistoryStore>,
}

impl ScanHandler {
    pub fn new(vision: Arc<dyn VisionService>, history: Arc<HistoryStore>) -> Self {
        Self { vision, history }
    }

    pub async fn scan(&self, image: &ImageInput) -> Result<ScanOutcome> {
        let preferences = self.history.get_preferences().await?;
        let hint = dietary_hint(&preferences);

        log::info!("📸 Starting scan (dietary preferences: {})", preferences.len());

        let reply = match self.vision.analyze(image, hint.as_deref()).await {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("❌ Image analysis failed: {:#}", e);
                return Ok(ScanOutcome::AnalysisUnavailable(e.to_string()));
            }
        };

        let parsed = inspect_response(&reply);
        if !parsed.recognized {
            log::warn!("⚠️ Model reply did not follow the recipe format: {}", reply);
        }
        log::info!(
            "✅ Parsed {} ingredients and {} recipes",
            parsed.result.found_ingredients.len(),
            parsed.result.recipes.len()
        );

        let item = self.history.append(parsed.result).await?;

        Ok(ScanOutcome::Completed {
            item,
            recognized: parsed.recognized,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::MemoryStorage;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// Canned vision service that records the hint it was called with.
    pub(crate) struct CannedVision {
        reply: Option<String>,
        pub hints: Mutex<Vec<Option<String>>>,
    }

    impl CannedVision {
        pub(crate) fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                hints: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                reply: None,
                hints: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl VisionService for CannedVision {
        async fn analyze(&self, _image: &ImageInput, dietary_hint: Option<&str>) -> Result<String> {
            self.hints.lock().unwrap().push(dietary_hint.map(str::to_string));
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => anyhow::bail!("OpenRouter API error (503): unavailable"),
            }
        }
    }

    const REPLY: &str = "FOUND_INGREDIENTS:\n- eggs\n- milk\n\nRECIPES_START\nRECIPE_1\nNAME: Scrambled Eggs\nTIME: 5 minutes\nINGREDIENTS:\n- eggs\nINSTRUCTIONS:\n- Stir\nRECIPE_END\nRECIPES_END";

    fn image() -> ImageInput {
        ImageInput::DataUri("data:image/jpeg;base64,aGVsbG8=".to_string())
    }

    fn history() -> Arc<HistoryStore> {
        Arc::new(HistoryStore::new(Arc::new(MemoryStorage::new())))
    }

    #[tokio::test]
    async fn test_scan_parses_and_stores() {
        let history = history();
        let handler = ScanHandler::new(Arc::new(CannedVision::replying(REPLY)), history.clone());

        let outcome = handler.scan(&image()).await.unwrap();

        let ScanOutcome::Completed { item, recognized } = outcome else {
            panic!("expected a completed scan");
        };
        assert!(recognized);
        assert_eq!(item.found_ingredients, vec!["eggs".to_string(), "milk".to_string()]);
        assert_eq!(item.recipes[0].title, "Scrambled Eggs");
        assert_eq!(history.list().await.unwrap(), vec![item]);
    }

    #[tokio::test]
    async fn test_upstream_failure_stores_nothing() {
        let history = history();
        let handler = ScanHandler::new(Arc::new(CannedVision::failing()), history.clone());

        let outcome = handler.scan(&image()).await.unwrap();

        assert!(matches!(outcome, ScanOutcome::AnalysisUnavailable(_)));
        assert!(history.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_reply_is_flagged() {
        let handler = ScanHandler::new(
            Arc::new(CannedVision::replying("Sorry, that is a cat.")),
            history(),
        );

        match handler.scan(&image()).await.unwrap() {
            ScanOutcome::Completed { item, recognized } => {
                assert!(!recognized);
                assert!(item.found_ingredients.is_empty());
                assert!(item.recipes.is_empty());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_preferences_become_hint() {
        let history = history();
        let prefs: BTreeSet<String> = ["vegetarian".to_string()].into_iter().collect();
        history.set_preferences(&prefs).await.unwrap();

        let vision = Arc::new(CannedVision::replying(REPLY));
        let handler = ScanHandler::new(vision.clone(), history);
        handler.scan(&image()).await.unwrap();

        let hints = vision.hints.lock().unwrap();
        assert!(hints[0].as_deref().unwrap().contains("Vegetarian"));
    }
}
