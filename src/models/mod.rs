use serde::{Deserialize, Serialize};

/// One recipe suggestion parsed out of a model reply.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub title: String,
    pub cook_time: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub found_ingredients: Vec<String>,
    pub recipes: Vec<Recipe>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.found_ingredients.is_empty() && self.recipes.is_empty()
    }
}

/// A scan result as stored in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub timestamp: i64, // epoch millis
    pub found_ingredients: Vec<String>,
    pub recipes: Vec<Recipe>,
}

impl HistoryItem {
    pub fn new(timestamp: i64, result: ScanResult) -> Self {
        Self {
            id: timestamp.to_string(),
            timestamp,
            found_ingredients: result.found_ingredients,
            recipes: result.recipes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub saved_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DietaryPreference {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub const DIETARY_PREFERENCES: [DietaryPreference; 6] = [
    DietaryPreference {
        id: "vegetarian",
        label: "Vegetarian",
        description: "No meat or fish",
    },
    DietaryPreference {
        id: "vegan",
        label: "Vegan",
        description: "No animal products",
    },
    DietaryPreference {
        id: "gluten-free",
        label: "Gluten Free",
        description: "No wheat, barley or rye",
    },
    DietaryPreference {
        id: "dairy-free",
        label: "Dairy Free",
        description: "No milk, cheese or butter",
    },
    DietaryPreference {
        id: "keto",
        label: "Keto",
        description: "Very low carb, high fat",
    },
    DietaryPreference {
        id: "low-carb",
        label: "Low Carb",
        description: "Reduced carbohydrates",
    },
];

impl DietaryPreference {
    pub fn find(id: &str) -> Option<&'static DietaryPreference> {
        DIETARY_PREFERENCES.iter().find(|p| p.id == id)
    }
}

impl std::fmt::Display for DietaryPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}
