use crate::models::DIETARY_PREFERENCES;

/// Fixed instruction sent with every image. The layout is what
/// [`crate::services::recipe_parser`] expects back.
pub const RECIPE_PROMPT: &str = "Analyze this image for ingredients that could be used in recipes. \
Usually the photo will be of a fridge and you are an expert image analyzer who will look at the \
entire image and detail all of the ingredients found. From those ingredients, suggest up to 5 \
possible recipes using only those ingredients and respond in EXACTLY this format:\n\
\n\
FOUND_INGREDIENTS:\n\
- ingredient1\n\
- ingredient2\n\
\n\
RECIPES_START\n\
RECIPE_1\n\
NAME: Recipe Name\n\
TIME: X minutes\n\
DIETARY: comma separated dietary labels that apply (e.g. Vegetarian, Gluten Free)\n\
INGREDIENTS:\n\
- ingredient1\n\
- ingredient2\n\
INSTRUCTIONS:\n\
- First step\n\
- Second step\n\
- Continue with all necessary steps in logical order\n\
- Include preparation, cooking temperatures, and timing\n\
- Add as many steps as needed to complete the recipe properly\n\
RECIPE_END\n\
\n\
RECIPE_2\n\
... (same format)\n\
RECIPE_3\n\
... (same format)\n\
RECIPE_4\n\
... (same format)\n\
RECIPE_5\n\
... (same format)\n\
RECIPES_END";

/// Builds the dietary hint for the configured preference ids.
///
/// Ids outside the catalog are ignored; labels follow catalog order so the
/// prompt is stable regardless of how the set was stored.
pub fn dietary_hint<'a, I>(preferences: I) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let selected: Vec<&String> = preferences.into_iter().collect();
    let labels: Vec<&str> = DIETARY_PREFERENCES
        .iter()
        .filter(|pref| selected.iter().any(|id| id.as_str() == pref.id))
        .map(|pref| pref.label)
        .collect();

    if labels.is_empty() {
        return None;
    }

    Some(format!(
        "The user follows these dietary preferences: {}. \
         Make sure at least the first 3 recipes satisfy all of them, \
         and list the matching labels on each recipe's DIETARY line.",
        labels.join(", ")
    ))
}

/// Full text part of the request: the template plus the optional hint.
pub fn build_prompt(dietary_hint: Option<&str>) -> String {
    match dietary_hint {
        Some(hint) => format!("{}\n\n{}", RECIPE_PROMPT, hint),
        None => RECIPE_PROMPT.to_string(),
    }
}
