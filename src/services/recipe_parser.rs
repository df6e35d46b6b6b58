//! Turns the model's marker-delimited reply into a [`ScanResult`].
//!
//! The model is asked to answer in the block layout produced by
//! [`crate::services::prompt::RECIPE_PROMPT`], but nothing forces it to.
//! Every step here degrades to an empty value instead of failing.

use crate::models::{Recipe, ScanResult};

pub const FOUND_INGREDIENTS: &str = "FOUND_INGREDIENTS:";
pub const RECIPES_START: &str = "RECIPES_START";
pub const RECIPES_END: &str = "RECIPES_END";
pub const RECIPE_END: &str = "RECIPE_END";
const RECIPE_HEADER: &str = "RECIPE_";
const NAME: &str = "NAME:";
const TIME: &str = "TIME:";
const DIETARY: &str = "DIETARY:";
const INGREDIENTS: &str = "INGREDIENTS:";
const INSTRUCTIONS: &str = "INSTRUCTIONS:";

/// A parsed reply plus whether it looked like the requested layout at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub result: ScanResult,
    /// False when neither `FOUND_INGREDIENTS:` nor `RECIPES_START` occurs,
    /// i.e. the model ignored the template entirely.
    pub recognized: bool,
}

pub fn parse_response(text: &str) -> ScanResult {
    let found_ingredients: Vec<String> = between(text, FOUND_INGREDIENTS, RECIPES_START)
        .map(|section| dash_items(section).collect())
        .unwrap_or_default();

    let recipes: Vec<Recipe> = between(text, RECIPES_START, RECIPES_END)
        .map(|section| {
            recipe_blocks(section)
                .into_iter()
                .map(parse_recipe_block)
                .filter(|recipe| !recipe.title.is_empty())
                .collect()
        })
        .unwrap_or_default();

    ScanResult {
        found_ingredients,
        recipes,
    }
}

pub fn inspect_response(text: &str) -> ParsedResponse {
    ParsedResponse {
        result: parse_response(text),
        recognized: text.contains(FOUND_INGREDIENTS) || text.contains(RECIPES_START),
    }
}

fn parse_recipe_block(block: &str) -> Recipe {
    let title = field_value(block, NAME).unwrap_or_default().to_string();
    let cook_time = field_value(block, TIME).unwrap_or_default().to_string();

    let dietary_labels = field_value(block, DIETARY).and_then(|value| {
        let labels: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect();
        (!labels.is_empty()).then_some(labels)
    });

    let ingredients: Vec<String> = after(block, INGREDIENTS)
        .map(|rest| dash_items(until(rest, INSTRUCTIONS)).collect())
        .unwrap_or_default();

    let instructions: Vec<String> = after(block, INSTRUCTIONS)
        .map(|rest| {
            dash_items(until(rest, RECIPE_END))
                .filter(|step| !step.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Recipe {
        title,
        cook_time,
        ingredients,
        instructions,
        dietary_labels,
    }
}

/// Splits the recipes section on `RECIPE_<n>` header lines. Text before the
/// first header is kept as a block of its own (it simply has no title).
fn recipe_blocks(section: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in section.split_inclusive('\n') {
        let line_end = offset + line.len();
        if line.ends_with('\n') && is_recipe_header(line) {
            blocks.push(&section[start..offset]);
            start = line_end;
        }
        offset = line_end;
    }
    blocks.push(&section[start..]);

    blocks
        .into_iter()
        .filter(|block| !block.trim().is_empty())
        .collect()
}

/// A line ending in `RECIPE_<digits>`. Models often decorate the header
/// (`### RECIPE_1`, `**RECIPE_2`), so anything before it is allowed.
fn is_recipe_header(line: &str) -> bool {
    let line = line.trim_end();
    line.rfind(RECIPE_HEADER)
        .map(|idx| &line[idx + RECIPE_HEADER.len()..])
        .map(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Value on the same line as the first occurrence of `marker`, trimmed.
fn field_value<'a>(block: &'a str, marker: &str) -> Option<&'a str> {
    let rest = after(block, marker)?;
    let line = rest.split(['\n', '\r']).next().unwrap_or_default();
    Some(line.trim())
}

/// Items of every line whose trimmed form starts with a dash.
fn dash_items(section: &str) -> impl Iterator<Item = String> + '_ {
    section
        .lines()
        .filter_map(|line| line.trim().strip_prefix('-'))
        .map(|item| item.trim().to_string())
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let rest = after(text, start)?;
    rest.find(end).map(|idx| &rest[..idx])
}

fn after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    text.find(marker).map(|idx| &text[idx + marker.len()..])
}

fn until<'a>(text: &'a str, marker: &str) -> &'a str {
    text.find(marker).map_or(text, |idx| &text[..idx])
}
