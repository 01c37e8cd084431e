use serde::{Deserialize, Serialize};

use crate::entities::{categories, mods, ratings};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub icon: String,
    pub description: String,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            icon: model.icon,
            description: model.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mod {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub rating: f64,
    pub downloads: i64,
    pub icon: String,
    pub cloud_link: String,
    pub source_link: Option<String>,
    pub background_image: Option<String>,
    pub created_at: String,
}

impl From<mods::Model> for Mod {
    fn from(model: mods::Model) -> Self {
        Self {
            id: model.id,
            tags: decode_tags(&model.tags),
            name: model.name,
            description: model.description,
            category: model.category,
            rating: model.rating,
            downloads: model.downloads,
            icon: model.icon,
            cloud_link: model.cloud_link,
            source_link: model.source_link,
            background_image: model.background_image,
            created_at: model.created_at,
        }
    }
}

/// Tags are stored as a JSON array of strings. Anything else reads as no tags.
#[must_use]
pub fn decode_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[must_use]
pub fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Writable mod fields, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ModFields {
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub rating: Option<f64>,
    pub downloads: Option<i64>,
    pub icon: String,
    pub cloud_link: String,
    pub source_link: Option<String>,
    pub background_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: i32,
    pub mod_id: i32,
    pub user_id: i32,
    pub username: String,
    pub rating: i32,
    pub created_at: String,
}

impl From<ratings::Model> for Rating {
    fn from(model: ratings::Model) -> Self {
        Self {
            id: model.id,
            mod_id: model.mod_id,
            user_id: model.user_id,
            username: model.username,
            rating: model.rating,
            created_at: model.created_at,
        }
    }
}

/// Sort orders accepted by the mod listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModSort {
    #[default]
    Default,
    Rating,
    Downloads,
    Name,
}

impl std::str::FromStr for ModSort {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "rating" => Ok(Self::Rating),
            "downloads" => Ok(Self::Downloads),
            "name" => Ok(Self::Name),
            _ => Err(()),
        }
    }
}
