use serde::{Deserialize, Serialize};

/// Road-type configuration document, as stored in `road-types.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadTypesDocument {
    pub tags: Vec<TagDefinition>,
}

/// One classifying OSM tag key (e.g. `highway`) and the values it recognizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagDefinition {
    pub tag: String,
    #[serde(default)]
    pub values: Vec<ValueDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueDefinition {
    pub name: String,
    pub id: i32,
    #[serde(default = "default_priority")]
    pub priority: f64,
    /// Default speed limit in km/h, used downstream when a segment carries none.
    pub maxspeed: i32,
}

pub fn default_priority() -> f64 {
    1.0
}
