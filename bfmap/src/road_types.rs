use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

use shared::RoadTypesDocument;

use crate::tags::TagMap;

#[derive(Debug, thiserror::Error)]
pub enum RoadTypesError {
    #[error("failed to read road type configuration: {0}")]
    Io(#[from] io::Error),
    #[error("invalid road type configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Attributes attached to every segment of a classified way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadType {
    pub class_id: i32,
    pub priority: f64,
    pub default_maxspeed: i32,
}

/// Result of matching a way's tags against the configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadClass<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub road_type: RoadType,
}

#[derive(Debug, Clone)]
struct TagClasses {
    tag: String,
    values: HashMap<String, RoadType>,
}

/// Classification table, immutable once loaded.
///
/// Tag keys keep the order of the configuration document. That order decides
/// which tag wins when a way carries several classifiable tags.
#[derive(Debug, Clone, Default)]
pub struct RoadTypes {
    tags: Vec<TagClasses>,
}

impl RoadTypes {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RoadTypesError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RoadTypesError> {
        let document: RoadTypesDocument = serde_json::from_reader(reader)?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: RoadTypesDocument) -> Self {
        let mut road_types = Self::default();
        for definition in document.tags {
            let values = definition
                .values
                .into_iter()
                .map(|value| {
                    let road_type = RoadType {
                        class_id: value.id,
                        priority: value.priority,
                        default_maxspeed: value.maxspeed,
                    };
                    (value.name, road_type)
                })
                .collect();
            road_types.insert(definition.tag, values);
        }
        road_types
    }

    /// Register the values of a tag key. A repeated key replaces the earlier
    /// values in place.
    pub fn insert(&mut self, tag: impl Into<String>, values: HashMap<String, RoadType>) {
        let tag = tag.into();
        match self.tags.iter_mut().find(|entry| entry.tag == tag) {
            Some(entry) => entry.values = values,
            None => self.tags.push(TagClasses { tag, values }),
        }
    }

    pub fn len(&self) -> usize {
        self.tags.iter().map(|entry| entry.values.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick the road class of a way. The last configured tag that matches wins;
    /// `None` means the way is not a road of interest.
    pub fn classify<'a>(&'a self, tags: &'a TagMap) -> Option<RoadClass<'a>> {
        self.tags
            .iter()
            .filter_map(|entry| {
                let (value, road_type) = tags
                    .get(&entry.tag)
                    .and_then(|value| entry.values.get_key_value(value.as_str()))?;
                Some(RoadClass {
                    key: entry.tag.as_str(),
                    value: value.as_str(),
                    road_type: *road_type,
                })
            })
            .last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trunk_config() -> RoadTypes {
        let mut road_types = RoadTypes::default();
        road_types.insert(
            "highway",
            HashMap::from([
                (
                    "trunk".to_string(),
                    RoadType {
                        class_id: 101,
                        priority: 1.0,
                        default_maxspeed: 120,
                    },
                ),
                (
                    "teriary".to_string(),
                    RoadType {
                        class_id: 102,
                        priority: 1.0,
                        default_maxspeed: 120,
                    },
                ),
            ]),
        );
        road_types
    }

    fn tags(pairs: &[(&str, &str)]) -> TagMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn class_of(config: &RoadTypes, key: &str, value: &str) -> Option<RoadType> {
        let way_tags = tags(&[(key, value)]);
        config.classify(&way_tags).map(|class| class.road_type)
    }

    #[test]
    fn classifies_known_value() {
        let config = trunk_config();
        let way_tags = tags(&[("highway", "trunk"), ("lanes", "2")]);

        let class = config.classify(&way_tags).expect("trunk is configured");
        assert_eq!(class.key, "highway");
        assert_eq!(class.value, "trunk");
        assert_eq!(class.road_type.class_id, 101);
    }

    #[test]
    fn unknown_value_is_unclassified() {
        let config = trunk_config();
        let way_tags = tags(&[("highway", "primary"), ("lanes", "2")]);
        assert!(config.classify(&way_tags).is_none());
    }

    #[test]
    fn last_configured_tag_wins() {
        let json = r#"{"tags": [
            {"tag": "highway", "values": [{"name": "primary", "id": 106, "priority": 1.1, "maxspeed": 70}]},
            {"tag": "railway", "values": [{"name": "tram", "id": 201, "priority": 1.0, "maxspeed": 50}]}
        ]}"#;
        let config = RoadTypes::from_reader(json.as_bytes()).unwrap();
        let way_tags = tags(&[("railway", "tram"), ("highway", "primary")]);

        let class = config.classify(&way_tags).unwrap();
        assert_eq!(class.key, "railway");
        assert_eq!(class.road_type.class_id, 201);
    }

    #[test]
    fn repeated_tag_replaces_values() {
        let json = r#"{"tags": [
            {"tag": "highway", "values": [{"name": "primary", "id": 106, "priority": 1.1, "maxspeed": 70}]},
            {"tag": "highway", "values": [{"name": "secondary", "id": 108, "priority": 1.5, "maxspeed": 60}]}
        ]}"#;
        let config = RoadTypes::from_reader(json.as_bytes()).unwrap();

        assert_eq!(config.len(), 1);
        assert!(class_of(&config, "highway", "primary").is_none());
        assert_eq!(class_of(&config, "highway", "secondary").unwrap().class_id, 108);
    }

    #[test]
    fn loads_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"tags": [{{"tag": "highway", "values": [{{"name": "trunk", "id": 101, "priority": 1.0, "maxspeed": 120}}]}}]}}"#
        )
        .unwrap();

        let config = RoadTypes::from_file(file.path()).unwrap();
        assert_eq!(
            class_of(&config, "highway", "trunk"),
            Some(RoadType {
                class_id: 101,
                priority: 1.0,
                default_maxspeed: 120,
            })
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = RoadTypes::from_file("/nonexistent/road-types.json").unwrap_err();
        assert!(matches!(err, RoadTypesError::Io(_)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = RoadTypes::from_reader("{\"tags\": [".as_bytes()).unwrap_err();
        assert!(matches!(err, RoadTypesError::Parse(_)));
    }

    #[test]
    fn bundled_configuration_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../config/road-types.json");
        let config = RoadTypes::from_file(path).unwrap();
        assert!(!config.is_empty());
        assert!(class_of(&config, "highway", "motorway").is_some());
    }
}
