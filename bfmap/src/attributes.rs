use crate::tags::TagMap;

pub const MPH_TO_KPH: f64 = 1.609;

const ONEWAY_VALUES: [&str; 3] = ["yes", "true", "1"];

/// A way is one-way if it is part of a junction or roundabout, or if it is
/// explicitly tagged `oneway=yes|true|1`.
pub fn is_oneway(tags: &TagMap) -> bool {
    tags.contains_key("junction")
        || tags.contains_key("roundabout")
        || tags
            .get("oneway")
            .is_some_and(|value| ONEWAY_VALUES.contains(&value.as_str()))
}

/// Forward and backward speed limits in km/h.
///
/// `maxspeed:forward` and `maxspeed:backward` take precedence over the
/// generic `maxspeed` for their direction. `None` is written as NULL so the
/// consumer falls back to the class default.
pub fn maxspeed(tags: &TagMap) -> (Option<f64>, Option<f64>) {
    let generic = speed_tag(tags, "maxspeed");
    let forward = speed_tag(tags, "maxspeed:forward").or(generic);
    let backward = speed_tag(tags, "maxspeed:backward").or(generic);
    (forward, backward)
}

fn speed_tag(tags: &TagMap, key: &str) -> Option<f64> {
    tags.get(key).and_then(|value| parse_speed_limit(value))
}

/// Parse an OSM speed value. Plain integers are km/h; values containing
/// `mph` must have the number separated by a space (`"60 mph"`). Anything
/// else, `"60mph"` and `"none"` included, is unknown.
pub fn parse_speed_limit(value: &str) -> Option<f64> {
    if value.contains("mph") {
        let number = value.split(' ').next().unwrap_or_default();
        number
            .trim()
            .parse::<i64>()
            .ok()
            .map(|mph| mph as f64 * MPH_TO_KPH)
    } else {
        value.trim().parse::<i64>().ok().map(|kph| kph as f64)
    }
}
