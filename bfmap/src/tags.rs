use std::collections::HashMap;

/// OSM tags of a single way, keyed by tag name.
pub type TagMap = HashMap<String, String>;

const PAIR_DELIMITER: &str = "\", \"";
const KEY_VALUE_DELIMITER: &str = "\"=>\"";

/// Parse the text form of an hstore column: `"k"=>"v", "k2"=>"v2"`.
///
/// There is no escaping: a value that itself contains `", "` is split in the
/// wrong place. Fragments without a `"=>"` separator (such as `"k"=>NULL`)
/// are dropped.
pub fn parse_tags(blob: &str) -> TagMap {
    let inner = strip_quotes(blob.trim());
    if inner.is_empty() {
        return TagMap::new();
    }

    inner
        .split(PAIR_DELIMITER)
        .filter_map(|pair| pair.split_once(KEY_VALUE_DELIMITER))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

// Strip one layer of surrounding double quotes.
fn strip_quotes(text: &str) -> &str {
    let text = text.strip_prefix('"').unwrap_or(text);
    text.strip_suffix('"').unwrap_or(text)
}
