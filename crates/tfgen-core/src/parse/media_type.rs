use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::schema::SchemaOrRef;

/// A media type object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaOrRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
}

/// Pick the body media type the explorer reads from.
///
/// Preference order: `application/json`, any `+json` structured suffix, then
/// whatever comes first in the document.
pub fn preferred_media_type(content: &IndexMap<String, MediaType>) -> Option<(&String, &MediaType)> {
    content
        .get_key_value("application/json")
        .or_else(|| {
            content
                .iter()
                .find(|(content_type, _)| content_type.ends_with("+json"))
        })
        .or_else(|| content.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(types: &[&str]) -> IndexMap<String, MediaType> {
        types
            .iter()
            .map(|t| (t.to_string(), MediaType::default()))
            .collect()
    }

    #[test]
    fn prefers_application_json() {
        let c = content(&["text/plain", "application/merge-patch+json", "application/json"]);
        assert_eq!(preferred_media_type(&c).unwrap().0, "application/json");
    }

    #[test]
    fn falls_back_to_json_suffix_then_first() {
        let c = content(&["text/plain", "application/problem+json"]);
        assert_eq!(preferred_media_type(&c).unwrap().0, "application/problem+json");

        let c = content(&["text/plain", "application/xml"]);
        assert_eq!(preferred_media_type(&c).unwrap().0, "text/plain");

        assert!(preferred_media_type(&IndexMap::new()).is_none());
    }
}
