// src/models/core.rs

use serde::{Deserialize, Serialize};

/// A single entity record pulled from an upstream store (patent assignee table,
/// corporate filing, conference exhibitor list, ...). Every field is optional:
/// real records routinely arrive with nothing but a name, or nothing at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Free-text entity name. May contain encoding artifacts and punctuation noise.
    #[serde(default)]
    pub raw_name: Option<String>,

    /// Country code as recorded upstream. Possibly NULL, mixed-case, or a
    /// legacy three-letter code.
    #[serde(default)]
    pub country_code: Option<String>,

    /// Free-text address components (city/region/country strings).
    #[serde(default)]
    pub address_fields: Vec<String>,

    /// Which upstream dataset produced this record. Provenance only; never
    /// consulted by the classifier.
    #[serde(default)]
    pub record_source: Option<String>,
}

impl EntityRecord {
    /// True when no classifiable field is populated.
    pub fn is_empty(&self) -> bool {
        self.raw_name.as_deref().map_or(true, |n| n.trim().is_empty())
            && self.country_code.as_deref().map_or(true, |c| c.trim().is_empty())
            && self.address_fields.iter().all(|a| a.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_detection() {
        let record = EntityRecord::default();
        assert!(record.is_empty());

        let record = EntityRecord {
            raw_name: Some("   ".to_string()),
            country_code: Some("".to_string()),
            ..Default::default()
        };
        assert!(record.is_empty());

        let record = EntityRecord {
            raw_name: Some("Beijing Acme".to_string()),
            ..Default::default()
        };
        assert!(!record.is_empty());
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let record: EntityRecord = serde_json::from_str(r#"{"raw_name": "Acme Corp"}"#).unwrap();
        assert_eq!(record.raw_name.as_deref(), Some("Acme Corp"));
        assert!(record.country_code.is_none());
        assert!(record.address_fields.is_empty());

        let record: EntityRecord = serde_json::from_str("{}").unwrap();
        assert!(record.is_empty());
    }
}
