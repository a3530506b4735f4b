//! Input tree model.
//!
//! Nested nodes as they arrive from the dataset JSON. Both the older
//! `strain`/`attr` field names and the newer `name`/`node_attrs` names are
//! accepted.

use std::collections::HashMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// Value of a node trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitValue {
    /// Plain number, e.g. `"div": 0.0021`.
    Number(f64),
    /// Two-element interval, e.g. `"num_date_confidence": [2015.2, 2015.9]`.
    Interval([f64; 2]),
    /// Value object, e.g. `"num_date": {"value": 2015.5, "confidence": [2015.2, 2015.9]}`.
    Measured {
        value: f64,
        #[serde(default, deserialize_with = "interval_or_none")]
        confidence: Option<[f64; 2]>,
    },
    /// Categorical value object, e.g. `"region": {"value": "Asia", "confidence": {"Asia": 0.9}}`.
    /// The confidence map is not kept.
    Labelled { value: String },
    /// Categorical value.
    Text(String),
}

/// Reads a `[lo, hi]` confidence; any other shape (e.g. a map of
/// probabilities) reads as `None`.
fn interval_or_none<'de, D>(deserializer: D) -> Result<Option<[f64; 2]>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Confidence {
        Interval([f64; 2]),
        Other(IgnoredAny),
    }

    Ok(match Option::<Confidence>::deserialize(deserializer)? {
        Some(Confidence::Interval(interval)) => Some(interval),
        Some(Confidence::Other(_)) | None => None,
    })
}

impl TraitValue {
    /// Numeric value, if this trait is numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TraitValue::Number(value) | TraitValue::Measured { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Inline confidence interval.
    pub fn confidence(&self) -> Option<[f64; 2]> {
        match self {
            TraitValue::Measured { confidence, .. } => *confidence,
            _ => None,
        }
    }

    /// Interval value.
    pub fn as_interval(&self) -> Option<[f64; 2]> {
        match self {
            TraitValue::Interval(interval) => Some(*interval),
            _ => None,
        }
    }

    /// Text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TraitValue::Text(text) | TraitValue::Labelled { value: text } => Some(text),
            _ => None,
        }
    }
}

/// A node of the input tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(alias = "strain")]
    pub name: String,
    #[serde(default)]
    pub children: Vec<TreeNode>,
    #[serde(default, alias = "attr")]
    pub node_attrs: HashMap<String, TraitValue>,
    /// Vertical ordering assigned by an upstream pass.
    pub yvalue: f64,
}

impl TreeNode {
    /// Create a childless node.
    pub fn new(name: impl Into<String>, yvalue: f64) -> Self {
        Self {
            name: name.into(),
            yvalue,
            ..Default::default()
        }
    }

    /// Add a numeric trait.
    pub fn with_trait(mut self, key: &str, value: f64) -> Self {
        self.node_attrs.insert(key.to_string(), TraitValue::Number(value));
        self
    }

    /// Add a trait of any kind.
    pub fn with_value(mut self, key: &str, value: TraitValue) -> Self {
        self.node_attrs.insert(key.to_string(), value);
        self
    }

    /// Replace the children.
    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = children;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_node_attrs() {
        let json = r#"{
            "name": "root",
            "yvalue": 1.5,
            "node_attrs": {
                "div": 0.0,
                "num_date": {"value": 2014.2, "confidence": [2013.9, 2014.4]},
                "clade_name": "A1"
            },
            "children": [
                {"name": "a", "yvalue": 1.0, "node_attrs": {"div": 0.1}},
                {"name": "b", "yvalue": 2.0, "node_attrs": {"div": 0.2}}
            ]
        }"#;
        let node: TreeNode = serde_json::from_str(json).unwrap();

        assert_eq!(node.children.len(), 2);
        assert_eq!(node.node_attrs["div"].as_number(), Some(0.0));
        assert_eq!(node.node_attrs["num_date"].as_number(), Some(2014.2));
        assert_eq!(
            node.node_attrs["num_date"].confidence(),
            Some([2013.9, 2014.4])
        );
        assert_eq!(node.node_attrs["clade_name"].as_text(), Some("A1"));
    }

    #[test]
    fn test_deserialize_legacy_field_names() {
        let json = r#"{
            "strain": "tip",
            "yvalue": 3.0,
            "attr": {"div": 0.5, "num_date": 2016.1, "num_date_confidence": [2016.0, 2016.2]}
        }"#;
        let node: TreeNode = serde_json::from_str(json).unwrap();

        assert_eq!(node.name, "tip");
        assert!(node.children.is_empty());
        assert_eq!(
            node.node_attrs["num_date_confidence"].as_interval(),
            Some([2016.0, 2016.2])
        );
    }

    #[test]
    fn test_deserialize_categorical_value_objects() {
        let json = r#"{
            "name": "r",
            "yvalue": 0,
            "node_attrs": {
                "div": 0,
                "country": {"value": "USA"},
                "region": {"value": "Asia", "confidence": {"Asia": 0.9, "Europe": 0.1}},
                "clade_name": {"value": "A1"},
                "num_date": {"value": 2015.5, "confidence": {"2015": 1.0}}
            }
        }"#;
        let node: TreeNode = serde_json::from_str(json).unwrap();
        let attrs = &node.node_attrs;

        assert_eq!(attrs["country"].as_text(), Some("USA"));
        assert_eq!(attrs["region"].as_text(), Some("Asia"));
        assert_eq!(attrs["region"].as_number(), None);
        assert_eq!(attrs["clade_name"].as_text(), Some("A1"));
        assert_eq!(attrs["num_date"].as_number(), Some(2015.5));
        assert_eq!(attrs["num_date"].confidence(), None);
    }
}
