//! Policy document parsing.

use super::Policy;
use crate::api::Attributes;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A document listing policies and the shared definitions they refer to.
///
/// Besides the full form, a bare top-level list of policies is accepted:
///
/// ```yaml
/// - id: owner-can-update
///   condition: object.owner_id == subject.id && object.type in ["account", "profile"]
///   actions: [GET, UPDATE]
/// ```
///
/// Conditions are CEL expressions evaluated by [`CelEngine`](crate::CelEngine)
/// unless the store is built with another engine. Boolean operators are
/// `&&`, `||` and `!`; word operators such as `and`/`or` are rejected when
/// the policy enters a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "DocumentRepr")]
pub struct PolicyDocument {
    /// Policies in declaration order
    #[serde(default)]
    pub policies: Vec<Policy>,
    /// Shared definitions merged into every evaluation environment
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub definitions: Attributes,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentRepr {
    List(Vec<Policy>),
    Full {
        #[serde(default)]
        policies: Vec<Policy>,
        #[serde(default)]
        definitions: Attributes,
    },
}

impl From<DocumentRepr> for PolicyDocument {
    fn from(repr: DocumentRepr) -> Self {
        match repr {
            DocumentRepr::List(policies) => Self {
                policies,
                definitions: Attributes::new(),
            },
            DocumentRepr::Full {
                policies,
                definitions,
            } => Self {
                policies,
                definitions,
            },
        }
    }
}

impl PolicyDocument {
    /// Parse a policy document from YAML.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        serde_yaml::from_str(yaml).map_err(crate::Error::from)
    }

    /// Parse a policy document from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(crate::Error::from)
    }

    /// Load a policy document from a file.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match extension.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Self::from_yaml(&content).or_else(|_| Self::from_json(&content)),
        }
    }

    /// Convert the document to YAML.
    pub fn to_yaml(&self) -> crate::Result<String> {
        serde_yaml::to_string(self).map_err(crate::Error::from)
    }

    /// Find a policy by ID.
    pub fn get_policy(&self, id: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const LIST_YAML: &str = r#"
- id: policy1
  condition: object.type == "session" && subject.id == "anonymous"
  actions: [SIGNUP, LOGIN, REFRESH]
- id: policy2
  condition: object.type == "account" && object.owner_id == subject.id
  actions: [GET, UPDATE]
"#;

    #[test]
    fn test_bare_list_yaml() {
        let doc = PolicyDocument::from_yaml(LIST_YAML).unwrap();
        assert_eq!(doc.policies.len(), 2);
        assert_eq!(doc.policies[0].id, "policy1");
        assert_eq!(doc.policies[1].id, "policy2");
        assert!(doc.definitions.is_empty());
        assert!(doc.get_policy("policy2").unwrap().permits("UPDATE"));
        assert!(doc.get_policy("nonexistent").is_none());
    }

    #[test]
    fn test_full_document_json() {
        let doc = PolicyDocument::from_json(
            r#"{
                "policies": [{"id": "p0", "condition": "threshold == \"5\"", "actions": ["READ"]}],
                "definitions": {"threshold": "5"}
            }"#,
        )
        .unwrap();
        assert_eq!(doc.policies.len(), 1);
        assert_eq!(doc.definitions.get("threshold"), Some(&json!("5")));
    }

    #[test]
    fn test_yaml_round_trip_keeps_order() {
        let doc = PolicyDocument::from_yaml(LIST_YAML).unwrap();
        let parsed = PolicyDocument::from_yaml(&doc.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_from_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(LIST_YAML.as_bytes()).unwrap();

        let doc = PolicyDocument::from_file(file.path()).unwrap();
        assert_eq!(doc.policies.len(), 2);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            PolicyDocument::from_yaml("- id: [unterminated"),
            Err(crate::Error::Yaml(_))
        ));
    }
}
