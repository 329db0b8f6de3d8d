//! Access request definitions.

use serde::{Deserialize, Serialize};

/// String-keyed JSON-shaped data describing a subject or an object.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// A request to be checked against the policies of a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// The requested action name
    pub action: String,
    /// Attributes of the subject (the requester)
    #[serde(default)]
    pub subject: Attributes,
    /// Attributes of the object (the resource)
    #[serde(default)]
    pub object: Attributes,
}

impl Request {
    /// Create a new request.
    pub fn new(action: impl Into<String>, subject: Attributes, object: Attributes) -> Self {
        Self {
            action: action.into(),
            subject,
            object,
        }
    }

    /// Create a request builder.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Check that the request can be evaluated.
    ///
    /// Object attributes are checked first, then subject attributes, then the
    /// action.
    pub fn validate(&self) -> crate::Result<()> {
        if self.object.is_empty() {
            return Err(crate::Error::EmptyObjectAttributes);
        }
        if self.subject.is_empty() {
            return Err(crate::Error::EmptySubjectAttributes);
        }
        if self.action.is_empty() {
            return Err(crate::Error::EmptyAction);
        }
        Ok(())
    }
}

/// Builder for creating requests.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Set the action.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.request.action = action.into();
        self
    }

    /// Set one subject attribute.
    pub fn subject(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.request.subject.insert(key.into(), value.into());
        self
    }

    /// Set one object attribute.
    pub fn object(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.request.object.insert(key.into(), value.into());
        self
    }

    /// Build the request.
    pub fn build(self) -> Request {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_valid_request() {
        let request = Request::builder()
            .action("READ")
            .subject("id", "user1")
            .object("type", "session")
            .build();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_empty_object_checked_first() {
        let request = Request::default();
        assert!(matches!(request.validate(), Err(Error::EmptyObjectAttributes)));
    }

    #[test]
    fn test_empty_subject() {
        let request = Request::builder().action("READ").object("k", "v").build();
        assert!(matches!(request.validate(), Err(Error::EmptySubjectAttributes)));
    }

    #[test]
    fn test_empty_action() {
        let request = Request::builder().subject("k", "v").object("k", "v").build();
        assert!(matches!(request.validate(), Err(Error::EmptyAction)));
    }

    #[test]
    fn test_deserialize_missing_maps() {
        let request: Request = serde_json::from_str(r#"{"action": "READ"}"#).unwrap();
        assert!(request.subject.is_empty());
        assert!(matches!(request.validate(), Err(Error::EmptyObjectAttributes)));
    }
}
