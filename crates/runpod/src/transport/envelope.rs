//! GraphQL request and response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RunpodError;

/// Variables sent alongside a GraphQL document.
pub type Variables = Map<String, Value>;

/// Outgoing GraphQL request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    /// Static GraphQL document.
    pub query: String,
    /// User-supplied values. Never interpolated into `query`.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub variables: Variables,
}

impl GraphQlRequest {
    /// Create a request from a document and its variables.
    pub fn new(query: impl Into<String>, variables: Variables) -> Self {
        Self {
            query: query.into(),
            variables,
        }
    }
}

/// A single entry of the GraphQL `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    /// Human readable message.
    pub message: String,
}

/// Incoming GraphQL response body.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    /// Payload, unreliable when `errors` is non-empty.
    #[serde(default)]
    pub data: Option<Value>,
    /// Errors reported by the service.
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

impl GraphQlResponse {
    /// Unwrap the envelope into its payload.
    ///
    /// Absent data becomes `Value::Null`; decoding the expected object is the
    /// caller's job.
    ///
    /// # Errors
    /// Returns [`RunpodError::Protocol`] if the `errors` array is non-empty.
    pub fn into_data(self) -> Result<Value, RunpodError> {
        match self.errors {
            Some(errors) if !errors.is_empty() => Err(RunpodError::Protocol {
                messages: errors.into_iter().map(|e| e.message).collect(),
            }),
            _ => Ok(self.data.unwrap_or(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_empty_variables() {
        let request = GraphQlRequest::new("query { myself { id } }", Variables::new());
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({"query": "query { myself { id } }"}));
    }

    #[test]
    fn test_errors_take_precedence_over_data() {
        let response: GraphQlResponse = serde_json::from_value(json!({
            "data": {"pod": {"id": "p1"}},
            "errors": [{"message": "first"}, {"message": "second"}]
        }))
        .unwrap();

        match response.into_data() {
            Err(RunpodError::Protocol { messages }) => {
                assert_eq!(messages, vec!["first", "second"]);
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_null_errors_and_missing_data() {
        let response: GraphQlResponse =
            serde_json::from_value(json!({"errors": null})).unwrap();
        assert_eq!(response.into_data().unwrap(), Value::Null);
    }
}
