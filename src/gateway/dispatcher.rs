use serde_json::Value;
use std::sync::Arc;

use crate::error::{ApiFailure, GatewayError, GatewayResult};
use crate::gateway::transport::{ApiRequest, RawResponse, Transport};

/// Sends one request with the given bearer token and unwraps the reply.
///
/// Never touches the token store: the caller decides which token to attach.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn send(&self, request: &ApiRequest, token: Option<String>) -> GatewayResult<Value> {
        let request = if request.public {
            request.clone()
        } else {
            request.clone().with_bearer(token)
        };

        let response = self.transport.send(&request).await?;

        tracing::debug!("{} -> {}", request.describe(), response.status);

        unwrap_envelope(response)
    }
}

/// Turn a raw reply into the payload callers care about.
///
/// `{ "success": true, "data": X }` yields `X`; any other 2xx body is returned
/// as-is. A 2xx carrying `"success": false` is still a failure.
pub fn unwrap_envelope(response: RawResponse) -> GatewayResult<Value> {
    if !response.is_success() {
        return Err(GatewayError::Api(ApiFailure::from_response(response.status, response.body)));
    }

    match response.body {
        Value::Object(mut map) => match map.get("success") {
            Some(Value::Bool(true)) if map.contains_key("data") => {
                Ok(map.remove("data").unwrap_or(Value::Null))
            }
            Some(Value::Bool(false)) => Err(GatewayError::Api(ApiFailure::from_response(
                response.status,
                Value::Object(map),
            ))),
            _ => Ok(Value::Object(map)),
        },
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_data_is_unwrapped() {
        let value = unwrap_envelope(RawResponse::new(
            200,
            json!({ "success": true, "data": { "id": 9, "plate": "ABC-123" } }),
        ))
        .unwrap();
        assert_eq!(value, json!({ "id": 9, "plate": "ABC-123" }));
    }

    #[test]
    fn test_plain_body_passes_through() {
        let body = json!({ "user": { "id": 1 } });
        assert_eq!(unwrap_envelope(RawResponse::new(200, body.clone())).unwrap(), body);
        assert_eq!(unwrap_envelope(RawResponse::new(204, Value::Null)).unwrap(), Value::Null);
    }

    #[test]
    fn test_error_status_keeps_payload() {
        let body = json!({ "message": "Plate already registered", "code": "CONFLICT" });
        let err = unwrap_envelope(RawResponse::new(409, body.clone())).unwrap_err();

        let failure = err.api_failure().unwrap();
        assert_eq!(failure.status, 409);
        assert_eq!(failure.code.as_deref(), Some("CONFLICT"));
        assert_eq!(failure.payload, body);
    }

    #[test]
    fn test_success_false_on_2xx_is_a_failure() {
        let err = unwrap_envelope(RawResponse::new(200, json!({ "success": false, "error": "nope" })))
            .unwrap_err();
        assert_eq!(err.status(), Some(200));
        assert_eq!(err.api_failure().unwrap().message, "nope");
    }
}
