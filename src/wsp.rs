//! JSON-WSP envelopes spoken by the GES DISC subset service.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{SubsetError, WspFault};

pub(crate) const WSP_VERSION: &str = "1.0";
pub(crate) const TYPE_REQUEST: &str = "jsonwsp/request";
pub(crate) const TYPE_FAULT: &str = "jsonwsp/fault";

pub(crate) const METHOD_SUBSET: &str = "subset";
pub(crate) const METHOD_GET_STATUS: &str = "GetStatus";
pub(crate) const METHOD_GET_RESULT: &str = "GetResult";

#[derive(Debug, Clone, Serialize)]
pub struct WspRequest {
    pub methodname: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub args: Value,
}

impl WspRequest {
    pub fn new(method: &str, args: Value) -> Self {
        Self {
            methodname: method.to_string(),
            kind: TYPE_REQUEST.to_string(),
            version: WSP_VERSION.to_string(),
            args,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct WspResponse {
    #[serde(default)]
    pub methodname: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub fault: Option<Value>,
}

impl WspResponse {
    pub fn is_fault(&self) -> bool {
        self.kind == TYPE_FAULT
    }

    /// Turns the envelope into its typed `result`, or `ProtocolFault` for a
    /// fault-typed reply.
    pub(crate) fn into_result<T: DeserializeOwned>(self, method: &str) -> Result<T, SubsetError> {
        let method = self.methodname.as_deref().unwrap_or(method).to_string();
        if self.is_fault() {
            let fault = self
                .fault
                .and_then(|f| serde_json::from_value::<WspFault>(f).ok())
                .unwrap_or_default();
            return Err(fault.into_error(&method));
        }

        let result = self
            .result
            .ok_or_else(|| SubsetError::unexpected(&method, "missing result"))?;
        serde_json::from_value(result)
            .map_err(|e| SubsetError::unexpected(&method, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, serde::Deserialize)]
    struct Echo {
        value: u32,
    }

    #[test]
    fn request_envelope_shape() {
        let req = WspRequest::new(METHOD_GET_STATUS, json!({ "jobId": "abc" }));
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "methodname": "GetStatus",
                "type": "jsonwsp/request",
                "version": "1.0",
                "args": { "jobId": "abc" }
            })
        );
    }

    #[test]
    fn fault_reply_becomes_protocol_fault() {
        let resp: WspResponse = serde_json::from_value(json!({
            "methodname": "subset",
            "type": "jsonwsp/fault",
            "version": "1.0",
            "fault": { "code": "incompatible", "string": "unknown dataset" }
        }))
        .unwrap();
        let err = resp.into_result::<Echo>(METHOD_SUBSET).unwrap_err();
        match err {
            SubsetError::ProtocolFault { method, code, message } => {
                assert_eq!(method, "subset");
                assert_eq!(code.as_deref(), Some("incompatible"));
                assert_eq!(message.as_deref(), Some("unknown dataset"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_result_is_unexpected() {
        let resp: WspResponse =
            serde_json::from_value(json!({ "type": "jsonwsp/response" })).unwrap();
        let err = resp.into_result::<Echo>(METHOD_GET_RESULT).unwrap_err();
        assert!(matches!(err, SubsetError::UnexpectedResponse { .. }));
    }

    #[test]
    fn result_is_decoded() {
        let resp: WspResponse = serde_json::from_value(json!({
            "type": "jsonwsp/response",
            "result": { "value": 7 }
        }))
        .unwrap();
        assert_eq!(resp.into_result::<Echo>("x").unwrap().value, 7);
    }
}
