use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{errors::Error, Result};

/// Extra information attached to some failed requests.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrate_to_chat_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<i64>,
}

/// Envelope returned by every Bot API method.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ResponseParameters>,
}

impl ApiResponse {
    pub fn success(result: serde_json::Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn failure(code: i64, description: impl Into<String>) -> Self {
        Self {
            ok: false,
            description: Some(description.into()),
            error_code: Some(code),
            ..Self::default()
        }
    }

    /// Decode `result` into `T`, or turn a rejected call into [`Error::Api`].
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        if !self.ok {
            let params = self.parameters.unwrap_or_default();
            return Err(Error::Api {
                code: self.error_code.unwrap_or_default(),
                description: self.description.unwrap_or_default(),
                retry_after: params.retry_after,
                migrate_to_chat_id: params.migrate_to_chat_id,
            });
        }

        let value = self.result.unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejected_call_maps_to_api_error() {
        let resp: ApiResponse = serde_json::from_value(json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 7",
            "parameters": {"retry_after": 7}
        }))
        .unwrap();

        let err = resp.into_result::<bool>().unwrap_err();
        assert!(matches!(err, Error::Api { code: 429, .. }));
        assert_eq!(err.retry_after(), Some(7));
    }

    #[test]
    fn wrong_result_shape_is_json_error() {
        let err = ApiResponse::success(json!("nope"))
            .into_result::<i64>()
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
