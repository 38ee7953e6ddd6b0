// SawitDB line protocol: one AQL statement per request line, one JSON envelope per response line.

use crate::core::AqlError;
use serde::{Deserialize, Serialize};

/// Response line sent by SawitDB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub timestamp: String,
}

impl ResponseEnvelope {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: serde_json::Value::Null,
            error: Some(message.into()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// `data` on success; the engine's message as [`AqlError::Engine`] otherwise.
    pub fn into_result(self) -> Result<serde_json::Value, AqlError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(AqlError::Engine(self.error.unwrap_or_default()))
        }
    }
}

/// Frames a statement as exactly one request line.
pub fn encode_request(statement: &str) -> Result<String, AqlError> {
    let statement = statement.trim();
    if statement.is_empty() {
        return Err(AqlError::EmptyStatement);
    }
    let mut line: String = statement
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect();
    line.push('\n');
    Ok(line)
}

/// Parses one response line, including its terminator.
pub fn decode_response(line: &str) -> Result<ResponseEnvelope, AqlError> {
    let body = line
        .strip_suffix('\n')
        .ok_or_else(|| AqlError::Protocol("response line is not newline-terminated".to_string()))?;
    Ok(serde_json::from_str(body.trim_end_matches('\r'))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_request_single_line() {
        assert_eq!(
            encode_request("  PANEN *\r\nDARI trees ").unwrap(),
            "PANEN *  DARI trees\n"
        );
        assert!(matches!(encode_request(" \n "), Err(AqlError::EmptyStatement)));
    }

    #[test]
    fn test_decode_success_envelope() {
        let env = decode_response(
            "{\"success\":true,\"data\":[{\"code\":\"C001\"}],\"timestamp\":\"2025-01-01T00:00:00Z\"}\n",
        )
        .unwrap();
        assert_eq!(env.into_result().unwrap(), json!([{"code": "C001"}]));
    }

    #[test]
    fn test_decode_failure_envelope() {
        let env = decode_response(
            "{\"success\":false,\"error\":\"Table not found\",\"timestamp\":\"t\"}\n",
        )
        .unwrap();
        assert!(matches!(env.into_result(), Err(AqlError::Engine(m)) if m == "Table not found"));

        let line = serde_json::to_string(&ResponseEnvelope::err("Syntax error")).unwrap() + "\n";
        let env = decode_response(&line).unwrap();
        assert!(!env.success);
        assert_eq!(env.error.as_deref(), Some("Syntax error"));
    }

    #[test]
    fn test_decode_rejects_unterminated_and_garbage() {
        assert!(matches!(
            decode_response("{\"success\":true}"),
            Err(AqlError::Protocol(_))
        ));
        assert!(matches!(decode_response("hello\n"), Err(AqlError::Parse(_))));
    }
}
