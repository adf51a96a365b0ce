use serde::Serialize;
use serde_json::Value;

use crate::protocol::Envelope;
use crate::transport::VendorResponse;

/// Result of a vendor call as reported to callers.
///
/// Failures carry the vendor's own message untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorOutcome<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> VendorOutcome<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> VendorOutcome<U> {
        VendorOutcome {
            success: self.success,
            message: self.message,
            data: self.data.map(f),
        }
    }
}

impl VendorOutcome<Value> {
    /// Interpret a raw response. A non-2xx status and `success:false` are
    /// both failures.
    pub fn from_response(response: VendorResponse) -> Self {
        let envelope: Option<Envelope> = serde_json::from_value(response.body.clone()).ok();
        let vendor_message = envelope
            .as_ref()
            .and_then(|e| e.message.clone())
            .filter(|m| !m.is_empty());

        if !response.is_success() {
            let message = vendor_message
                .or_else(|| response.body.as_str().map(str::to_string))
                .unwrap_or_else(|| format!("Vendor returned HTTP {}", response.status));
            return Self::failure(message);
        }

        match envelope {
            Some(env) if env.success => Self::ok(
                env.data.unwrap_or(Value::Null),
                vendor_message.unwrap_or_else(|| "OK".to_string()),
            ),
            Some(_) => Self::failure(vendor_message.unwrap_or_else(|| "Request failed".to_string())),
            None => Self::failure(format!("Unexpected vendor response: {}", response.body)),
        }
    }
}
