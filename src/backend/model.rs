use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::FoodItem;

#[derive(Serialize, Debug)]
pub struct BarcodeRequest<'a> {
    pub barcode: &'a str,
}

/// Envelope of a successful barcode lookup.
#[derive(Deserialize, Debug)]
pub struct BarcodeResponse {
    pub success: bool,
    #[serde(default)]
    pub food: Option<FoodItem>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<FoodItem>,
}

/// FastAPI-style error body. `detail` is usually a string but validation
/// failures send a list of objects.
#[derive(Deserialize, Debug, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
    #[serde(default)]
    pub code: Option<Value>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Provider error 21 ("Invalid IP address detected") forwarded as a code.
    pub fn is_whitelist_rejection(&self) -> bool {
        match self.code.as_ref() {
            Some(Value::Number(n)) => n.as_i64() == Some(21),
            Some(Value::String(s)) => s.eq_ignore_ascii_case("ip_not_whitelisted"),
            _ => false,
        }
    }
}
