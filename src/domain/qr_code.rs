use serde::{Deserialize, Serialize};

/// The code printed on a table; scanning it opens the restaurant's menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCode {
    pub id: String,
    pub restaurant_id: String,
    pub table_number: String,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct QrCodeCreate {
    pub restaurant_id: String,
    pub table_number: String,
}

impl QrCodeCreate {
    pub fn new(restaurant_id: impl Into<String>, table_number: impl Into<String>) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            table_number: table_number.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QrCodePatch {
    pub table_number: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct QrCodeQuery {
    pub restaurant_id: Option<String>,
}
