/// JSON envelope shared by every endpoint: `{code, msg, data}`.
///
/// `code` is 0 on success and 1 on failure; failures carry no `data`.

use serde::Serialize;

pub const CODE_OK: i32 = 0;
pub const CODE_FAIL: i32 = 1;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, msg: impl Into<String>) -> Self {
        Self {
            code: CODE_OK,
            msg: msg.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn fail(msg: impl Into<String>) -> Self {
        Self {
            code: CODE_FAIL,
            msg: msg.into(),
            data: None,
        }
    }
}
