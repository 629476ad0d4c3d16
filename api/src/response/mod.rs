use serde::Serialize;

/// Standardized API response wrapper for all outgoing JSON responses.
///
/// Every endpoint answers with a `success` flag, a human-readable `message`,
/// and the payload fields flattened alongside them:
/// ```json
/// {
///   "success": true,
///   "message": "Session created successfully",
///   "sessionId": 7
/// }
/// ```
///
/// Error responses use [`Empty`] as the payload, so they carry only the flag
/// and the message.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

/// Payload for responses that carry nothing beyond the envelope. Flattening
/// it adds no fields.
#[derive(Serialize, Default)]
pub struct Empty {}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

impl ApiResponse<Empty> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::success(Empty::default(), message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Empty::default(),
        }
    }
}
