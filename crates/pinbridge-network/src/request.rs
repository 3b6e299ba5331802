//! Inbound request parsing.

use crate::error::RequestError;
use pinbridge_hardware::CommandRequest;

/// Parse a JSON command request.
///
/// Parsing fails on invalid UTF-8, invalid JSON, a missing `id` or
/// `commands` field, or a field of the wrong type. Nothing is dispatched
/// for a request that fails here.
///
/// # Examples
///
/// ```
/// use pinbridge_network::parse_request;
///
/// let request = parse_request(br#"{"id": "front-door", "commands": ["HOME"]}"#).unwrap();
/// assert_eq!(request.id, "front-door");
///
/// assert!(parse_request(br#"{"id": "front-door"}"#).is_err());
/// ```
pub fn parse_request(body: &[u8]) -> Result<CommandRequest, RequestError> {
    serde_json::from_slice(body).map_err(|e| RequestError::Parse(e.to_string()))
}
