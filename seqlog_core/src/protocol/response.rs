/**
 * Best-effort parsing of a Seq rejection body.
 *
 * Seq answers a refused payload with a JSON object like
 * `{"Error": "Invalid payload"}`. Proxies in front of Seq may answer with
 * anything at all, so extraction never fails.
 */
use serde_json::Value;

use crate::protocol::constants::ERROR_FIELD;

/**
 * Returns the top-level `"Error"` field of a JSON response body.
 *
 * - string value → returned verbatim
 * - any other non-null value → its JSON text
 * - missing field, `null`, non-object or unparsable body → `""`
 */
pub fn extract_error_message(body: &[u8]) -> String {
    let Ok(mut parsed) = serde_json::from_slice::<Value>(body) else {
        return String::new();
    };

    match parsed.get_mut(ERROR_FIELD).map(Value::take) {
        Some(Value::String(message)) => message,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
