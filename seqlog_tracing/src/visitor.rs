/*!
 * Field visitor turning `tracing` values into CLEF properties.
 */

use std::fmt;

use serde_json::{Map, Number, Value};
use tracing::field::{Field, Visit};

/// Name `tracing` gives to the formatted message of `info!("...")`.
const MESSAGE_FIELD: &str = "message";

/// Collects fields into a JSON object, keeping native JSON types where the
/// value has one.
pub struct JsonVisitor {
    fields: Map<String, Value>,
    message: Option<String>,
}

impl JsonVisitor {
    pub fn new() -> Self {
        Self::with_fields(Map::new())
    }

    /// Starts from already collected fields (e.g. from enclosing spans);
    /// recorded values override them.
    pub fn with_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            message: None,
        }
    }

    pub fn into_parts(self) -> (Map<String, Value>, Option<String>) {
        (self.fields, self.message)
    }

    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == MESSAGE_FIELD {
            self.message = Some(match value {
                Value::String(text) => text,
                other => other.to_string(),
            });
            return;
        }

        self.fields.insert(property_name(field.name()), value);
    }
}

impl Default for JsonVisitor {
    fn default() -> Self {
        Self::new()
    }
}

/*
 * Seq reserves the `@` prefix for reified properties; a user field with a
 * leading `@` is escaped by doubling it.
 */
fn property_name(name: &str) -> String {
    if name.starts_with('@') {
        format!("@{name}")
    } else {
        name.to_string()
    }
}

impl Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::Number(value.into()));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.insert(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_name_escapes_reserved_prefix() {
        assert_eq!(property_name("@mt"), "@@mt");
        assert_eq!(property_name("user"), "user");
    }
}
