use serde::{Serialize, Serializer, ser::SerializeMap};
use std::collections::BTreeMap;

/// Field name to ordered error messages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// First message recorded for `field`, or `""` when there is none.
    #[must_use]
    pub fn get(&self, field: &str) -> &str {
        self.0
            .get(field)
            .and_then(|messages| messages.first())
            .map_or("", String::as_str)
    }

    #[must_use]
    pub fn all(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Templates only ever show the first message per field.
impl Serialize for FormErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for field in self.0.keys() {
            map.serialize_entry(field, self.get(field))?;
        }
        map.end()
    }
}
