//! Form values and field validation.
//!
//! Every rule runs independently and appends to the field's error list; a
//! failing rule never stops later rules. Blank values are exempt from every
//! rule except [`Form::required`], so optional fields may be left empty.

mod errors;

pub use errors::FormErrors;

use regex::Regex;
use serde::{Serialize, Serializer, ser::SerializeStruct};
use std::{
    collections::{BTreeMap, HashMap},
    sync::LazyLock,
};

/// Email pattern recommended by the WHATWG HTML specification.
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is a valid regex")
});

pub const BLANK_MESSAGE: &str = "This field cannot be blank.";
pub const INVALID_MESSAGE: &str = "This field is invalid.";

/// Submitted values paired with the errors found while validating them.
#[derive(Clone, Debug, Default)]
pub struct Form {
    values: HashMap<String, Vec<String>>,
    errors: FormErrors,
}

impl Form {
    #[must_use]
    pub fn new(values: HashMap<String, Vec<String>>) -> Self {
        Self {
            values,
            errors: FormErrors::default(),
        }
    }

    /// Build a form from an `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(body) {
            values
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        Self::new(values)
    }

    /// Build a form pre-filled with single values, e.g. defaults for a blank page.
    #[must_use]
    pub fn with_defaults(defaults: &[(&str, &str)]) -> Self {
        let values = defaults
            .iter()
            .map(|(field, value)| ((*field).to_string(), vec![(*value).to_string()]))
            .collect();
        Self::new(values)
    }

    /// First submitted value for `field`, or `""`.
    #[must_use]
    pub fn get(&self, field: &str) -> &str {
        self.values
            .get(field)
            .and_then(|values| values.first())
            .map_or("", String::as_str)
    }

    #[must_use]
    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut FormErrors {
        &mut self.errors
    }

    pub fn required(&mut self, fields: &[&str]) {
        for field in fields {
            if self.get(field).trim().is_empty() {
                self.errors.add(field, BLANK_MESSAGE);
            }
        }
    }

    /// Length is counted in Unicode scalar values, not bytes.
    pub fn min_length(&mut self, field: &str, min: usize) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }
        if value.chars().count() < min {
            self.errors.add(
                field,
                format!("This field is too short (minimum is {min} characters)"),
            );
        }
    }

    pub fn max_length(&mut self, field: &str, max: usize) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }
        if value.chars().count() > max {
            self.errors.add(
                field,
                format!("This field is too long (maximum is {max} characters)"),
            );
        }
    }

    pub fn matches_pattern(&mut self, field: &str, pattern: &Regex) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }
        if !pattern.is_match(value) {
            self.errors.add(field, INVALID_MESSAGE);
        }
    }

    pub fn permitted_values(&mut self, field: &str, options: &[&str]) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }
        if !options.contains(&value) {
            self.errors.add(field, INVALID_MESSAGE);
        }
    }

    /// The datastore cannot hold NUL bytes, so they are a field error here.
    pub fn no_nul_bytes(&mut self, fields: &[&str]) {
        for field in fields {
            if self.get(field).contains('\0') {
                self.errors.add(field, INVALID_MESSAGE);
            }
        }
    }

    #[must_use]
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// Rendered as `{ values: {field: first_value}, errors: {field: first_error} }`.
impl Serialize for Form {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values: BTreeMap<&str, &str> = self
            .values
            .keys()
            .map(|field| (field.as_str(), self.get(field)))
            .collect();
        let mut state = serializer.serialize_struct("Form", 2)?;
        state.serialize_field("values", &values)?;
        state.serialize_field("errors", &self.errors)?;
        state.end()
    }
}
