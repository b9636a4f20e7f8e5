use std::fmt;
use std::str::FromStr;

use unicode_segmentation::UnicodeSegmentation;

const MAX_LEN: usize = 512;

/// A required, non-empty free-text field from the lead profile.
/// No semantic validation beyond presence is applied; revenue and budget
/// bands arrive as opaque strings chosen by the client form.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RequiredField(String);

impl RequiredField {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for RequiredField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();

        if value.is_empty() {
            return Err("Field cannot be empty".into());
        }
        if value.graphemes(true).count() > MAX_LEN {
            return Err("Field too long".into());
        }

        Ok(Self(value.to_string()))
    }
}

impl AsRef<str> for RequiredField {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
