use std::fmt;

use url::form_urlencoded::byte_serialize;

/// `application/x-www-form-urlencoded` body builder.
///
/// Keys and values are percent-encoded as UTF-8 when added, with spaces
/// written as `+`. The rendered form is the pairs joined by `&`.
///
/// # Examples
///
/// ```
/// use tether_fetch::Form;
///
/// let form = Form::new().add("a", "1").add("b", "2 ");
/// assert_eq!(form.to_string(), "a=1&b=2+");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    elements: Vec<String>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add(mut self, key: &str, value: &str) -> Self {
        let key: String = byte_serialize(key.as_bytes()).collect();
        let value: String = byte_serialize(value.as_bytes()).collect();
        self.elements.push(format!("{key}={value}"));
        self
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.elements.join("&"))
    }
}
