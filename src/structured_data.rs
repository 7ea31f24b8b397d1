use std::fmt::{self, Write};

/// One `[id key="value" ...]` element of the STRUCTURED-DATA field.
///
/// Params keep wire order; equality is order-sensitive.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StructuredElement {
    pub id: String,
    pub params: Vec<(String, String)>,
}

impl StructuredElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// First value stored under `key`, if any.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for StructuredElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        f.write_str(&self.id)?;
        for (key, value) in &self.params {
            write!(f, " {key}=\"")?;
            write_escaped(f, value)?;
            f.write_char('"')?;
        }
        f.write_char(']')
    }
}

// PARAM-VALUE escaping, RFC 5424 section 6.3.3
fn write_escaped(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for ch in value.chars() {
        match ch {
            '"' | ']' | '\\' => {
                f.write_char('\\')?;
                f.write_char(ch)?;
            }
            _ => f.write_char(ch)?,
        }
    }

    Ok(())
}

/// Writes the whole STRUCTURED-DATA field, `-` when there are no elements.
pub(crate) fn write_structured_data(
    f: &mut fmt::Formatter<'_>,
    elements: &[StructuredElement],
) -> fmt::Result {
    if elements.is_empty() {
        return f.write_char('-');
    }

    for element in elements {
        write!(f, "{element}")?;
    }

    Ok(())
}
