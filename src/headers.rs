//! Header storage and the RFC 7230 field grammar.
//!
//! Names are case-sensitive keys. Each name maps to an ordered list of
//! values, and names keep the order they were first set in.

use crate::error::Error;

/// A case-sensitive, insertion-ordered header map.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// All values for `name`, or an empty slice.
    pub fn get(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_slice())
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    /// All values for `name` joined with `", "`.
    pub fn line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces every value of `name`.
    pub(crate) fn set(&mut self, name: &str, values: Vec<String>) -> Result<(), Error> {
        let values = validate_values(values)?;
        let name = validate_name(name)?;
        self.replace(name, values);
        Ok(())
    }

    /// [`set`](Self::set) for names and values already known to be valid.
    pub(crate) fn replace(&mut self, name: &str, values: Vec<String>) {
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = values,
            None => self.entries.push((name.to_owned(), values)),
        }
    }

    /// Appends values to `name`, creating it when absent.
    pub(crate) fn append(&mut self, name: &str, values: Vec<String>) -> Result<(), Error> {
        let values = validate_values(values)?;
        let name = validate_name(name)?;
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1.extend(values),
            None => self.entries.push((name.to_owned(), values)),
        }
        Ok(())
    }

    pub(crate) fn remove(&mut self, name: &str) {
        self.entries.retain(|(k, _)| k != name);
    }
}

/// `field-name = token`
pub fn validate_name(name: &str) -> Result<&str, Error> {
    let is_tchar = |b: u8| {
        b.is_ascii_alphanumeric()
            || matches!(
                b,
                b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^'
                    | b'_' | b'`' | b'|' | b'~'
            )
    };
    if !name.is_empty() && name.bytes().all(is_tchar) {
        Ok(name)
    } else {
        Err(Error::InvalidHeader { part: "name", value: name.to_owned() })
    }
}

/// `field-value = *( field-content / obs-fold )`, with every obs-fold
/// collapsed into a single space.
pub fn validate_value(value: &str) -> Result<String, Error> {
    let bytes = value.as_bytes();
    let is_vchar = |b: u8| (0x21..=0x7e).contains(&b) || b >= 0x80;
    let is_blank = |b: u8| b == b' ' || b == b'\t';

    let mut folded = String::with_capacity(value.len());
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\r' && bytes.get(i + 1) == Some(&b'\n') && bytes.get(i + 2).is_some_and(|&b| is_blank(b)) {
            folded.push_str(&value[start..i]);
            folded.push(' ');
            i += 2;
            while bytes.get(i).is_some_and(|&b| is_blank(b)) {
                i += 1;
            }
            start = i;
        } else if is_vchar(b) {
            i += 1;
        } else if is_blank(b) {
            // whitespace inside field-content must sit between two vchars
            let preceded = i > 0 && is_vchar(bytes[i - 1]);
            while bytes.get(i).is_some_and(|&b| is_blank(b)) {
                i += 1;
            }
            if !preceded || !bytes.get(i).is_some_and(|&b| is_vchar(b)) {
                return Err(Error::InvalidHeader { part: "value", value: value.to_owned() });
            }
        } else {
            return Err(Error::InvalidHeader { part: "value", value: value.to_owned() });
        }
    }
    folded.push_str(&value[start..]);
    Ok(folded)
}

fn validate_values(values: Vec<String>) -> Result<Vec<String>, Error> {
    values.iter().map(|v| validate_value(v)).collect()
}

/// Title-cases a header name: `access-control-request-HEADERS` becomes
/// `Access-Control-Request-Headers`. Underscores are kept, so `X_Api_Key`
/// never collides with `X-Api-Key`.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_tokens() {
        assert!(validate_name("X-Request-Id").is_ok());
        assert!(validate_name("a").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("X-A\nX-A").is_err());
        assert!(validate_name("Bad Name").is_err());
        assert!(validate_name("Colon:").is_err());
    }

    #[test]
    fn values_follow_the_field_grammar() {
        assert_eq!(validate_value("Connection=1; Framework=0").unwrap(), "Connection=1; Framework=0");
        assert_eq!(validate_value("").unwrap(), "");
        assert_eq!(validate_value("a \t b").unwrap(), "a \t b");
        assert!(validate_value("a\n").is_err());
        assert!(validate_value("a\r\nb").is_err());
        assert!(validate_value(" leading").is_err());
        assert!(validate_value("trailing ").is_err());
        assert!(validate_value("nul\0").is_err());
    }

    #[test]
    fn obs_fold_collapses_to_one_space() {
        assert_eq!(validate_value("a\r\n b").unwrap(), "a b");
        assert_eq!(validate_value("a\r\n \t b\r\n\tc").unwrap(), "a b c");
    }

    #[test]
    fn map_is_case_sensitive_and_ordered() {
        let mut headers = Headers::new();
        headers.set("B", vec!["1".into()]).unwrap();
        headers.append("a", vec!["x".into()]).unwrap();
        headers.append("a", vec!["y".into()]).unwrap();
        assert_eq!(headers.get("a"), ["x", "y"]);
        assert!(headers.get("A").is_empty());
        assert_eq!(headers.line("a"), "x, y");
        let names: Vec<_> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["B", "a"]);

        headers.remove("B");
        assert!(!headers.contains("B"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn rejected_values_leave_the_map_untouched() {
        let mut headers = Headers::new();
        headers.set("a", vec!["ok".into()]).unwrap();
        assert!(headers.set("a", vec!["bad\n".into()]).is_err());
        assert_eq!(headers.get("a"), ["ok"]);
    }

    #[test]
    fn normalizes_names_to_title_case() {
        assert_eq!(normalize_name("content-type"), "Content-Type");
        assert_eq!(normalize_name(" origin "), "Origin");
        assert_eq!(normalize_name("x-api-key"), "X-Api-Key");
        assert_eq!(normalize_name("X_API_KEY"), "X_api_key");
        assert_ne!(normalize_name("X_Api_Key"), normalize_name("X-Api-Key"));
    }
}
