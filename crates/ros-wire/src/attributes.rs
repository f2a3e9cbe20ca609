//! Attribute words and the typed mapping built from them.
//!
//! On the wire an attribute is a single word `<marker><key>=<value>`:
//!
//! - `=key=value` sets or reports a value
//! - `?key=value` filters a `print`
//!
//! Reserved keys carry a leading `.` (`.id`, `.proplist`). [`Attributes`]
//! stores keys exactly as they appear on the wire, so rows read back from the
//! appliance keep their `.id` key, and [`Attributes::insert`] adds the dot for
//! the bare reserved names.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Keys that travel with a leading `.`.
pub const RESERVED_KEYS: [&str; 2] = ["id", "proplist"];

/// Wire key of the object identifier.
pub const ID_KEY: &str = ".id";

/// Wire key of the property list filter.
pub const PROPLIST_KEY: &str = ".proplist";

/// Prefix character of an attribute word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// `=`: a value.
    Value,
    /// `?`: a query filter.
    Query,
}

impl Marker {
    /// Returns the marker byte.
    pub fn as_byte(self) -> u8 {
        match self {
            Marker::Value => b'=',
            Marker::Query => b'?',
        }
    }
}

/// Maps a caller-facing key to its wire form, adding the `.` to reserved keys.
pub fn wire_key(key: &str) -> Cow<'_, str> {
    if RESERVED_KEYS.contains(&key) {
        Cow::Owned(format!(".{key}"))
    } else {
        Cow::Borrowed(key)
    }
}

/// Splits one attribute word into its key and value.
///
/// A leading `=` or `?` marker is dropped. The value is everything after the
/// first `=` in the remainder; a word with no `=` yields an empty value.
/// Non-UTF-8 bytes are replaced.
pub fn parse_attribute(word: &[u8]) -> (String, String) {
    let body = match word.first() {
        Some(b'=' | b'?') => &word[1..],
        _ => word,
    };

    match body.iter().position(|&b| b == b'=') {
        Some(pos) => (
            String::from_utf8_lossy(&body[..pos]).into_owned(),
            String::from_utf8_lossy(&body[pos + 1..]).into_owned(),
        ),
        None => (String::from_utf8_lossy(body).into_owned(), String::new()),
    }
}

/// Ordered mapping from wire key to string value.
///
/// Keys are unique; inserting an existing key replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: BTreeMap<String, String>,
}

impl Attributes {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mapping from the attribute words of a reply sentence.
    pub fn from_words<T: AsRef<[u8]>>(words: &[T]) -> Self {
        words.iter().map(|w| parse_attribute(w.as_ref())).collect()
    }

    /// Inserts a value, adding the `.` to reserved keys.
    ///
    /// Returns the previous value for that key, if any.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        let key = wire_key(key.as_ref()).into_owned();
        self.entries.insert(key, value.into())
    }

    /// Builder form of [`Attributes::insert`].
    #[must_use]
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a list value joined with commas.
    pub fn insert_list<I, S>(&mut self, key: impl AsRef<str>, items: I) -> Option<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = items
            .into_iter()
            .map(|s| s.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join(",");
        self.insert(key, joined)
    }

    /// Sets `.id`.
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with(ID_KEY, id)
    }

    /// Sets `.proplist` to the comma-joined property names.
    #[must_use]
    pub fn with_proplist<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert_list(PROPLIST_KEY, properties);
        self
    }

    /// Looks up a value. Bare reserved names find their dotted key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(wire_key(key).as_ref()).map(String::as_str)
    }

    /// Removes a value. Bare reserved names find their dotted key.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(wire_key(key).as_ref())
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the object identifier (`.id`).
    pub fn id(&self) -> Option<&str> {
        self.get(ID_KEY)
    }

    /// Returns the `message` attribute carried by `!trap` and `!fatal`.
    pub fn message(&self) -> Option<&str> {
        self.get("message")
    }

    /// Returns the `ret` attribute carried by some `!done` replies.
    pub fn ret(&self) -> Option<&str> {
        self.get("ret")
    }

    /// Returns the number of attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(wire key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders every attribute as a wire word with the given marker.
    pub fn to_words(&self, marker: Marker) -> Vec<Vec<u8>> {
        self.entries
            .iter()
            .map(|(key, value)| {
                let mut word = Vec::with_capacity(key.len() + value.len() + 2);
                word.push(marker.as_byte());
                word.extend_from_slice(key.as_bytes());
                word.push(b'=');
                word.extend_from_slice(value.as_bytes());
                word
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        attrs.extend(iter);
        attrs
    }
}

impl<K, V> Extend<(K, V)> for Attributes
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl IntoIterator for Attributes {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_attribute() {
        assert_eq!(
            parse_attribute(b"=name=ether1"),
            ("name".to_string(), "ether1".to_string())
        );
    }

    #[test]
    fn test_parse_keeps_equals_in_value() {
        assert_eq!(
            parse_attribute(b"=comment=a=b"),
            ("comment".to_string(), "a=b".to_string())
        );
    }

    #[test]
    fn test_parse_reserved_key_keeps_dot() {
        assert_eq!(
            parse_attribute(b"=.id=*1"),
            (".id".to_string(), "*1".to_string())
        );
    }

    #[test]
    fn test_parse_without_equals() {
        assert_eq!(
            parse_attribute(b"=disabled"),
            ("disabled".to_string(), String::new())
        );
        assert_eq!(
            parse_attribute(b".tag"),
            (".tag".to_string(), String::new())
        );
    }

    #[test]
    fn test_insert_prefixes_reserved_keys() {
        let attrs = Attributes::new().with("id", "*2").with("proplist", "name");
        assert_eq!(attrs.get(".id"), Some("*2"));
        assert_eq!(attrs.get("id"), Some("*2"));
        assert_eq!(attrs.id(), Some("*2"));
        assert_eq!(attrs.get(".proplist"), Some("name"));
    }

    #[test]
    fn test_to_words_with_markers() {
        let attrs = Attributes::new().with("name", "ether1").with_id("*1");

        let values = attrs.to_words(Marker::Value);
        assert_eq!(values, vec![b"=.id=*1".to_vec(), b"=name=ether1".to_vec()]);

        let queries = attrs.to_words(Marker::Query);
        assert_eq!(queries, vec![b"?.id=*1".to_vec(), b"?name=ether1".to_vec()]);
    }

    #[test]
    fn test_list_values_join_with_commas() {
        let attrs = Attributes::new().with_proplist(["name", "mtu", "running"]);
        assert_eq!(attrs.get(PROPLIST_KEY), Some("name,mtu,running"));

        let mut attrs = Attributes::new();
        attrs.insert_list("policy", Vec::<String>::new());
        assert_eq!(attrs.get("policy"), Some(""));
    }

    #[test]
    fn test_from_words_last_duplicate_wins() {
        let attrs = Attributes::from_words(&[b"=mtu=1500".as_slice(), b"=mtu=9000".as_slice()]);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get("mtu"), Some("9000"));
    }

    #[test]
    fn test_display() {
        let attrs = Attributes::new().with("a", "1").with("b", "2");
        assert_eq!(attrs.to_string(), "{a: 1, b: 2}");
    }
}
