//! Codec for the delimited form-field blob stored on document records.
//!
//! The backend persists arbitrary named form values for a document as one
//! string of `key,value` pairs joined by `||`. Values may carry a leading `~~`
//! escape marker. When the key itself contains the marker, the pair is split
//! on the marker instead, which lets the value contain commas.
//!
//! Decoding never fails. Segments that cannot be read as a pair are dropped.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Separator between pairs.
pub const PAIR_DELIMITER: &str = "||";
/// Separator between a key and its value.
pub const KEY_VALUE_DELIMITER: char = ',';
/// Escape marker.
pub const ESCAPE_MARKER: &str = "~~";

/// Ordered string map of decoded form values.
///
/// Keeps the position of the first occurrence of each key; a repeated key
/// overwrites the value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldElements {
	entries: Vec<(String, String)>,
}

impl FieldElements {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or overwrites a value, returning the previous one.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
		let key = key.into();
		let value = value.into();
		match self.entries.iter_mut().find(|(k, _)| *k == key) {
			Some((_, existing)) => Some(std::mem::replace(existing, value)),
			None => {
				self.entries.push((key, value));
				None
			},
		}
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(k, _)| k.as_str())
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldElements {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut elements = Self::new();
		for (key, value) in iter {
			elements.insert(key, value);
		}
		elements
	}
}

impl Serialize for FieldElements {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.entries.len()))?;
		for (key, value) in &self.entries {
			map.serialize_entry(key, value)?;
		}
		map.end()
	}
}

impl<'de> Deserialize<'de> for FieldElements {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		struct ElementsVisitor;

		impl<'de> Visitor<'de> for ElementsVisitor {
			type Value = FieldElements;

			fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
				f.write_str("a map of string form values")
			}

			fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
				let mut elements = FieldElements::new();
				while let Some((key, value)) = access.next_entry::<String, String>()? {
					elements.insert(key, value);
				}
				Ok(elements)
			}
		}

		deserializer.deserialize_map(ElementsVisitor)
	}
}

/// Decodes a stored form-field blob.
pub fn decode_field_elements(text: &str) -> FieldElements {
	text.split(PAIR_DELIMITER)
		.filter(|segment| !segment.is_empty())
		.filter_map(decode_pair)
		.collect()
}

/// Encodes form values into the stored blob format.
///
/// Only values that decode back unchanged are meaningful here: keys without
/// `,` or the escape marker, and values without surrounding whitespace or `||`.
pub fn encode_field_elements(elements: &FieldElements) -> String {
	elements
		.iter()
		.map(|(key, value)| format!("{}{}{}", key, KEY_VALUE_DELIMITER, value))
		.collect::<Vec<_>>()
		.join(PAIR_DELIMITER)
}

fn decode_pair(segment: &str) -> Option<(String, String)> {
	let mut parts: Vec<String> = segment
		.split(KEY_VALUE_DELIMITER)
		.map(str::to_string)
		.collect();

	if parts[0].contains(ESCAPE_MARKER) {
		// Escaped pairs are re-read from the whole segment, split on the marker.
		match parts.get_mut(1) {
			Some(value) => *value = clean_value(value),
			None => parts.push(String::new()),
		}
		let joined = parts.join(",");
		let mut escaped = joined.split(ESCAPE_MARKER);
		let key = escaped.next()?;
		let value = escaped.next()?;
		return Some((
			key.to_string(),
			value.trim_end_matches(KEY_VALUE_DELIMITER).to_string(),
		));
	}

	let value = parts.get(1)?;
	Some((parts[0].clone(), clean_value(value)))
}

fn clean_value(value: &str) -> String {
	value.trim().trim_start_matches('~').to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_decode_simple_pairs() {
		let decoded = decode_field_elements("a,1||b,2");
		assert_eq!(decoded.get("a"), Some("1"));
		assert_eq!(decoded.get("b"), Some("2"));
		assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["a", "b"]);
	}

	#[test]
	fn test_decode_strips_escape_and_skips_empty_segment() {
		let decoded = decode_field_elements("a,~~1||");
		assert_eq!(decoded.len(), 1);
		assert_eq!(decoded.get("a"), Some("1"));
	}

	#[test]
	fn test_decode_trims_value_whitespace() {
		let decoded = decode_field_elements("grantor,  Jane Doe  ");
		assert_eq!(decoded.get("grantor"), Some("Jane Doe"));
	}

	#[test]
	fn test_decode_escaped_key_keeps_commas_in_value() {
		let decoded = decode_field_elements("legal~~Lot 4, Block 2,||apn,123");
		assert_eq!(decoded.get("legal"), Some("Lot 4,Block 2"));
		assert_eq!(decoded.get("apn"), Some("123"));
	}

	#[test]
	fn test_decode_escaped_key_without_comma() {
		let decoded = decode_field_elements("note~~hello");
		assert_eq!(decoded.get("note"), Some("hello"));
	}

	#[test]
	fn test_decode_drops_segment_without_value() {
		let decoded = decode_field_elements("orphan||k,v");
		assert_eq!(decoded.len(), 1);
		assert_eq!(decoded.get("k"), Some("v"));
	}

	#[test]
	fn test_decode_extra_commas_keep_first_value() {
		let decoded = decode_field_elements("k,first,second");
		assert_eq!(decoded.get("k"), Some("first"));
	}

	#[test]
	fn test_duplicate_key_last_write_wins_in_first_position() {
		let decoded = decode_field_elements("a,1||b,2||a,3");
		assert_eq!(decoded.get("a"), Some("3"));
		assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["a", "b"]);
	}

	#[test]
	fn test_decode_empty_input() {
		assert!(decode_field_elements("").is_empty());
		assert!(decode_field_elements("||||").is_empty());
	}

	#[test]
	fn test_redecoding_encoded_map_is_stable() {
		let original = decode_field_elements("a,~~1||b, 2 ||c~~x");
		let again = decode_field_elements(&encode_field_elements(&original));
		assert_eq!(again, original);
	}

	#[test]
	fn test_serializes_as_ordered_json_object() {
		let elements: FieldElements = [("z", "1"), ("a", "2")].into_iter().collect();
		let json = serde_json::to_string(&elements).unwrap();
		assert_eq!(json, r#"{"z":"1","a":"2"}"#);

		let back: FieldElements = serde_json::from_str(&json).unwrap();
		assert_eq!(back, elements);
	}
}
