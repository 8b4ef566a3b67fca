//! Helpers for the loosely typed JSON the backend produces.

use serde::{Deserialize, Deserializer, Serializer};

/// Ids arrive as JSON numbers from the API but as strings when they come from a route
/// parameter or a hand-edited session file.
pub mod lenient_id {
    use super::*;

    pub fn serialize<S>(id: &i64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(*id)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IdValue {
            Number(i64),
            String(String),
        }

        match IdValue::deserialize(deserializer)? {
            IdValue::Number(n) => Ok(n),
            IdValue::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Treats an explicit `null` the same as a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Row {
        #[serde(with = "lenient_id")]
        id: i64,
        #[serde(default, deserialize_with = "null_as_default")]
        name: String,
    }

    #[test]
    fn test_lenient_id_accepts_numbers_and_strings() {
        let row: Row = serde_json::from_str(r#"{"id": 7, "name": "a"}"#).unwrap();
        assert_eq!(row.id, 7);

        let row: Row = serde_json::from_str(r#"{"id": " 42 "}"#).unwrap();
        assert_eq!(row.id, 42);
        assert_eq!(row.name, "");

        assert!(serde_json::from_str::<Row>(r#"{"id": "abc"}"#).is_err());
    }

    #[test]
    fn test_null_as_default() {
        let row: Row = serde_json::from_str(r#"{"id": 1, "name": null}"#).unwrap();
        assert_eq!(row.name, "");
    }
}
