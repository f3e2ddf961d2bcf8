//! Serde helpers for the module catalog document.
//!
//! The catalog is a JSON object keyed by module name. Discovery listings follow the document's
//! key order, which a plain map would lose, so entries are collected in order here.

use std::{collections::HashSet, fmt, marker::PhantomData};

use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, Visitor};

use crate::registry::RemoteMethod;

/// Parse an HTTP method leniently: `POST` in any case is POST, every other string is GET.
pub fn de_method_lenient<'de, D>(deserializer: D) -> Result<RemoteMethod, D::Error>
where
    D: Deserializer<'de>,
{
    struct V;

    impl<'de> Visitor<'de> for V {
        type Value = RemoteMethod;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an HTTP method name (GET or POST)")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.trim().eq_ignore_ascii_case("post") {
                Ok(RemoteMethod::Post)
            } else {
                Ok(RemoteMethod::Get)
            }
        }

        fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            self.visit_str(&v)
        }
    }

    deserializer.deserialize_str(V)
}

/// Collect a JSON object into `(key, value)` pairs in document order.
///
/// Duplicate keys are rejected instead of silently keeping the last one.
pub fn de_ordered_entries<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    struct V<T>(PhantomData<T>);

    impl<'de, T> Visitor<'de> for V<T>
    where
        T: DeserializeOwned,
    {
        type Value = Vec<(String, T)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an object keyed by module name")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut seen = HashSet::new();
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(key) = map.next_key::<String>()? {
                if !seen.insert(key.clone()) {
                    return Err(de::Error::custom(format!("duplicate module '{key}'")));
                }
                let value = map.next_value::<T>()?;
                out.push((key, value));
            }
            Ok(out)
        }
    }

    deserializer.deserialize_map(V(PhantomData))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Entry {
        #[serde(deserialize_with = "de_method_lenient")]
        method: RemoteMethod,
    }

    fn parse(json: &str) -> Result<Vec<(String, Entry)>, serde_json::Error> {
        de_ordered_entries(&mut serde_json::Deserializer::from_str(json))
    }

    #[test]
    fn keeps_document_order() {
        let entries =
            parse(r#"{ "zeta": { "method": "GET" }, "alpha": { "method": "post" } }"#).unwrap();
        let names: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(entries[1].1.method, RemoteMethod::Post);
    }

    #[test]
    fn unknown_methods_fall_back_to_get() {
        let entries = parse(r#"{ "a": { "method": "PUT" } }"#).unwrap();
        assert_eq!(entries[0].1.method, RemoteMethod::Get);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = parse(r#"{ "a": { "method": "GET" }, "a": { "method": "POST" } }"#).unwrap_err();
        assert!(err.to_string().contains("duplicate module 'a'"));
    }

    #[test]
    fn rejects_non_string_methods() {
        assert!(parse(r#"{ "a": { "method": 1 } }"#).is_err());
    }
}
