//! Serde helpers for lenient inbound payloads.
//!
//! When the `tracing` feature is enabled, payload extraction also logs every
//! field the target type does not capture and the exact path of a field that
//! fails to decode, which surfaces server-side schema drift early.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A `serde_as` type that accepts either RFC 3339 text or integer epoch
/// milliseconds as a `DateTime<Utc>`.
///
/// Use with `#[serde_as(as = "TimestampFromAny")]`.
pub struct TimestampFromAny;

impl<'de> serde_with::DeserializeAs<'de, DateTime<Utc>> for TimestampFromAny {
    fn deserialize_as<D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use std::fmt;

        use serde::de::{self, Visitor};

        struct TimestampVisitor;

        impl Visitor<'_> for TimestampVisitor {
            type Value = DateTime<Utc>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("RFC 3339 timestamp or epoch milliseconds")
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                DateTime::parse_from_rfc3339(v)
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(E::custom)
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                DateTime::from_timestamp_millis(v)
                    .ok_or_else(|| E::custom(format!("timestamp {v} out of range")))
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                let millis = i64::try_from(v).map_err(E::custom)?;
                self.visit_i64(millis)
            }
        }

        deserializer.deserialize_any(TimestampVisitor)
    }
}

impl serde_with::SerializeAs<DateTime<Utc>> for TimestampFromAny {
    fn serialize_as<S>(source: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&source.to_rfc3339())
    }
}

/// Decode a payload, logging fields the target type ignores.
///
/// Unknown fields never fail the decode; they only produce warnings.
///
/// # Example
///
/// ```ignore
/// let data = serde_json::json!({ "message": "ward more", "emoji": "eyes" });
/// let tip: CoachingSuggestion = deserialize_with_warnings(&data)?;
/// // Logs: WARN field="emoji" unknown payload field
/// ```
#[cfg(feature = "tracing")]
pub fn deserialize_with_warnings<T: DeserializeOwned>(value: &Value) -> crate::Result<T> {
    use std::any::type_name;

    tracing::trace!(
        type_name = %type_name::<T>(),
        json = %value,
        "decoding payload"
    );

    let mut unknown_paths: Vec<String> = Vec::new();

    let result: T = serde_ignored::deserialize(value, |path| {
        unknown_paths.push(path.to_string());
    })
    .inspect_err(|_| {
        // Decode again to learn where it broke
        if let Err(path_err) = serde_path_to_error::deserialize::<_, T>(value) {
            let path = path_err.path().to_string();
            tracing::warn!(
                type_name = %type_name::<T>(),
                path = %path,
                value = %format_value(lookup_value(value, &path)),
                error = %path_err.inner(),
                "payload decoding failed"
            );
        }
    })?;

    for path in unknown_paths {
        tracing::warn!(
            type_name = %type_name::<T>(),
            field = %path,
            value = %format_value(lookup_value(value, &path)),
            "unknown payload field"
        );
    }

    Ok(result)
}

/// Pass-through decode when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub fn deserialize_with_warnings<T: DeserializeOwned>(value: &Value) -> crate::Result<T> {
    use serde::Deserialize as _;

    Ok(T::deserialize(value)?)
}

/// Follow a `serde_ignored` or `serde_path_to_error` path into `value`.
///
/// Accepts `a.b`, `a[0].b` and `a.0.b`; `?` segments (option wrappers) are skipped.
#[cfg(feature = "tracing")]
fn lookup_value<'value>(value: &'value Value, path: &str) -> Option<&'value Value> {
    path.split(['.', '[', ']'])
        .filter(|segment| !segment.is_empty() && *segment != "?")
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
            _ => None,
        })
}

#[cfg(feature = "tracing")]
fn format_value(value: Option<&Value>) -> String {
    value.map_or_else(|| "<unable to retrieve>".to_owned(), Value::to_string)
}
