//! Serde helpers for the loosely typed scalars the backend emits.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(i64),
    Float(f64),
}

/// Accepts `"7"`, `7` or `7.5` and yields the textual form. `null` and `""` become `None`.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<StringOrNumber> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => None,
        Some(StringOrNumber::Str(s)) if s.trim().is_empty() => None,
        Some(StringOrNumber::Str(s)) => Some(s),
        Some(StringOrNumber::Int(i)) => Some(i.to_string()),
        Some(StringOrNumber::Float(f)) => Some(f.to_string()),
    })
}

/// Explicit `null` decodes like a missing key.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The backend uses `0` as the "not yet created" identity.
pub fn zero_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let id: Option<i64> = Option::deserialize(deserializer)?;
    Ok(id.filter(|id| *id != 0))
}
