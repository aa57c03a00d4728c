//! Raw record normalization.
//!
//! The backend has shipped packages in two shapes over time: the hotel either
//! arrives embedded under `hotel` or as a JSON-encoded list under the legacy
//! `hoteles` key, and `categorias` and `galeria` are either arrays or encoded
//! strings.
//! Everything here runs once, at the cache boundary, and produces a canonical
//! [`Package`]. A malformed field never drops the record: it is cleared and
//! reported as a [`NormalizationIssue`].

use serde::Deserialize;
use serde_json::Value;
use tracing::error;

use crate::package::{Hotel, Package};

/// Package as it arrives from the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPackage {
    #[serde(default)]
    pub hotel: Option<Value>,
    #[serde(default)]
    pub hoteles: Option<Value>,
    #[serde(default)]
    pub categorias: Option<Value>,
    #[serde(default)]
    pub galeria: Option<Value>,
    #[serde(flatten)]
    pub base: Package,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizationError {
    #[error("Malformed hotel: {0}")]
    MalformedHotel(String),

    #[error("Malformed legacy hotel list: {0}")]
    MalformedHotelList(String),

    #[error("Malformed category list: {0}")]
    MalformedCategories(String),

    #[error("Malformed gallery: {0}")]
    MalformedGallery(String),
}

/// A field that could not be parsed and was cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationIssue {
    pub package_id: Option<i64>,
    pub error: NormalizationError,
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub package: Package,
    pub issues: Vec<NormalizationIssue>,
}

/// Where the hotel descriptor of a raw record lives.
#[derive(Debug, Clone, PartialEq)]
pub enum HotelSource {
    Embedded(Value),
    LegacyList(Value),
    Absent,
}

impl HotelSource {
    /// The embedded object wins over the legacy list.
    pub fn classify(hotel: Option<Value>, hoteles: Option<Value>) -> Self {
        match (hotel, hoteles) {
            (Some(embedded), _) if !embedded.is_null() => HotelSource::Embedded(embedded),
            (_, Some(legacy)) if !legacy.is_null() => HotelSource::LegacyList(legacy),
            _ => HotelSource::Absent,
        }
    }

    pub fn resolve(self) -> Result<Option<Hotel>, NormalizationError> {
        match self {
            HotelSource::Absent => Ok(None),
            HotelSource::Embedded(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| NormalizationError::MalformedHotel(e.to_string())),
            HotelSource::LegacyList(Value::String(encoded)) => {
                if encoded.trim().is_empty() {
                    return Ok(None);
                }
                let hotels: Vec<Hotel> = serde_json::from_str(&encoded)
                    .map_err(|e| NormalizationError::MalformedHotelList(e.to_string()))?;
                Ok(hotels.into_iter().next())
            }
            HotelSource::LegacyList(list @ Value::Array(_)) => {
                let hotels: Vec<Hotel> = serde_json::from_value(list)
                    .map_err(|e| NormalizationError::MalformedHotelList(e.to_string()))?;
                Ok(hotels.into_iter().next())
            }
            HotelSource::LegacyList(other) => Err(NormalizationError::MalformedHotelList(
                format!("expected a list, got {}", other),
            )),
        }
    }
}

/// A list of strings sent either as a JSON array or as its encoded form.
fn resolve_string_list(
    raw: Option<Value>,
    malformed: fn(String) -> NormalizationError,
) -> Result<Vec<String>, NormalizationError> {
    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(encoded)) if encoded.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(encoded)) => {
            serde_json::from_str(&encoded).map_err(|e| malformed(e.to_string()))
        }
        Some(list @ Value::Array(_)) => {
            serde_json::from_value(list).map_err(|e| malformed(e.to_string()))
        }
        Some(other) => Err(malformed(format!("expected a list, got {}", other))),
    }
}

/// Turn a raw record into the canonical package shape.
pub fn normalize_package(raw: RawPackage) -> Normalized {
    let RawPackage {
        hotel,
        hoteles,
        categorias,
        galeria,
        base: mut package,
    } = raw;
    let mut issues = Vec::new();

    match HotelSource::classify(hotel, hoteles).resolve() {
        Ok(hotel) => package.hotel = hotel,
        Err(error) => {
            package.hotel = None;
            issues.push(NormalizationIssue { package_id: package.id, error });
        }
    }

    match resolve_string_list(categorias, NormalizationError::MalformedCategories) {
        Ok(categories) => package.categories = categories,
        Err(error) => {
            package.categories = Vec::new();
            issues.push(NormalizationIssue { package_id: package.id, error });
        }
    }

    match resolve_string_list(galeria, NormalizationError::MalformedGallery) {
        Ok(gallery) => package.gallery = gallery,
        Err(error) => {
            package.gallery = Vec::new();
            issues.push(NormalizationIssue { package_id: package.id, error });
        }
    }

    package.iata_city_code = package
        .iata_city_code
        .take()
        .map(|code| code.trim().to_uppercase())
        .filter(|code| !code.is_empty());

    for issue in &issues {
        error!(package_id = ?issue.package_id, "Package normalization: {}", issue.error);
    }

    Normalized { package, issues }
}
