use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::departure::Departure;
use crate::wire;

/// Marker appended to the title of a duplicated package.
pub const DUPLICATE_SUFFIX: &str = " (copy)";

/// Listing priority of a package inside the agency storefront
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Priority {
    #[serde(rename = "alta")]
    High,
    #[default]
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "baja")]
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "alta",
            Priority::Medium => "media",
            Priority::Low => "baja",
        }
    }
}

/// Hotel attached to a package
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Hotel {
    pub id: i64,
    #[serde(rename = "nombre", default, deserialize_with = "wire::null_as_default")]
    pub name: String,
    #[serde(rename = "estrellas", default)]
    pub stars: Option<u8>,
}

/// A self-managed travel offer owned by exactly one agency.
///
/// This is the canonical shape held by the cache. Wire-level ambiguity
/// (legacy hotel lists, encoded category strings) is resolved by
/// [`crate::normalize_package`] before a value of this type exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Package {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "titulo", default, deserialize_with = "wire::null_as_default")]
    pub title: String,
    #[serde(rename = "descripcion", default, deserialize_with = "wire::null_as_default")]
    pub description: String,
    #[serde(rename = "pais", default, deserialize_with = "wire::null_as_default")]
    pub country: String,
    #[serde(rename = "ciudad", default, deserialize_with = "wire::null_as_default")]
    pub city: String,
    #[serde(rename = "ciudad_iata", default)]
    pub iata_city_code: Option<String>,
    #[serde(rename = "fecha_vigencia_desde", default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(rename = "fecha_vigencia_hasta", default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(rename = "cant_noches", default, deserialize_with = "wire::null_as_default")]
    pub nights: u32,
    #[serde(rename = "activo", default, deserialize_with = "wire::null_as_default")]
    pub active: bool,
    #[serde(rename = "prioridad", default, deserialize_with = "wire::null_as_default")]
    pub priority: Priority,
    #[serde(rename = "moneda", default, deserialize_with = "wire::null_as_default")]
    pub currency: String,
    #[serde(rename = "descuento", default, deserialize_with = "wire::opt_string_or_number")]
    pub discount: Option<String>,
    #[serde(default)]
    pub hotel: Option<Hotel>,
    #[serde(rename = "categorias", default, deserialize_with = "wire::null_as_default")]
    pub categories: Vec<String>,
    #[serde(rename = "imagen", default)]
    pub image: Option<String>,
    #[serde(rename = "galeria", default, deserialize_with = "wire::null_as_default")]
    pub gallery: Vec<String>,
    /// Owning agency reference
    #[serde(rename = "usuario_id", default, deserialize_with = "wire::opt_string_or_number")]
    pub agency_ref: Option<String>,
    #[serde(rename = "salidas", default, deserialize_with = "wire::null_as_default")]
    pub departures: Vec<Departure>,
}

impl Package {
    /// Empty package used to seed a "create new" form
    pub fn blank() -> Self {
        Self {
            active: true,
            ..Self::default()
        }
    }

    /// Derive the pre-fill for a duplicate form: no identity, marked title, forced active.
    pub fn duplicate_seed(&self) -> Package {
        self.duplicate_seed_with(DUPLICATE_SUFFIX)
    }

    pub fn duplicate_seed_with(&self, suffix: &str) -> Package {
        Package {
            id: None,
            title: format!("{}{}", self.title, suffix),
            active: true,
            ..self.clone()
        }
    }

    pub fn owning_agency(&self) -> Option<&str> {
        self.agency_ref.as_deref()
    }
}
