use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::wire;

/// How travellers reach the destination
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransportMode {
    #[serde(rename = "avion")]
    Air,
    #[serde(rename = "bus")]
    Bus,
    #[default]
    #[serde(rename = "sin_transporte")]
    NoTransport,
}

impl TransportMode {
    pub fn carries_legs(&self) -> bool {
        !matches!(self, TransportMode::NoTransport)
    }
}

/// One direction of travel. Every field is optional; all of them are
/// meaningless when the departure has no transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlightLeg {
    #[serde(rename = "fecha_origen", default)]
    pub origin_date: Option<NaiveDate>,
    #[serde(rename = "hora_origen", default)]
    pub origin_time: Option<String>,
    #[serde(rename = "ciudad_origen", default)]
    pub origin_city: Option<String>,
    #[serde(rename = "fecha_destino", default)]
    pub destination_date: Option<NaiveDate>,
    #[serde(rename = "hora_destino", default)]
    pub destination_time: Option<String>,
    #[serde(rename = "ciudad_destino", default)]
    pub destination_city: Option<String>,
    #[serde(rename = "clase", default)]
    pub flight_class: Option<String>,
    #[serde(rename = "aerolinea", default)]
    pub carrier: Option<String>,
    #[serde(rename = "numero_vuelo", default)]
    pub flight_number: Option<String>,
    #[serde(rename = "escalas", default)]
    pub stopover: Option<String>,
}

impl FlightLeg {
    pub fn is_empty(&self) -> bool {
        *self == FlightLeg::default()
    }
}

/// Price components for one occupancy tier
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TierPrice {
    #[serde(rename = "precio", default, deserialize_with = "wire::null_as_default")]
    pub base: f64,
    #[serde(rename = "impuesto", default, deserialize_with = "wire::null_as_default")]
    pub tax: f64,
    #[serde(rename = "tasa_1", default, deserialize_with = "wire::null_as_default")]
    pub fee_1: f64,
    #[serde(rename = "tasa_2", default, deserialize_with = "wire::null_as_default")]
    pub fee_2: f64,
}

/// Occupancy tier x price component matrix
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PricingMatrix {
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub single: TierPrice,
    #[serde(rename = "doble", default, deserialize_with = "wire::null_as_default")]
    pub double: TierPrice,
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub triple: TierPrice,
    #[serde(rename = "cuadruple", default, deserialize_with = "wire::null_as_default")]
    pub quadruple: TierPrice,
    #[serde(rename = "familia_1", default, deserialize_with = "wire::null_as_default")]
    pub family_1: TierPrice,
    #[serde(rename = "familia_2", default, deserialize_with = "wire::null_as_default")]
    pub family_2: TierPrice,
}

/// A scheduled instance of a package
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Departure {
    #[serde(
        default,
        deserialize_with = "wire::zero_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,
    #[serde(rename = "paquete_id", default, deserialize_with = "wire::null_as_default")]
    pub package_id: i64,
    #[serde(rename = "fecha_viaje", default)]
    pub travel_date: Option<NaiveDate>,
    #[serde(rename = "fecha_desde", default)]
    pub window_from: Option<NaiveDate>,
    #[serde(rename = "fecha_hasta", default)]
    pub window_to: Option<NaiveDate>,
    #[serde(rename = "cupos", default, deserialize_with = "wire::null_as_default")]
    pub capacity: u32,
    #[serde(rename = "venta_online", default, deserialize_with = "wire::null_as_default")]
    pub online_sale: bool,
    #[serde(rename = "tipo_transporte", default, deserialize_with = "wire::null_as_default")]
    pub transport: TransportMode,
    #[serde(rename = "vuelo_ida", default, deserialize_with = "wire::null_as_default")]
    pub outbound: FlightLeg,
    #[serde(rename = "vuelo_vuelta", default, deserialize_with = "wire::null_as_default")]
    pub inbound: FlightLeg,
    #[serde(rename = "precios", default, deserialize_with = "wire::null_as_default")]
    pub pricing: PricingMatrix,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Departure {
    pub fn blank_for(package_id: i64) -> Self {
        Self {
            package_id,
            ..Self::default()
        }
    }

    /// Null every flight-leg field when the departure has no transport.
    ///
    /// Applied at submission time so stale leg values typed before the
    /// transport mode was switched never leave the console.
    pub fn sanitize_transport(&mut self) {
        if !self.transport.carries_legs() {
            self.outbound = FlightLeg::default();
            self.inbound = FlightLeg::default();
        }
    }

    pub fn sanitized(mut self) -> Self {
        self.sanitize_transport();
        self
    }

    /// Pre-fill for a duplicate form: identity and server timestamps stripped.
    pub fn duplicate_seed(&self) -> Departure {
        Departure {
            id: None,
            created_at: None,
            updated_at: None,
            ..self.clone()
        }
    }
}
