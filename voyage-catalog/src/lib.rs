pub mod wire;
pub mod package;
pub mod departure;
pub mod normalize;
pub mod payload;

pub use package::{Hotel, Package, Priority, DUPLICATE_SUFFIX};
pub use departure::{Departure, FlightLeg, PricingMatrix, TierPrice, TransportMode};
pub use normalize::{
    normalize_package, HotelSource, NormalizationError, NormalizationIssue, Normalized, RawPackage,
};
pub use payload::{ImageAttachment, PackageForm, PackagePayload, PayloadError};
