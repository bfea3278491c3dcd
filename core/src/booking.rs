// vitrine/src/booking.rs
use std::fmt;
use std::str::FromStr;

/// Availability of a booking as a whole, derived from its products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
  Disponible,
  Indisponible,
}

impl BookingStatus {
  /// `Indisponible` as soon as one linked product is unavailable. A booking
  /// without products is `Disponible`.
  pub fn derive<I>(product_availability: I) -> Self
  where
    I: IntoIterator<Item = bool>,
  {
    if product_availability.into_iter().all(|available| available) {
      BookingStatus::Disponible
    } else {
      BookingStatus::Indisponible
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      BookingStatus::Disponible => "Disponible",
      BookingStatus::Indisponible => "Indisponible",
    }
  }
}

impl fmt::Display for BookingStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown booking status '{0}'")]
pub struct UnknownBookingStatus(pub String);

impl FromStr for BookingStatus {
  type Err = UnknownBookingStatus;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Disponible" => Ok(BookingStatus::Disponible),
      "Indisponible" => Ok(BookingStatus::Indisponible),
      other => Err(UnknownBookingStatus(other.to_string())),
    }
  }
}
