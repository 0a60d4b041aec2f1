use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A synthetic product record, the unit of data written to every backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    pub price: Price,
    pub category: String,
}

/// A strictly positive price with two decimal places, held as whole cents.
///
/// Serialized as a decimal number, e.g. `12.34`, so that backends can aggregate over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: u32,
}

impl Price {
    /// Returns `None` for a zero price.
    pub fn from_cents(cents: u32) -> Option<Self> {
        (cents > 0).then_some(Self { cents })
    }

    /// Rounds to the nearest cent. Returns `None` unless the rounded value is positive.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents < 1.0 || cents > u32::MAX as f64 {
            return None;
        }
        Self::from_cents(cents as u32)
    }

    /// Builds a price from cents, lifting zero to the smallest valid price.
    pub(crate) fn at_least_one_cent(cents: u32) -> Self {
        Self {
            cents: cents.max(1),
        }
    }

    pub fn cents(self) -> u32 {
        self.cents
    }

    pub fn as_f64(self) -> f64 {
        self.cents as f64 / 100.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Price::from_decimal(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid price: {value}")))
    }
}
