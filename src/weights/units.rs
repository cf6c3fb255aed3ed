use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const GRAMS_PER_OUNCE: f64 = 28.349_523_125;
const GRAMS_PER_POUND: f64 = 453.592_37;

/// Display unit for weights. Storage is always integer grams.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    G,
    Kg,
    Oz,
    Lb,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::G => "g",
            WeightUnit::Kg => "kg",
            WeightUnit::Oz => "oz",
            WeightUnit::Lb => "lb",
        }
    }

    pub fn from_grams(&self, grams: i64) -> f64 {
        let grams = grams as f64;
        match self {
            WeightUnit::G => grams,
            WeightUnit::Kg => grams / 1000.0,
            WeightUnit::Oz => grams / GRAMS_PER_OUNCE,
            WeightUnit::Lb => grams / GRAMS_PER_POUND,
        }
    }

    /// Round to whole grams when reading user input in this unit
    pub fn to_grams(&self, value: f64) -> i64 {
        let grams = match self {
            WeightUnit::G => value,
            WeightUnit::Kg => value * 1000.0,
            WeightUnit::Oz => value * GRAMS_PER_OUNCE,
            WeightUnit::Lb => value * GRAMS_PER_POUND,
        };
        grams.round() as i64
    }

    pub fn format(&self, grams: i64) -> String {
        let value = self.from_grams(grams);
        match self {
            WeightUnit::G => format!("{} {}", grams, self.as_str()),
            WeightUnit::Kg | WeightUnit::Lb => format!("{:.2} {}", value, self.as_str()),
            WeightUnit::Oz => format!("{:.1} {}", value, self.as_str()),
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightUnit {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "g" => Ok(WeightUnit::G),
            "kg" => Ok(WeightUnit::Kg),
            "oz" => Ok(WeightUnit::Oz),
            "lb" | "lbs" => Ok(WeightUnit::Lb),
            other => Err(CoreError::invalid(format!("unknown weight unit '{other}'"))),
        }
    }
}
