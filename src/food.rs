//! Food classes and the per-class calorie regression.

use std::collections::HashMap;
use std::fmt;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Cubic centimeters per cubic meter.
const CM3_PER_M3: f64 = 1e6;

/// Closed set of food classes the classifier can emit, in model output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodClass {
    Subuta,
    Karaage,
    Croquette,
}

impl FoodClass {
    pub const ALL: [FoodClass; 3] = [FoodClass::Subuta, FoodClass::Karaage, FoodClass::Croquette];

    /// Class for a classifier output index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            FoodClass::Subuta => 0,
            FoodClass::Karaage => 1,
            FoodClass::Croquette => 2,
        }
    }

    /// Stable identifier used in config files and JSON output.
    pub fn key(self) -> &'static str {
        match self {
            FoodClass::Subuta => "subuta",
            FoodClass::Karaage => "karaage",
            FoodClass::Croquette => "croquette",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            FoodClass::Subuta => "Sweet and sour pork",
            FoodClass::Karaage => "Karaage",
            FoodClass::Croquette => "Croquette",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.key() == key)
    }
}

impl fmt::Display for FoodClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Raw classifier output: index into the model's class list and its score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassPrediction {
    pub class_index: usize,
    pub confidence: f32,
}

/// Resolved classification of one region.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationLabel {
    pub class: FoodClass,
    pub name: String,
    pub confidence: f32,
}

impl ClassificationLabel {
    /// Resolve a prediction against the class enumeration.
    pub fn from_prediction(prediction: ClassPrediction) -> Option<Self> {
        let class = FoodClass::from_index(prediction.class_index)?;
        Some(Self {
            class,
            name: class.display_name().to_string(),
            confidence: prediction.confidence,
        })
    }
}

/// Linear model `calories = volume_cm3 × slope + intercept`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub slope: f64,
    pub intercept: f64,
}

impl Coefficients {
    pub const fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }
}

/// Reference per-class fit.
pub fn default_coefficients(class: FoodClass) -> Coefficients {
    match class {
        FoodClass::Subuta => Coefficients::new(1.50, 33.1),
        FoodClass::Karaage => Coefficients::new(1.91, 53.4),
        FoodClass::Croquette => Coefficients::new(1.43, 7.30),
    }
}

/// Maps an estimated volume to calories with a per-class linear model.
#[derive(Clone, Debug)]
pub struct CalorieRegressor {
    table: HashMap<FoodClass, Coefficients>,
}

impl CalorieRegressor {
    pub fn new(table: HashMap<FoodClass, Coefficients>) -> Self {
        Self { table }
    }

    pub fn coefficients(&self, class: FoodClass) -> Option<Coefficients> {
        self.table.get(&class).copied()
    }

    /// Calories for `volume_m3` of `class`.
    ///
    /// The result is not clamped; a negative value points at an upstream
    /// volume estimation problem and is surfaced as-is.
    pub fn estimate(&self, class: FoodClass, volume_m3: f64) -> Result<f64> {
        let coefs = self
            .coefficients(class)
            .ok_or_else(|| anyhow!("no regression coefficients for class '{}'", class.key()))?;
        Ok(volume_m3 * CM3_PER_M3 * coefs.slope + coefs.intercept)
    }
}

impl Default for CalorieRegressor {
    fn default() -> Self {
        Self::new(
            FoodClass::ALL
                .into_iter()
                .map(|class| (class, default_coefficients(class)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subuta_regression_matches_reference_fit() -> Result<()> {
        let regressor = CalorieRegressor::default();
        let calories = regressor.estimate(FoodClass::Subuta, 2.0e-5)?;
        assert!((calories - 63.1).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn negative_volume_is_not_clamped() -> Result<()> {
        let regressor = CalorieRegressor::default();
        let calories = regressor.estimate(FoodClass::Croquette, -1.0e-5)?;
        assert!((calories - (-10.0 * 1.43 + 7.30)).abs() < 1e-9);
        assert!(calories < 0.0);
        Ok(())
    }

    #[test]
    fn missing_class_is_an_error() {
        let mut table = HashMap::new();
        table.insert(FoodClass::Karaage, Coefficients::new(1.91, 53.4));
        let regressor = CalorieRegressor::new(table);
        assert!(regressor.estimate(FoodClass::Subuta, 1e-5).is_err());
        assert!(regressor.estimate(FoodClass::Karaage, 1e-5).is_ok());
    }

    #[test]
    fn class_indices_round_trip() {
        for class in FoodClass::ALL {
            assert_eq!(FoodClass::from_index(class.index()), Some(class));
            assert_eq!(FoodClass::from_key(class.key()), Some(class));
        }
        assert_eq!(FoodClass::from_index(3), None);
    }

    #[test]
    fn out_of_range_prediction_has_no_label() {
        let prediction = ClassPrediction {
            class_index: 7,
            confidence: 0.9,
        };
        assert!(ClassificationLabel::from_prediction(prediction).is_none());
    }
}
