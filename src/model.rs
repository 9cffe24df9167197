use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Nutrition record for one serving of a product, as returned by the backend.
///
/// Values are never edited in place; [`FoodItem::scaled`] produces an
/// adjusted copy for a user-chosen quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub food_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub brand_name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub calories: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub proteins: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub carbs: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fats: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fiber: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sugar: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub saturated_fat: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub polyunsaturated_fat: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monounsaturated_fat: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trans_fat: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cholesterol: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sodium: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub potassium: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vitamin_a: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vitamin_c: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub calcium: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub iron: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    #[serde(default = "default_serving_unit")]
    pub serving_unit: String,
    #[serde(default = "default_serving_weight")]
    pub serving_weight_grams: f64,
    #[serde(default = "default_serving_qty")]
    pub serving_qty: f64,
    #[serde(default)]
    pub healthiness_rating: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("quantity multiplier must be a positive finite number, got {0}")]
pub struct ScaleError(pub f64);

fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

fn default_serving_unit() -> String {
    "1 serving".to_string()
}

fn default_serving_weight() -> f64 {
    100.0
}

fn default_serving_qty() -> f64 {
    1.0
}

impl FoodItem {
    /// Copy of this item with every nutrient and the serving size multiplied
    /// by `multiplier`. The rating is per-food, so it is carried over as is.
    pub fn scaled(&self, multiplier: f64) -> Result<FoodItem, ScaleError> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ScaleError(multiplier));
        }
        let m = |v: f64| v * multiplier;
        Ok(FoodItem {
            calories: m(self.calories),
            proteins: m(self.proteins),
            carbs: m(self.carbs),
            fats: m(self.fats),
            fiber: m(self.fiber),
            sugar: m(self.sugar),
            saturated_fat: m(self.saturated_fat),
            polyunsaturated_fat: m(self.polyunsaturated_fat),
            monounsaturated_fat: m(self.monounsaturated_fat),
            trans_fat: m(self.trans_fat),
            cholesterol: m(self.cholesterol),
            sodium: m(self.sodium),
            potassium: m(self.potassium),
            vitamin_a: m(self.vitamin_a),
            vitamin_c: m(self.vitamin_c),
            calcium: m(self.calcium),
            iron: m(self.iron),
            serving_weight_grams: m(self.serving_weight_grams),
            serving_qty: m(self.serving_qty),
            ..self.clone()
        })
    }

    /// Rating from the backend when present, otherwise computed locally.
    pub fn healthiness(&self) -> u8 {
        self.healthiness_rating
            .unwrap_or_else(|| healthiness_rating(self))
    }

    pub fn display_name(&self) -> String {
        if self.brand_name.trim().is_empty() {
            self.food_name.clone()
        } else {
            format!("{} ({})", self.food_name, self.brand_name)
        }
    }
}

/// 1..=10 score for a single serving. Protein and fiber density raise the
/// score; sugar share of carbs, saturated fat share of energy, cholesterol,
/// sodium and calorie density lower it.
pub fn healthiness_rating(item: &FoodItem) -> u8 {
    let calories = item.calories;
    let mut score = 4.0_f64;

    if item.proteins > 0.0 && calories > 0.0 {
        score += (item.proteins / calories * 400.0).min(2.0);
    }
    if item.fiber > 0.0 && calories > 0.0 {
        score += (item.fiber / calories * 400.0).min(1.5);
    }

    if item.sugar > 0.0 && item.carbs > 0.0 {
        score -= item.sugar / item.carbs * 3.0;
    } else if item.sugar > 10.0 {
        score -= 1.5;
    }

    if item.saturated_fat > 0.0 && calories > 0.0 {
        score -= item.saturated_fat * 9.0 / calories * 4.0;
    }
    if item.cholesterol > 50.0 {
        score -= (item.cholesterol / 100.0).min(1.5);
    }
    if item.sodium > 400.0 {
        score -= ((item.sodium - 400.0) / 600.0).min(2.0);
    }
    if calories > 300.0 {
        score -= ((calories - 300.0) / 200.0).min(1.0);
    }

    score.round_ties_even().clamp(1.0, 10.0) as u8
}
