use serde::{Deserialize, Serialize};

/// Running-average rating fields on a catalog menu-item document.
///
/// Only these two fields participate in the rating transaction; the rest of
/// the menu-item document is preserved untouched by the aggregator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemRating {
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub rating_count: i64,
}

impl MenuItemRating {
    /// Folds one new rating into the running average.
    pub fn fold(self, user_rating: f64) -> Self {
        let new_count = self.rating_count + 1;
        Self {
            rating: (self.rating * self.rating_count as f64 + user_rating) / new_count as f64,
            rating_count: new_count,
        }
    }
}
