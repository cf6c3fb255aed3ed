use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::db::models::Pack;

/// Carried and worn grams for one category
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWeight {
    pub carried: i64,
    pub worn: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LabelWeight {
    pub weight: i64,
    pub color: String,
}

/// Weight breakdown of a hydrated pack, in grams.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeightSummary {
    /// Grand total of carried (packed) weight
    pub total: i64,
    /// Grand total of worn weight
    pub worn: i64,
    pub by_category: BTreeMap<String, CategoryWeight>,
    pub by_label: BTreeMap<String, LabelWeight>,
    /// Sum of membership counts, not distinct items
    pub total_item_count: i64,
}

impl WeightSummary {
    /// Everything the hiker moves: carried plus worn
    pub fn combined(&self) -> i64 {
        self.total.saturating_add(self.worn)
    }
}

/// Aggregate carried/worn weight per category and per label. No I/O.
///
/// Sums saturate at `i64::MAX` instead of overflowing.
pub fn aggregate_weights(pack: &Pack) -> WeightSummary {
    let mut summary = WeightSummary::default();

    for pack_item in &pack.items {
        let weight = pack_item.item.weight;
        let carried = weight.saturating_mul(pack_item.carried_count());
        let worn = weight.saturating_mul(pack_item.worn_count);

        let category = summary
            .by_category
            .entry(pack_item.item.category_name.clone())
            .or_default();
        category.carried = category.carried.saturating_add(carried);
        category.worn = category.worn.saturating_add(worn);

        summary.total = summary.total.saturating_add(carried);
        summary.worn = summary.worn.saturating_add(worn);
        summary.total_item_count = summary.total_item_count.saturating_add(pack_item.count);

        for assignment in &pack_item.labels {
            let label = summary.by_label.entry(assignment.name.clone()).or_default();
            label.weight = label
                .weight
                .saturating_add(weight.saturating_mul(assignment.count));
            label.color = assignment.color.clone();
        }
    }

    summary
}
