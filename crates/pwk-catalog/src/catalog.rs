use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Micros, SubscriptionPeriod};

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

/// A purchasable subscription plan as described by the commerce platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable store identifier (e.g. `"premium.monthly"`).
    pub id: String,
    pub display_name: String,
    pub price: Micros,
    /// Localized price string exactly as the store renders it (e.g. `"$9.99"`).
    pub price_display: String,
    pub period: SubscriptionPeriod,
    /// `true` when the introductory offer is a free trial.
    pub intro_offer_is_free: bool,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        price: Micros,
        price_display: impl Into<String>,
        period: SubscriptionPeriod,
    ) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            price,
            price_display: price_display.into(),
            period,
            intro_offer_is_free: false,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_free_trial(mut self, free: bool) -> Self {
        self.intro_offer_is_free = free;
        self
    }

    /// Cost per day in currency units. Display/diagnostics only.
    pub fn cost_per_day(&self) -> f64 {
        self.price.to_f64() / self.period.days() as f64
    }

    /// "$9.99 / month", "$24.99 / 3 months".
    pub fn price_per_period(&self) -> String {
        format!("{} / {}", self.price_display, self.period.unit_label())
    }

    /// Exact comparison of cost per day against `other`.
    ///
    /// `price_a / days_a` vs `price_b / days_b` is decided on
    /// `price_a * days_b` vs `price_b * days_a` so no rounding is involved.
    pub fn cmp_cost_per_day(&self, other: &Product) -> Ordering {
        let lhs = i128::from(self.price.raw()) * i128::from(other.period.days());
        let rhs = i128::from(other.price.raw()) * i128::from(self.period.days());
        lhs.cmp(&rhs)
    }
}

/// Rounded percentage `candidate` saves per day relative to `baseline`.
///
/// `None` when the candidate is not strictly cheaper per day, or when the
/// baseline is free (no meaningful percentage).
pub fn savings_percent(candidate: &Product, baseline: &Product) -> Option<u32> {
    if baseline.price.is_zero() || candidate.cmp_cost_per_day(baseline) != Ordering::Less {
        return None;
    }
    // 1 - (pc / dc) / (pb / db) = (pb*dc - pc*db) / (pb*dc)
    let pb_dc = i128::from(baseline.price.raw()) * i128::from(candidate.period.days());
    let pc_db = i128::from(candidate.price.raw()) * i128::from(baseline.period.days());
    let num = (pb_dc - pc_db) * 100;
    // Round half up.
    let pct = (2 * num + pb_dc) / (2 * pb_dc);
    u32::try_from(pct).ok()
}

// ---------------------------------------------------------------------------
// ProductIds
// ---------------------------------------------------------------------------

/// Ordered, de-duplicated set of product identifiers the app sells.
///
/// The reconciler uses this set to decide which transactions belong to us.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductIds(BTreeSet<String>);

impl ProductIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ProductIds {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The plan with the lowest cost per day and what it saves against the
/// most expensive plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BestValue<'a> {
    pub product: &'a Product,
    pub savings_percent: Option<u32>,
}

/// Ordered product list, rebuilt wholesale from each platform fetch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn product_ids(&self) -> ProductIds {
        self.products.iter().map(|p| p.id.clone()).collect()
    }

    /// Lowest cost per day. Ties keep catalog order (first wins).
    pub fn most_cost_effective(&self) -> Option<&Product> {
        self.products.iter().reduce(|best, p| {
            if p.cmp_cost_per_day(best) == Ordering::Less {
                p
            } else {
                best
            }
        })
    }

    /// Highest cost per day. Ties keep catalog order (first wins).
    pub fn least_cost_effective(&self) -> Option<&Product> {
        self.products.iter().reduce(|worst, p| {
            if p.cmp_cost_per_day(worst) == Ordering::Greater {
                p
            } else {
                worst
            }
        })
    }

    /// Best plan plus its savings against the most expensive per-day plan.
    pub fn best_value(&self) -> Option<BestValue<'_>> {
        let product = self.most_cost_effective()?;
        let baseline = self.least_cost_effective()?;
        Some(BestValue {
            product,
            savings_percent: savings_percent(product, baseline),
        })
    }

    /// Products sorted by ascending total price (paywall display order).
    pub fn sorted_by_price(&self) -> Vec<&Product> {
        let mut out: Vec<&Product> = self.products.iter().collect();
        out.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.id.cmp(&b.id)));
        out
    }
}
