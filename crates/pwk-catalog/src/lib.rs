//! pwk-catalog
//!
//! Subscription catalog model and pricing derivations.
//!
//! - Prices are fixed-point micros parsed from decimal strings (no floats at
//!   the boundary).
//! - Cost-per-day comparisons use exact integer cross-multiplication.
//! - Display strings (period labels, "price / period") are plain English;
//!   localization belongs to the host application.
//!
//! Pure deterministic logic. No IO, no clock.

mod catalog;
mod money;
mod period;

pub use catalog::{savings_percent, BestValue, Catalog, Product, ProductIds};
pub use money::{Micros, MoneyParseError, MICROS_SCALE};
pub use period::{PeriodUnit, SubscriptionPeriod};
