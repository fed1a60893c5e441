//! Typed view of the merged config.
//!
//! ```yaml
//! products:
//!   ids: [premium.monthly, premium.yearly]
//! storage:
//!   key: is_premium
//!   path: ./pwk-entitlement.json
//! catalog:            # optional; offline plan list for `pwk plans`
//!   - id: premium.monthly
//!     price: "9.99"
//!     price_display: "$9.99"
//!     period: { unit: month, value: 1 }
//! ```

use anyhow::{bail, Context, Result};
use pwk_catalog::{Catalog, Micros, Product, ProductIds, SubscriptionPeriod};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementConfig {
    #[serde(default)]
    pub products: ProductsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductsConfig {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_key")]
    pub key: String,
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
            path: default_storage_path(),
        }
    }
}

fn default_storage_key() -> String {
    "is_premium".to_string()
}

fn default_storage_path() -> String {
    "pwk-entitlement.json".to_string()
}

/// Offline product description. Price is a decimal string, never a float.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub price: String,
    pub price_display: String,
    pub period: SubscriptionPeriod,
    #[serde(default)]
    pub intro_offer_is_free: bool,
}

impl CatalogEntry {
    pub fn to_product(&self) -> Result<Product> {
        let price = Micros::parse_decimal(&self.price)
            .with_context(|| format!("catalog entry '{}' has an invalid price", self.id))?;
        let mut product = Product::new(&self.id, price, &self.price_display, self.period)
            .with_free_trial(self.intro_offer_is_free);
        if let Some(name) = &self.display_name {
            product = product.with_display_name(name);
        }
        Ok(product)
    }
}

impl EntitlementConfig {
    /// Product ids to reconcile against. Falls back to catalog ids when
    /// `products.ids` is empty.
    pub fn product_ids(&self) -> ProductIds {
        if self.products.ids.is_empty() {
            self.catalog.iter().map(|e| e.id.clone()).collect()
        } else {
            self.products.ids.iter().cloned().collect()
        }
    }

    /// Build the offline catalog in config order.
    pub fn catalog(&self) -> Result<Catalog> {
        let products = self
            .catalog
            .iter()
            .map(CatalogEntry::to_product)
            .collect::<Result<Vec<_>>>()?;
        Ok(Catalog::new(products))
    }

    /// Sanity checks that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.product_ids().is_empty() {
            bail!("CONFIG_NO_PRODUCTS: set products.ids or catalog entries");
        }
        if self.storage.path.trim().is_empty() {
            bail!("CONFIG_BAD_STORAGE_PATH: storage.path must not be empty");
        }
        if self.storage.key.trim().is_empty() {
            bail!("CONFIG_BAD_STORAGE_KEY: storage.key must not be empty");
        }
        self.catalog().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_layered_yaml_from_strings;

    const BASE: &str = r#"
products:
  ids: [premium.monthly, premium.yearly]
catalog:
  - id: premium.monthly
    price: "9.99"
    price_display: "$9.99"
    period: { unit: month, value: 1 }
  - id: premium.yearly
    display_name: Yearly
    price: "39.99"
    price_display: "$39.99"
    period: { unit: year, value: 1 }
    intro_offer_is_free: true
"#;

    #[test]
    fn defaults_apply_when_sections_missing() {
        let cfg = load_layered_yaml_from_strings(&[BASE])
            .unwrap()
            .settings()
            .unwrap();
        assert_eq!(cfg.storage.path, "pwk-entitlement.json");
        assert_eq!(cfg.storage.key, "is_premium");
        cfg.validate().unwrap();
    }

    #[test]
    fn catalog_builds_products() {
        let cfg = load_layered_yaml_from_strings(&[BASE])
            .unwrap()
            .settings()
            .unwrap();
        let catalog = cfg.catalog().unwrap();
        let yearly = catalog.get("premium.yearly").unwrap();
        assert_eq!(yearly.display_name, "Yearly");
        assert!(yearly.intro_offer_is_free);
        assert_eq!(catalog.best_value().unwrap().savings_percent, Some(67));
    }

    #[test]
    fn product_ids_fall_back_to_catalog() {
        let cfg = load_layered_yaml_from_strings(&[BASE, "products:\n  ids: []\n"])
            .unwrap()
            .settings()
            .unwrap();
        assert!(cfg.product_ids().contains("premium.yearly"));
    }

    #[test]
    fn validate_rejects_empty_products_and_blank_storage() {
        let empty = EntitlementConfig::default();
        assert!(empty.validate().is_err());

        let cfg = load_layered_yaml_from_strings(&[BASE, "storage:\n  key: \"  \"\n"])
            .unwrap()
            .settings()
            .unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("CONFIG_BAD_STORAGE_KEY"));
    }

    #[test]
    fn bad_price_is_reported_with_product_id() {
        let cfg = load_layered_yaml_from_strings(&[
            concat!(
                "catalog:\n  - id: x\n    price: \"9,99\"\n",
                "    price_display: x\n    period: { unit: month, value: 1 }\n",
            ),
        ])
        .unwrap()
        .settings()
        .unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("'x'"));
    }
}
