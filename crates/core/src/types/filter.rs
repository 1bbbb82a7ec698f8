//! Catalog filtering by name and price range.

use core::str::FromStr;

use rust_decimal::Decimal;

use super::product::Product;

/// Catalog filter applied to the loaded product list.
///
/// All criteria are optional; an empty filter keeps every product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub name: Option<String>,
    /// Inclusive lower price bound.
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound.
    pub max_price: Option<Decimal>,
}

impl ProductFilter {
    /// Build a filter from raw form inputs.
    ///
    /// Blank inputs leave the criterion unset, and so do price bounds that
    /// are not numbers.
    #[must_use]
    pub fn from_inputs(name: &str, min_price: &str, max_price: &str) -> Self {
        let name = name.trim();
        Self {
            name: (!name.is_empty()).then(|| name.to_lowercase()),
            min_price: parse_bound(min_price),
            max_price: parse_bound(max_price),
        }
    }

    /// Whether no criterion is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.min_price.is_none() && self.max_price.is_none()
    }

    /// Whether a product satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(needle) = &self.name
            && !product.name.to_lowercase().contains(needle.as_str())
        {
            return false;
        }

        let price = product.price.amount();
        if self.min_price.is_some_and(|min| price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| price > max) {
            return false;
        }

        true
    }

    /// Keep the matching products, preserving order.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        products
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect()
    }
}

fn parse_bound(input: &str) -> Option<Decimal> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    Decimal::from_str(input).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Price, ProductCode, ProductId};

    fn product(name: &str, price: &str) -> Product {
        Product {
            id: ProductId::generate(),
            name: name.to_owned(),
            price: Price::parse(price).expect("valid price"),
            stock: 5,
            code: ProductCode::parse(name).expect("valid code"),
            image_url: None,
        }
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let catalog = vec![product("Mate", "10"), product("Yerba", "4")];
        let filter = ProductFilter::from_inputs("", "", "");
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&catalog).len(), 2);
    }

    #[test]
    fn test_name_is_case_insensitive_substring() {
        let catalog = vec![product("Mate Imperial", "10"), product("Yerba", "4")];
        let filter = ProductFilter::from_inputs("  mATe ", "", "");
        assert_eq!(names(&filter.apply(&catalog)), vec!["Mate Imperial"]);
    }

    #[test]
    fn test_price_bounds_are_inclusive() {
        let catalog = vec![
            product("A", "5"),
            product("B", "10"),
            product("C", "15"),
            product("D", "20"),
        ];
        let filter = ProductFilter::from_inputs("", "10", "15");
        assert_eq!(names(&filter.apply(&catalog)), vec!["B", "C"]);
    }

    #[test]
    fn test_unparsable_bound_is_ignored() {
        let catalog = vec![product("A", "5"), product("B", "50")];
        let filter = ProductFilter::from_inputs("", "abc", "10");
        assert!(filter.min_price.is_none());
        assert_eq!(names(&filter.apply(&catalog)), vec!["A"]);
    }

    #[test]
    fn test_criteria_combine() {
        let catalog = vec![product("Mate", "5"), product("Mate XL", "30")];
        let filter = ProductFilter::from_inputs("mate", "", "20");
        assert_eq!(names(&filter.apply(&catalog)), vec!["Mate"]);
    }
}
