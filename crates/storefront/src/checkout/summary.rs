//! Display-only order summary.
//!
//! The server computes the amount actually charged when the order is placed;
//! this summary can diverge from it and is never sent upstream.

use rust_decimal::Decimal;

use bazaar_core::Price;

use crate::api::types::Cart;

/// Tax rate, in whole percent.
pub const TAX_RATE_PERCENT: u32 = 10;

/// Flat shipping fee below the free-shipping threshold.
pub const FLAT_SHIPPING: Price = Price::usd(Decimal::from_parts(15, 0, 0, false, 0));

/// Subtotals strictly above this ship free.
pub const FREE_SHIPPING_THRESHOLD: Price = Price::usd(Decimal::ONE_HUNDRED);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    pub subtotal: Price,
    pub tax: Price,
    pub shipping: Price,
    pub total: Price,
}

impl OrderSummary {
    #[must_use]
    pub fn from_subtotal(subtotal: Price) -> Self {
        let tax = subtotal.percent(TAX_RATE_PERCENT);
        let shipping = if subtotal.amount > FREE_SHIPPING_THRESHOLD.amount {
            Price::new(Decimal::ZERO, subtotal.currency_code)
        } else {
            Price::new(FLAT_SHIPPING.amount, subtotal.currency_code)
        };
        Self {
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }

    /// Summary for a cart, from the server-reported cart total.
    #[must_use]
    pub fn for_cart(cart: &Cart) -> Self {
        Self::from_subtotal(cart.total)
    }

    #[must_use]
    pub fn is_free_shipping(&self) -> bool {
        self.shipping.is_zero()
    }

    /// How much more to spend before the free-shipping threshold, while the
    /// subtotal is below it.
    #[must_use]
    pub fn free_shipping_remaining(&self) -> Option<Price> {
        (self.subtotal.amount < FREE_SHIPPING_THRESHOLD.amount).then(|| {
            Price::new(
                FREE_SHIPPING_THRESHOLD.amount - self.subtotal.amount,
                self.subtotal.currency_code,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::cart::tests::cart_with;

    #[test]
    fn test_cart_below_threshold() {
        let cart = cart_with(&[("a", 20, 1), ("b", 30, 2)]);
        let summary = OrderSummary::for_cart(&cart);

        assert_eq!(summary.subtotal, Price::from_units(80));
        assert_eq!(summary.tax, Price::from_units(8));
        assert_eq!(summary.shipping, Price::from_units(15));
        assert_eq!(summary.total, Price::from_units(103));
        assert_eq!(summary.total.display(), "$103.00");
        assert_eq!(summary.free_shipping_remaining(), Some(Price::from_units(20)));
    }

    #[test]
    fn test_free_shipping_strictly_above_threshold() {
        let at = OrderSummary::from_subtotal(Price::from_units(100));
        assert_eq!(at.shipping, Price::from_units(15));
        assert!(!at.is_free_shipping());
        assert_eq!(at.free_shipping_remaining(), None);

        let above = OrderSummary::from_subtotal(Price::from_cents(10001));
        assert!(above.is_free_shipping());
        assert_eq!(above.total.amount, Decimal::new(110_011, 3));
    }

    #[test]
    fn test_tax_keeps_cents() {
        let summary = OrderSummary::from_subtotal(Price::from_cents(1999));
        assert_eq!(summary.tax.display(), "$2.00");
        assert_eq!(summary.total.display(), "$36.99");
    }
}
