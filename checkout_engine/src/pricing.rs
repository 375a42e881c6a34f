//! The price engine.
//!
//! Pure functions computing a cart's chargeable total from resolved variant prices, automatic promotions and at
//! most one manual coupon. The engine has no side effects; callers resolve cart lines, offers and delivery quotes
//! from the catalog first (see [`crate::OrderFlowApi::price_quote`]).
//!
//! The winner rule: a valid manual coupon always wins, and discards every automatic offer for that order. Manual
//! and automatic discounts never stack.

use chrono::{DateTime, Utc};
use thiserror::Error;

use rpg_common::Money;

use crate::{
    db_types::{Offer, OfferKind},
    order_objects::{AppliedOffer, CouponContext, DeliveryQuote, PriceBreakdown, PricedLine},
};

#[derive(Debug, Clone, Error)]
pub enum PricingError {
    #[error("Coupon '{0}' does not exist")]
    CouponNotFound(String),
    #[error("Coupon '{0}' is not active")]
    CouponInactive(String),
    #[error("Coupon '{0}' cannot be applied manually")]
    CouponNotManual(String),
    #[error("Coupon '{0}' requires a minimum order value of {1}")]
    CouponMinOrderValue(String, Money),
    #[error("Coupon '{0}' requires at least {1} items in the cart")]
    CouponMinItemCount(String, i64),
    #[error("Coupon '{0}' has already been used the maximum number of times")]
    CouponUsageExceeded(String),
    #[error("Coupon '{0}' is only valid on a first order")]
    CouponFirstOrderOnly(String),
}

/// Computes the full [`PriceBreakdown`] for a resolved cart.
///
/// When `delivery` is `None` (cart-preview context, no postal code supplied) the delivery charge is always zero
/// and COD is reported unavailable; a default non-zero charge is never inferred.
///
/// An invalid manual coupon is an error, never silently ignored: order creation must abort before any charge is
/// opened against the gateway.
pub fn price_cart(
    lines: &[PricedLine],
    automatic_offers: &[Offer],
    coupon: Option<&CouponContext>,
    delivery: Option<&DeliveryQuote>,
    now: DateTime<Utc>,
) -> Result<PriceBreakdown, PricingError> {
    let product_total: Money = lines.iter().map(|l| l.line_total).sum();
    let item_count: i64 = lines.iter().map(|l| l.quantity).sum();
    let delivery_charge = delivery.map(|d| d.delivery_charge).unwrap_or_else(Money::zero);
    let cod_available = delivery.map(|d| d.cod_available).unwrap_or(false);

    let mut discount_amount = Money::zero();
    let mut offer_discount = Money::zero();
    let mut applied_offers = Vec::new();

    match coupon {
        Some(ctx) => {
            let discount = validate_coupon(ctx, product_total, item_count, now)
                .map(|()| discount_for(&ctx.offer, lines, product_total))?;
            discount_amount = discount;
            applied_offers.push(AppliedOffer { code: ctx.offer.code.clone(), discount });
        },
        None => {
            // Highest automatic discount wins; ties break on evaluation order (first wins). The catalog hands
            // offers over ordered by id ascending, so the tie-break is deterministic.
            let mut best: Option<(&Offer, Money)> = None;
            for offer in automatic_offers {
                if !offer.is_automatic || !offer.is_active(now) || !offer.thresholds_met(product_total, item_count) {
                    continue;
                }
                let discount = discount_for(offer, lines, product_total);
                if best.map(|(_, d)| discount > d).unwrap_or(true) {
                    best = Some((offer, discount));
                }
            }
            if let Some((offer, discount)) = best {
                offer_discount = discount;
                applied_offers.push(AppliedOffer { code: offer.code.clone(), discount });
            }
        },
    }

    let total = (product_total - offer_discount - discount_amount + delivery_charge).max_zero();
    Ok(PriceBreakdown {
        product_total,
        delivery_charge,
        discount_amount,
        offer_discount,
        applied_offers,
        total,
        cod_available,
    })
}

fn validate_coupon(
    ctx: &CouponContext,
    product_total: Money,
    item_count: i64,
    now: DateTime<Utc>,
) -> Result<(), PricingError> {
    let offer = &ctx.offer;
    let code = offer.code.clone();
    if offer.is_automatic {
        return Err(PricingError::CouponNotManual(code));
    }
    if !offer.is_active(now) {
        return Err(PricingError::CouponInactive(code));
    }
    if product_total < offer.min_order_value {
        return Err(PricingError::CouponMinOrderValue(code, offer.min_order_value));
    }
    if item_count < offer.min_item_count {
        return Err(PricingError::CouponMinItemCount(code, offer.min_item_count));
    }
    if ctx.prior_uses >= offer.usage_limit_per_user {
        return Err(PricingError::CouponUsageExceeded(code));
    }
    if offer.first_order_only && ctx.prior_orders > 0 {
        return Err(PricingError::CouponFirstOrderOnly(code));
    }
    Ok(())
}

/// The candidate discount amount for a single offer against a resolved cart.
fn discount_for(offer: &Offer, lines: &[PricedLine], product_total: Money) -> Money {
    match offer.kind {
        OfferKind::Flat => Money::from(offer.value),
        OfferKind::Percent => {
            let discount = product_total.percent(offer.value);
            match offer.max_discount {
                Some(cap) => discount.min(cap),
                None => discount,
            }
        },
        OfferKind::FreeItem => free_item_discount(offer, lines),
    }
}

/// Buy-X-get-Y: the free-unit count is `floor(total_qualifying_qty / (X + Y)) * Y`, and the cheapest line in the
/// cart is the one zero-priced.
fn free_item_discount(offer: &Offer, lines: &[PricedLine]) -> Money {
    let (buy, free) = match (offer.buy_quantity, offer.free_quantity) {
        (Some(x), Some(y)) if x > 0 && y > 0 => (x, y),
        _ => return Money::zero(),
    };
    let cheapest = match lines.iter().filter(|l| l.quantity > 0).min_by_key(|l| l.unit_price) {
        Some(line) => line,
        None => return Money::zero(),
    };
    let qualifying_qty: i64 = lines.iter().map(|l| l.quantity).sum();
    let free_units = qualifying_qty / (buy + free) * free;
    cheapest.unit_price * free_units.min(cheapest.quantity)
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};

    use rpg_common::Money;

    use super::{price_cart, PricingError};
    use crate::{
        db_types::{Offer, OfferKind},
        order_objects::{CouponContext, DeliveryQuote, PricedLine},
    };

    fn line(variant_id: i64, qty: i64, unit_price: Money) -> PricedLine {
        PricedLine { variant_id, product_id: variant_id * 10, quantity: qty, unit_price, line_total: unit_price * qty }
    }

    fn offer(code: &str, kind: OfferKind, value: i64) -> Offer {
        let now = Utc::now();
        Offer {
            id: 1,
            code: code.to_string(),
            kind,
            value,
            max_discount: None,
            min_order_value: Money::zero(),
            min_item_count: 0,
            buy_quantity: None,
            free_quantity: None,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            is_automatic: false,
            first_order_only: false,
            usage_limit_per_user: 1,
        }
    }

    fn coupon(offer: Offer) -> CouponContext {
        CouponContext { offer, prior_orders: 0, prior_uses: 0 }
    }

    #[test]
    fn flat_coupon_with_delivery() {
        // Cart {variant A: qty 2 @ ₹500, 10% off} -> product total 900; flat ₹100 coupon, delivery ₹50 -> 850
        let lines = vec![line(1, 2, Money::from_rupees(450))];
        let delivery = DeliveryQuote { delivery_charge: Money::from_rupees(50), cod_available: true };
        let flat = offer("FLAT100", OfferKind::Flat, Money::from_rupees(100).value());
        let bd = price_cart(&lines, &[], Some(&coupon(flat)), Some(&delivery), Utc::now()).unwrap();
        assert_eq!(bd.product_total, Money::from_rupees(900));
        assert_eq!(bd.discount_amount, Money::from_rupees(100));
        assert_eq!(bd.offer_discount, Money::zero());
        assert_eq!(bd.total, Money::from_rupees(850));
    }

    #[test]
    fn round_trip_invariant_holds() {
        let lines = vec![line(1, 3, Money::from(33_333)), line(2, 1, Money::from(9_999))];
        let delivery = DeliveryQuote { delivery_charge: Money::from(4_900), cod_available: false };
        let mut pct = offer("AUTO15", OfferKind::Percent, 15);
        pct.is_automatic = true;
        let bd = price_cart(&lines, &[pct], None, Some(&delivery), Utc::now()).unwrap();
        let expected = (bd.product_total - bd.offer_discount - bd.discount_amount + bd.delivery_charge).max_zero();
        assert_eq!(bd.total, expected);
    }

    #[test]
    fn no_postal_code_means_zero_delivery() {
        let lines = vec![line(1, 1, Money::from_rupees(100))];
        let bd = price_cart(&lines, &[], None, None, Utc::now()).unwrap();
        assert_eq!(bd.delivery_charge, Money::zero());
        assert!(!bd.cod_available);
        assert_eq!(bd.total, Money::from_rupees(100));
    }

    #[test]
    fn manual_coupon_discards_automatic_offers() {
        let lines = vec![line(1, 2, Money::from_rupees(450))];
        let mut auto = offer("AUTO50", OfferKind::Percent, 50);
        auto.id = 7;
        auto.is_automatic = true;
        let manual = offer("FLAT100", OfferKind::Flat, Money::from_rupees(100).value());
        // The automatic 50% (₹450) is larger than the ₹100 coupon, but the coupon is explicit opt-in and wins.
        let bd = price_cart(&lines, &[auto], Some(&coupon(manual)), None, Utc::now()).unwrap();
        assert_eq!(bd.applied_offers.len(), 1);
        assert_eq!(bd.applied_offers[0].code, "FLAT100");
        assert_eq!(bd.offer_discount, Money::zero());
        assert_eq!(bd.discount_amount, Money::from_rupees(100));
    }

    #[test]
    fn highest_automatic_offer_wins_first_on_tie() {
        let lines = vec![line(1, 2, Money::from_rupees(500))];
        let mut a = offer("TEN-A", OfferKind::Percent, 10);
        a.id = 1;
        a.is_automatic = true;
        let mut b = offer("TEN-B", OfferKind::Flat, Money::from_rupees(100).value());
        b.id = 2;
        b.is_automatic = true;
        let mut c = offer("FIVE", OfferKind::Percent, 5);
        c.id = 3;
        c.is_automatic = true;
        // a and b both discount ₹100; a was evaluated first and must win the tie.
        let bd = price_cart(&lines, &[a, b, c], None, None, Utc::now()).unwrap();
        assert_eq!(bd.applied_offers[0].code, "TEN-A");
        assert_eq!(bd.offer_discount, Money::from_rupees(100));
    }

    #[test]
    fn percent_offer_is_capped() {
        let lines = vec![line(1, 1, Money::from_rupees(1000))];
        let mut pct = offer("BIG", OfferKind::Percent, 50);
        pct.is_automatic = true;
        pct.max_discount = Some(Money::from_rupees(200));
        let bd = price_cart(&lines, &[pct], None, None, Utc::now()).unwrap();
        assert_eq!(bd.offer_discount, Money::from_rupees(200));
    }

    #[test]
    fn buy_two_get_one_free() {
        // 6 qualifying items, X=2, Y=1 -> floor(6/3)*1 = 2 free units of the cheapest line.
        let lines = vec![line(1, 4, Money::from_rupees(300)), line(2, 2, Money::from_rupees(120))];
        let mut bogo = offer("B2G1", OfferKind::FreeItem, 0);
        bogo.is_automatic = true;
        bogo.buy_quantity = Some(2);
        bogo.free_quantity = Some(1);
        let bd = price_cart(&lines, &[bogo], None, None, Utc::now()).unwrap();
        assert_eq!(bd.offer_discount, Money::from_rupees(240));
    }

    #[test]
    fn total_is_never_negative() {
        let lines = vec![line(1, 1, Money::from_rupees(50))];
        let huge = offer("HUGE", OfferKind::Flat, Money::from_rupees(500).value());
        let bd = price_cart(&lines, &[], Some(&coupon(huge)), None, Utc::now()).unwrap();
        assert_eq!(bd.total, Money::zero());
    }

    #[test]
    fn expired_coupon_is_rejected() {
        let lines = vec![line(1, 1, Money::from_rupees(100))];
        let mut expired = offer("OLD", OfferKind::Flat, 1000);
        expired.valid_until = Utc::now() - Duration::days(1);
        let err = price_cart(&lines, &[], Some(&coupon(expired)), None, Utc::now()).unwrap_err();
        assert!(matches!(err, PricingError::CouponInactive(_)));
    }

    #[test]
    fn coupon_usage_limit_is_enforced() {
        let lines = vec![line(1, 1, Money::from_rupees(100))];
        let mut ctx = coupon(offer("ONCE", OfferKind::Flat, 1000));
        ctx.prior_uses = 1;
        let err = price_cart(&lines, &[], Some(&ctx), None, Utc::now()).unwrap_err();
        assert!(matches!(err, PricingError::CouponUsageExceeded(_)));
    }

    #[test]
    fn first_order_coupon_requires_no_history() {
        let lines = vec![line(1, 1, Money::from_rupees(100))];
        let mut first = offer("WELCOME", OfferKind::Flat, 1000);
        first.first_order_only = true;
        let mut ctx = coupon(first);
        ctx.prior_orders = 3;
        let err = price_cart(&lines, &[], Some(&ctx), None, Utc::now()).unwrap_err();
        assert!(matches!(err, PricingError::CouponFirstOrderOnly(_)));
    }

    #[test]
    fn coupon_threshold_checks() {
        let lines = vec![line(1, 1, Money::from_rupees(100))];
        let mut min_val = offer("MIN500", OfferKind::Flat, 1000);
        min_val.min_order_value = Money::from_rupees(500);
        let err = price_cart(&lines, &[], Some(&coupon(min_val)), None, Utc::now()).unwrap_err();
        assert!(matches!(err, PricingError::CouponMinOrderValue(_, _)));

        let mut min_items = offer("MIN3", OfferKind::Flat, 1000);
        min_items.min_item_count = 3;
        let err = price_cart(&lines, &[], Some(&coupon(min_items)), None, Utc::now()).unwrap_err();
        assert!(matches!(err, PricingError::CouponMinItemCount(_, 3)));
    }
}
