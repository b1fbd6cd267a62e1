use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::cart::{Cart, CartItem, CartItemPatch, NewCartItem};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, CouponRepository, PriceCatalog};

/// Owns the mutable pre-order basket. Side effects stay within the cart and
/// its items; coupons are only read here, never redeemed.
#[derive(Clone)]
pub struct CartService<R, P, C> {
    carts: R,
    catalog: P,
    coupons: C,
}

impl<R, P, C> CartService<R, P, C>
where
    R: CartRepository,
    P: PriceCatalog,
    C: CouponRepository,
{
    pub fn new(carts: R, catalog: P, coupons: C) -> Self {
        Self {
            carts,
            catalog,
            coupons,
        }
    }

    pub fn create(&self, customer_id: Uuid) -> Result<Cart, DomainError> {
        self.carts.create(customer_id)
    }

    pub fn get(&self, cart_id: Uuid) -> Result<Cart, DomainError> {
        self.carts.find(cart_id)?.ok_or(DomainError::NotFound)
    }

    pub fn get_active(&self, customer_id: Uuid) -> Result<Cart, DomainError> {
        self.carts
            .find_active(customer_id)?
            .ok_or(DomainError::NotFound)
    }

    pub fn items(&self, cart_id: Uuid) -> Result<Vec<CartItem>, DomainError> {
        self.get(cart_id)?;
        self.carts.items(cart_id)
    }

    /// Add an item, freezing the catalog unit price on it. The price is
    /// captured here and never re-derived.
    pub fn add_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: i32,
    ) -> Result<CartItem, DomainError> {
        if quantity < 1 {
            return Err(DomainError::Validation("quantity must be at least 1".into()));
        }
        let unit_price = self
            .catalog
            .unit_price(product_id, variant_id)?
            .ok_or(DomainError::NotFound)?;
        self.carts.add_item(
            cart_id,
            NewCartItem {
                product_id,
                variant_id,
                quantity,
                unit_price,
            },
        )
    }

    pub fn update_item(
        &self,
        item_id: Uuid,
        patch: CartItemPatch,
    ) -> Result<CartItem, DomainError> {
        match patch.quantity {
            None => {
                return Err(DomainError::Validation("no fields to update".into()));
            }
            Some(quantity) if quantity < 1 => {
                return Err(DomainError::Validation("quantity must be at least 1".into()));
            }
            Some(_) => {}
        }
        self.carts.update_item(item_id, patch)
    }

    pub fn remove_item(&self, item_id: Uuid) -> Result<(), DomainError> {
        self.carts.remove_item(item_id)
    }

    /// Validate the code against `now` and store it on the cart. Redemption
    /// happens later, at order placement, against a fresh validation.
    pub fn apply_coupon(
        &self,
        cart_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Cart, DomainError> {
        let coupon = self.coupons.find(code)?.ok_or(DomainError::NotFound)?;
        coupon.check(now)?;
        self.carts.set_coupon(cart_id, Some(code))
    }

    pub fn clear_coupon(&self, cart_id: Uuid) -> Result<Cart, DomainError> {
        self.carts.set_coupon(cart_id, None)
    }

    pub fn abandon(&self, cart_id: Uuid) -> Result<Cart, DomainError> {
        self.carts.abandon(cart_id)
    }
}
