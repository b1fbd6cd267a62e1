use bigdecimal::BigDecimal;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{AddressDirectory, PriceCatalog};
use crate::schema::{addresses, product_variants, products};

use super::models::{ProductRow, ProductVariantRow};

/// Catalog-backed price lookup. A variant price overrides the product base
/// price when a variant is chosen.
#[derive(Clone)]
pub struct DieselCatalog {
    pool: DbPool,
}

impl DieselCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PriceCatalog for DieselCatalog {
    fn unit_price(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<Option<BigDecimal>, DomainError> {
        let mut conn = self.pool.get()?;

        let product: Option<ProductRow> = products::table
            .find(product_id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        let Some(product) = product else {
            return Ok(None);
        };
        // Deactivated products cannot enter new carts.
        if !product.active {
            return Ok(None);
        }

        match variant_id {
            None => Ok(Some(product.base_price)),
            Some(variant_id) => {
                let variant: Option<ProductVariantRow> = product_variants::table
                    .find(variant_id)
                    .filter(product_variants::product_id.eq(product_id))
                    .select(ProductVariantRow::as_select())
                    .first(&mut conn)
                    .optional()?;
                Ok(variant.map(|v| v.price))
            }
        }
    }
}

#[derive(Clone)]
pub struct DieselAddressBook {
    pool: DbPool,
}

impl DieselAddressBook {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AddressDirectory for DieselAddressBook {
    fn exists(&self, address_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let found: Option<Uuid> = addresses::table
            .find(address_id)
            .select(addresses::id)
            .first(&mut conn)
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::{DieselAddressBook, DieselCatalog};
    use crate::domain::ports::{AddressDirectory, PriceCatalog};
    use crate::infrastructure::models::{NewProductRow, NewProductVariantRow};
    use crate::infrastructure::test_support::setup_db;
    use crate::schema::{product_variants, products};

    fn seed_product(pool: &crate::db::DbPool, active: bool, base_price: i64) -> Uuid {
        let mut conn = pool.get().expect("conn");
        let id = Uuid::new_v4();
        diesel::insert_into(products::table)
            .values(&NewProductRow {
                id,
                name: "caesar bowl".into(),
                description: None,
                base_price: BigDecimal::from(base_price),
                active,
            })
            .execute(&mut conn)
            .expect("insert product");
        id
    }

    #[tokio::test]
    async fn base_and_variant_prices_resolve() {
        let (_container, pool) = setup_db().await;
        let catalog = DieselCatalog::new(pool.clone());
        let product_id = seed_product(&pool, true, 4_500);

        let variant_id = Uuid::new_v4();
        {
            let mut conn = pool.get().expect("conn");
            diesel::insert_into(product_variants::table)
                .values(&NewProductVariantRow {
                    id: variant_id,
                    product_id,
                    name: "large".into(),
                    price: BigDecimal::from(5_900),
                })
                .execute(&mut conn)
                .expect("insert variant");
        }

        assert_eq!(
            catalog.unit_price(product_id, None).expect("lookup"),
            Some(BigDecimal::from(4_500))
        );
        assert_eq!(
            catalog
                .unit_price(product_id, Some(variant_id))
                .expect("lookup"),
            Some(BigDecimal::from(5_900))
        );
    }

    #[tokio::test]
    async fn inactive_or_foreign_lookups_miss() {
        let (_container, pool) = setup_db().await;
        let catalog = DieselCatalog::new(pool.clone());

        let inactive = seed_product(&pool, false, 4_500);
        assert_eq!(catalog.unit_price(inactive, None).expect("lookup"), None);

        let other = seed_product(&pool, true, 3_000);
        // A variant id belonging to no product on this product misses too.
        assert_eq!(
            catalog
                .unit_price(other, Some(Uuid::new_v4()))
                .expect("lookup"),
            None
        );

        assert_eq!(
            catalog.unit_price(Uuid::new_v4(), None).expect("lookup"),
            None
        );
    }

    #[tokio::test]
    async fn address_existence() {
        let (_container, pool) = setup_db().await;
        let directory = DieselAddressBook::new(pool.clone());

        assert!(!directory.exists(Uuid::new_v4()).expect("lookup"));

        let id = Uuid::new_v4();
        {
            use crate::infrastructure::models::NewAddressRow;
            use crate::schema::addresses;
            let mut conn = pool.get().expect("conn");
            diesel::insert_into(addresses::table)
                .values(&NewAddressRow {
                    id,
                    customer_id: Uuid::new_v4(),
                    street: "Av. Providencia 1234".into(),
                    city: "Santiago".into(),
                    notes: None,
                })
                .execute(&mut conn)
                .expect("insert address");
        }
        assert!(directory.exists(id).expect("lookup"));
    }
}
