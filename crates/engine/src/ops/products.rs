use chrono::Utc;
use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    EngineError, Money, NewProductCmd, Product, ResultEngine, UpdateProductCmd, products,
};

use super::{Engine, normalize_optional_text, normalize_required_name, with_tx};

const MAX_TAX_RATE_BPS: i64 = 10_000;

fn validate_pricing(price: Money, tax_rate_bps: i64) -> ResultEngine<()> {
    if price.is_negative() {
        return Err(EngineError::InvalidAmount(
            "price must not be negative".to_string(),
        ));
    }
    if !(0..=MAX_TAX_RATE_BPS).contains(&tax_rate_bps) {
        return Err(EngineError::InvalidAmount(format!(
            "tax rate must be between 0 and {MAX_TAX_RATE_BPS} bps"
        )));
    }
    Ok(())
}

impl Engine {
    /// Adds a new product to a user's catalogue.
    ///
    /// Product names are unique per user (case-insensitive, among live rows).
    pub async fn new_product(&self, cmd: NewProductCmd) -> ResultEngine<Uuid> {
        let name = normalize_required_name(&cmd.name, "product")?;
        validate_pricing(cmd.price, cmd.tax_rate_bps)?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, &cmd.user_id).await?;
            self.require_product_name_free(&db_tx, &cmd.user_id, &name, None)
                .await?;

            let mut product = Product::new(
                cmd.user_id.clone(),
                name,
                cmd.price,
                cmd.tax_rate_bps,
                Utc::now(),
            );
            product.description = normalize_optional_text(cmd.description.as_deref());
            product.unit = normalize_optional_text(cmd.unit.as_deref());

            let product_id = product.id;
            let model: products::ActiveModel = (&product).into();
            model.insert(&db_tx).await?;
            Ok(product_id)
        })
    }

    /// Replaces the editable fields of a product.
    ///
    /// Lines of already-created invoices keep their snapshot; only future
    /// invoices see the new price/tax rate.
    pub async fn update_product(&self, cmd: UpdateProductCmd) -> ResultEngine<()> {
        let name = normalize_required_name(&cmd.name, "product")?;
        validate_pricing(cmd.price, cmd.tax_rate_bps)?;
        with_tx!(self, |db_tx| {
            self.require_product_of_user(&db_tx, &cmd.user_id, cmd.product_id)
                .await?;
            self.require_product_name_free(&db_tx, &cmd.user_id, &name, Some(cmd.product_id))
                .await?;

            let active = products::ActiveModel {
                id: ActiveValue::Set(cmd.product_id.to_string()),
                name: ActiveValue::Set(name),
                description: ActiveValue::Set(normalize_optional_text(cmd.description.as_deref())),
                unit: ActiveValue::Set(normalize_optional_text(cmd.unit.as_deref())),
                price_minor: ActiveValue::Set(cmd.price.minor()),
                tax_rate_bps: ActiveValue::Set(cmd.tax_rate_bps),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Returns a product snapshot.
    pub async fn product(&self, user_id: &str, product_id: Uuid) -> ResultEngine<Product> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_product_of_user(&db_tx, user_id, product_id)
                .await?;
            Product::try_from(model)
        })
    }

    /// Lists the live products of a user, ordered by name.
    pub async fn list_products(&self, user_id: &str) -> ResultEngine<Vec<Product>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let models: Vec<products::Model> = products::Entity::find()
                .filter(products::Column::UserId.eq(user_id.to_string()))
                .filter(products::Column::DeletedAt.is_null())
                .order_by_asc(products::Column::Name)
                .all(&db_tx)
                .await?;

            models.into_iter().map(Product::try_from).collect()
        })
    }

    /// Soft-deletes a product. Existing invoice lines keep their snapshot.
    pub async fn delete_product(&self, user_id: &str, product_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_product_of_user(&db_tx, user_id, product_id)
                .await?;

            let active = products::ActiveModel {
                id: ActiveValue::Set(product_id.to_string()),
                deleted_at: ActiveValue::Set(Some(Utc::now())),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    async fn require_product_name_free(
        &self,
        db_tx: &sea_orm::DatabaseTransaction,
        user_id: &str,
        name: &str,
        exclude: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = products::Entity::find()
            .filter(products::Column::UserId.eq(user_id.to_string()))
            .filter(products::Column::DeletedAt.is_null())
            .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()));
        if let Some(id) = exclude {
            query = query.filter(products::Column::Id.ne(id.to_string()));
        }
        if query.one(db_tx).await?.is_some() {
            return Err(EngineError::ExistingKey(name.to_string()));
        }
        Ok(())
    }
}
