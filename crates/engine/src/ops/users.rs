use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{EngineError, ResultEngine, User, users};

use super::{Engine, normalize_required_name, with_tx};

impl Engine {
    /// Registers a new account holder.
    ///
    /// `email` and `phone` are globally unique (email case-insensitively).
    /// Returns the generated user id.
    pub async fn new_user(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        password: &str,
    ) -> ResultEngine<String> {
        let name = normalize_required_name(name, "user")?;
        let email = email.trim().to_lowercase();
        let phone = phone.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(EngineError::InvalidName(format!("invalid email: {email}")));
        }
        if phone.is_empty() {
            return Err(EngineError::InvalidName("phone must not be empty".to_string()));
        }
        if password.is_empty() {
            return Err(EngineError::InvalidName(
                "password must not be empty".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let email_taken = users::Entity::find()
                .filter(Expr::cust("LOWER(email)").eq(email.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if email_taken {
                return Err(EngineError::ExistingKey(email));
            }
            let phone_taken = users::Entity::find()
                .filter(users::Column::Phone.eq(phone.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if phone_taken {
                return Err(EngineError::ExistingKey(phone));
            }

            let user = User::new(name, email, phone, Utc::now());
            let user_id = user.id.to_string();
            let mut model: users::ActiveModel = (&user).into();
            model.password = ActiveValue::Set(password.to_string());
            model.insert(&db_tx).await?;

            Ok(user_id)
        })
    }

    /// Returns a user snapshot.
    pub async fn user(&self, user_id: &str) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, user_id).await?;
            User::try_from(model)
        })
    }

    /// Soft-deletes a user: the account can no longer authenticate or be
    /// operated on, but everything it owns stays on disk.
    pub async fn delete_user(&self, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;

            let active = users::ActiveModel {
                id: ActiveValue::Set(user_id.to_string()),
                deleted_at: ActiveValue::Set(Some(Utc::now())),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }
}
