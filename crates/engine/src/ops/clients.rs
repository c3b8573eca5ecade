use chrono::Utc;
use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Client, EngineError, InvoiceStatus, NewClientCmd, ResultEngine, UpdateClientCmd, clients,
    invoices, recurring_invoices,
};

use super::{Engine, normalize_optional_text, normalize_required_name, with_tx};

impl Engine {
    /// Adds a new client for a user.
    ///
    /// Client names are unique per user (case-insensitive, among live rows).
    pub async fn new_client(&self, cmd: NewClientCmd) -> ResultEngine<Uuid> {
        let name = normalize_required_name(&cmd.name, "client")?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, &cmd.user_id).await?;
            self.require_client_name_free(&db_tx, &cmd.user_id, &name, None)
                .await?;

            let mut client = Client::new(cmd.user_id.clone(), name, Utc::now());
            client.email = normalize_optional_text(cmd.email.as_deref());
            client.phone = normalize_optional_text(cmd.phone.as_deref());
            client.address = normalize_optional_text(cmd.address.as_deref());
            client.note = normalize_optional_text(cmd.note.as_deref());

            let client_id = client.id;
            let model: clients::ActiveModel = (&client).into();
            model.insert(&db_tx).await?;
            Ok(client_id)
        })
    }

    /// Replaces the editable fields of a client.
    pub async fn update_client(&self, cmd: UpdateClientCmd) -> ResultEngine<()> {
        let name = normalize_required_name(&cmd.name, "client")?;
        with_tx!(self, |db_tx| {
            self.require_client_of_user(&db_tx, &cmd.user_id, cmd.client_id)
                .await?;
            self.require_client_name_free(&db_tx, &cmd.user_id, &name, Some(cmd.client_id))
                .await?;

            let active = clients::ActiveModel {
                id: ActiveValue::Set(cmd.client_id.to_string()),
                name: ActiveValue::Set(name),
                email: ActiveValue::Set(normalize_optional_text(cmd.email.as_deref())),
                phone: ActiveValue::Set(normalize_optional_text(cmd.phone.as_deref())),
                address: ActiveValue::Set(normalize_optional_text(cmd.address.as_deref())),
                note: ActiveValue::Set(normalize_optional_text(cmd.note.as_deref())),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Returns a client snapshot.
    pub async fn client(&self, user_id: &str, client_id: Uuid) -> ResultEngine<Client> {
        with_tx!(self, |db_tx| {
            let model = self.require_client_of_user(&db_tx, user_id, client_id).await?;
            Client::try_from(model)
        })
    }

    /// Lists the live clients of a user, ordered by name.
    pub async fn list_clients(&self, user_id: &str) -> ResultEngine<Vec<Client>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let models: Vec<clients::Model> = clients::Entity::find()
                .filter(clients::Column::UserId.eq(user_id.to_string()))
                .filter(clients::Column::DeletedAt.is_null())
                .order_by_asc(clients::Column::Name)
                .all(&db_tx)
                .await?;

            models.into_iter().map(Client::try_from).collect()
        })
    }

    /// Soft-deletes a client.
    ///
    /// Refused while the client still has open invoices or live recurring
    /// templates; history through already-settled invoices stays intact.
    pub async fn delete_client(&self, user_id: &str, client_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_client_of_user(&db_tx, user_id, client_id).await?;

            let open = invoices::Entity::find()
                .filter(invoices::Column::ClientId.eq(client_id.to_string()))
                .filter(invoices::Column::DeletedAt.is_null())
                .filter(invoices::Column::Status.is_in([
                    InvoiceStatus::Pending.as_str(),
                    InvoiceStatus::Partial.as_str(),
                    InvoiceStatus::Overdue.as_str(),
                ]))
                .one(&db_tx)
                .await?
                .is_some();
            if open {
                return Err(EngineError::InvalidStatus(
                    "client has open invoices".to_string(),
                ));
            }

            let recurring = recurring_invoices::Entity::find()
                .filter(recurring_invoices::Column::ClientId.eq(client_id.to_string()))
                .filter(recurring_invoices::Column::DeletedAt.is_null())
                .one(&db_tx)
                .await?
                .is_some();
            if recurring {
                return Err(EngineError::InvalidStatus(
                    "client has recurring invoices".to_string(),
                ));
            }

            let active = clients::ActiveModel {
                id: ActiveValue::Set(client_id.to_string()),
                deleted_at: ActiveValue::Set(Some(Utc::now())),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    async fn require_client_name_free(
        &self,
        db_tx: &sea_orm::DatabaseTransaction,
        user_id: &str,
        name: &str,
        exclude: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = clients::Entity::find()
            .filter(clients::Column::UserId.eq(user_id.to_string()))
            .filter(clients::Column::DeletedAt.is_null())
            .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()));
        if let Some(id) = exclude {
            query = query.filter(clients::Column::Id.ne(id.to_string()));
        }
        if query.one(db_tx).await?.is_some() {
            return Err(EngineError::ExistingKey(name.to_string()));
        }
        Ok(())
    }
}
