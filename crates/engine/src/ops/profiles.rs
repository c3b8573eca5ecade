use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    BankAccount, EWallet, EngineError, NewBankAccountCmd, NewEWalletCmd, Profile,
    ProfileUpsertCmd, ResultEngine, bank_accounts, e_wallets, invoices, profiles,
};

use super::{Engine, access::parse_account_currency, normalize_optional_text,
    normalize_required_name, with_tx};

impl Engine {
    /// Creates or updates the billing profile of a user.
    ///
    /// The account currency is fixed once invoices exist: every invoice and
    /// payment row is denominated in it, so changing it later would silently
    /// re-label historical amounts.
    pub async fn upsert_profile(&self, cmd: ProfileUpsertCmd) -> ResultEngine<Uuid> {
        let company_name = normalize_required_name(&cmd.company_name, "company")?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, &cmd.user_id).await?;

            match self.find_profile(&db_tx, &cmd.user_id).await? {
                Some(existing) => {
                    let current = parse_account_currency(&existing.currency)?;
                    if let Some(requested) = cmd.currency
                        && requested != current
                    {
                        let has_invoices = invoices::Entity::find()
                            .filter(invoices::Column::UserId.eq(cmd.user_id.clone()))
                            .one(&db_tx)
                            .await?
                            .is_some();
                        if has_invoices {
                            return Err(EngineError::CurrencyMismatch(
                                "cannot change currency once invoices exist".to_string(),
                            ));
                        }
                    }

                    let profile_id = Uuid::parse_str(&existing.id)
                        .map_err(|_| EngineError::InvalidId("invalid profile id".to_string()))?;
                    let active = profiles::ActiveModel {
                        id: ActiveValue::Set(existing.id),
                        company_name: ActiveValue::Set(company_name),
                        address: ActiveValue::Set(normalize_optional_text(cmd.address.as_deref())),
                        tax_number: ActiveValue::Set(normalize_optional_text(
                            cmd.tax_number.as_deref(),
                        )),
                        currency: ActiveValue::Set(
                            cmd.currency.unwrap_or(current).code().to_string(),
                        ),
                        updated_at: ActiveValue::Set(Utc::now()),
                        ..Default::default()
                    };
                    active.update(&db_tx).await?;
                    Ok(profile_id)
                }
                None => {
                    let mut profile = Profile::new(
                        cmd.user_id.clone(),
                        company_name,
                        cmd.currency.unwrap_or_default(),
                        Utc::now(),
                    );
                    profile.address = normalize_optional_text(cmd.address.as_deref());
                    profile.tax_number = normalize_optional_text(cmd.tax_number.as_deref());

                    let profile_id = profile.id;
                    let model: profiles::ActiveModel = (&profile).into();
                    model.insert(&db_tx).await?;
                    Ok(profile_id)
                }
            }
        })
    }

    /// Returns the billing profile of a user.
    pub async fn profile(&self, user_id: &str) -> ResultEngine<Profile> {
        with_tx!(self, |db_tx| {
            let model = self.require_profile(&db_tx, user_id).await?;
            Profile::try_from(model)
        })
    }

    /// Registers a bank account on the user's profile.
    ///
    /// The first non-archived instrument of a type becomes primary
    /// automatically.
    pub async fn new_bank_account(&self, cmd: NewBankAccountCmd) -> ResultEngine<Uuid> {
        let bank_name = normalize_required_name(&cmd.bank_name, "bank")?;
        let account_name = normalize_required_name(&cmd.account_name, "account")?;
        with_tx!(self, |db_tx| {
            let profile = self.require_profile(&db_tx, &cmd.user_id).await?;

            let has_active = bank_accounts::Entity::find()
                .filter(bank_accounts::Column::ProfileId.eq(profile.id.clone()))
                .filter(bank_accounts::Column::Archived.eq(false))
                .one(&db_tx)
                .await?
                .is_some();

            let profile_id = Uuid::parse_str(&profile.id)
                .map_err(|_| EngineError::InvalidId("invalid profile id".to_string()))?;
            let mut account = BankAccount::new(
                profile_id,
                bank_name,
                account_name,
                cmd.account_number.trim().to_string(),
                Utc::now(),
            );
            account.is_primary = !has_active;

            let account_id = account.id;
            let model: bank_accounts::ActiveModel = (&account).into();
            model.insert(&db_tx).await?;
            Ok(account_id)
        })
    }

    /// Registers an e-wallet on the user's profile. Same primary semantics
    /// as bank accounts.
    pub async fn new_e_wallet(&self, cmd: NewEWalletCmd) -> ResultEngine<Uuid> {
        let provider = normalize_required_name(&cmd.provider, "provider")?;
        let account_name = normalize_required_name(&cmd.account_name, "account")?;
        with_tx!(self, |db_tx| {
            let profile = self.require_profile(&db_tx, &cmd.user_id).await?;

            let has_active = e_wallets::Entity::find()
                .filter(e_wallets::Column::ProfileId.eq(profile.id.clone()))
                .filter(e_wallets::Column::Archived.eq(false))
                .one(&db_tx)
                .await?
                .is_some();

            let profile_id = Uuid::parse_str(&profile.id)
                .map_err(|_| EngineError::InvalidId("invalid profile id".to_string()))?;
            let mut wallet = EWallet::new(
                profile_id,
                provider,
                account_name,
                cmd.phone_number.trim().to_string(),
                Utc::now(),
            );
            wallet.is_primary = !has_active;

            let wallet_id = wallet.id;
            let model: e_wallets::ActiveModel = (&wallet).into();
            model.insert(&db_tx).await?;
            Ok(wallet_id)
        })
    }

    /// Lists the user's instruments (archived ones included, so payment
    /// history stays resolvable).
    pub async fn list_instruments(
        &self,
        user_id: &str,
    ) -> ResultEngine<(Vec<BankAccount>, Vec<EWallet>)> {
        with_tx!(self, |db_tx| {
            let profile = self.require_profile(&db_tx, user_id).await?;

            let accounts: Vec<bank_accounts::Model> = bank_accounts::Entity::find()
                .filter(bank_accounts::Column::ProfileId.eq(profile.id.clone()))
                .order_by_asc(bank_accounts::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            let wallets: Vec<e_wallets::Model> = e_wallets::Entity::find()
                .filter(e_wallets::Column::ProfileId.eq(profile.id))
                .order_by_asc(e_wallets::Column::CreatedAt)
                .all(&db_tx)
                .await?;

            let accounts = accounts
                .into_iter()
                .map(BankAccount::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            let wallets = wallets
                .into_iter()
                .map(EWallet::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok((accounts, wallets))
        })
    }

    /// Makes a bank account the primary receiving account, demoting any
    /// other primary of the same type in the same transaction.
    pub async fn set_primary_bank_account(
        &self,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_bank_account_of_user(&db_tx, user_id, account_id)
                .await?;

            let previous: Vec<bank_accounts::Model> = bank_accounts::Entity::find()
                .filter(bank_accounts::Column::ProfileId.eq(model.profile_id.clone()))
                .filter(bank_accounts::Column::IsPrimary.eq(true))
                .filter(bank_accounts::Column::Id.ne(model.id.clone()))
                .all(&db_tx)
                .await?;
            for row in previous {
                let demote = bank_accounts::ActiveModel {
                    id: ActiveValue::Set(row.id),
                    is_primary: ActiveValue::Set(false),
                    ..Default::default()
                };
                demote.update(&db_tx).await?;
            }

            let promote = bank_accounts::ActiveModel {
                id: ActiveValue::Set(model.id),
                is_primary: ActiveValue::Set(true),
                ..Default::default()
            };
            promote.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Makes an e-wallet the primary receiving wallet, demoting any other.
    pub async fn set_primary_e_wallet(&self, user_id: &str, wallet_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_e_wallet_of_user(&db_tx, user_id, wallet_id)
                .await?;

            let previous: Vec<e_wallets::Model> = e_wallets::Entity::find()
                .filter(e_wallets::Column::ProfileId.eq(model.profile_id.clone()))
                .filter(e_wallets::Column::IsPrimary.eq(true))
                .filter(e_wallets::Column::Id.ne(model.id.clone()))
                .all(&db_tx)
                .await?;
            for row in previous {
                let demote = e_wallets::ActiveModel {
                    id: ActiveValue::Set(row.id),
                    is_primary: ActiveValue::Set(false),
                    ..Default::default()
                };
                demote.update(&db_tx).await?;
            }

            let promote = e_wallets::ActiveModel {
                id: ActiveValue::Set(model.id),
                is_primary: ActiveValue::Set(true),
                ..Default::default()
            };
            promote.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Archives a bank account. Referenced payments keep pointing at it;
    /// archived instruments just stop being selectable for new payments.
    pub async fn archive_bank_account(&self, user_id: &str, account_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_bank_account_of_user(&db_tx, user_id, account_id)
                .await?;

            let active = bank_accounts::ActiveModel {
                id: ActiveValue::Set(model.id),
                archived: ActiveValue::Set(true),
                is_primary: ActiveValue::Set(false),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Archives an e-wallet.
    pub async fn archive_e_wallet(&self, user_id: &str, wallet_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_e_wallet_of_user(&db_tx, user_id, wallet_id)
                .await?;

            let active = e_wallets::ActiveModel {
                id: ActiveValue::Set(model.id),
                archived: ActiveValue::Set(true),
                is_primary: ActiveValue::Set(false),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }
}
