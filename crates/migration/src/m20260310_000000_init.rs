//! Initial schema migration - creates all core tables from scratch.
//!
//! It creates the billing schema for Fattura:
//!
//! - `users`: account holders / authentication
//! - `profiles`: business identity (one per user), account currency
//! - `bank_accounts` / `e_wallets`: payment-receiving instruments
//! - `clients`: the user's customers
//! - `products`: catalogue entries with price and tax rate
//! - `invoices`: invoice headers with denormalized totals
//! - `invoice_items`: line items (price/tax snapshots)
//! - `payments`: payments applied against invoices
//!
//! Recurring templates arrive in a follow-up migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
pub(crate) enum Users {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Password,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(Iden)]
enum Profiles {
    Table,
    Id,
    UserId,
    CompanyName,
    Address,
    TaxNumber,
    Currency,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum BankAccounts {
    Table,
    Id,
    ProfileId,
    BankName,
    AccountName,
    AccountNumber,
    IsPrimary,
    Archived,
    CreatedAt,
}

#[derive(Iden)]
enum EWallets {
    Table,
    Id,
    ProfileId,
    Provider,
    AccountName,
    PhoneNumber,
    IsPrimary,
    Archived,
    CreatedAt,
}

#[derive(Iden)]
pub(crate) enum Clients {
    Table,
    Id,
    UserId,
    Name,
    Email,
    Phone,
    Address,
    Note,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(Iden)]
pub(crate) enum Products {
    Table,
    Id,
    UserId,
    Name,
    Description,
    Unit,
    PriceMinor,
    TaxRateBps,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(Iden)]
pub(crate) enum Invoices {
    Table,
    Id,
    UserId,
    ClientId,
    Number,
    Status,
    IssueDate,
    DueDate,
    SubtotalMinor,
    TaxMinor,
    DiscountMinor,
    TotalMinor,
    Currency,
    Note,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(Iden)]
enum InvoiceItems {
    Table,
    Id,
    InvoiceId,
    ProductId,
    Position,
    Description,
    Quantity,
    UnitPriceMinor,
    TaxRateBps,
    TaxMinor,
    AmountMinor,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    InvoiceId,
    AmountMinor,
    PaymentDate,
    Method,
    BankAccountId,
    EWalletId,
    Reference,
    CreatedAt,
    VoidedAt,
    VoidedBy,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::Phone).string().not_null())
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Users::DeletedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-email-unique")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-phone-unique")
                    .table(Users::Table)
                    .col(Users::Phone)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Profiles
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Profiles::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Profiles::UserId).string().not_null())
                    .col(ColumnDef::new(Profiles::CompanyName).string().not_null())
                    .col(ColumnDef::new(Profiles::Address).string())
                    .col(ColumnDef::new(Profiles::TaxNumber).string())
                    .col(
                        ColumnDef::new(Profiles::Currency)
                            .string()
                            .not_null()
                            .default("EUR"),
                    )
                    .col(ColumnDef::new(Profiles::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Profiles::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-profiles-user_id")
                            .from(Profiles::Table, Profiles::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-profiles-user_id-unique")
                    .table(Profiles::Table)
                    .col(Profiles::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Bank accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BankAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BankAccounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BankAccounts::ProfileId).string().not_null())
                    .col(ColumnDef::new(BankAccounts::BankName).string().not_null())
                    .col(
                        ColumnDef::new(BankAccounts::AccountName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankAccounts::AccountNumber)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankAccounts::IsPrimary)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BankAccounts::Archived).boolean().not_null())
                    .col(
                        ColumnDef::new(BankAccounts::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-bank_accounts-profile_id")
                            .from(BankAccounts::Table, BankAccounts::ProfileId)
                            .to(Profiles::Table, Profiles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-bank_accounts-profile_id")
                    .table(BankAccounts::Table)
                    .col(BankAccounts::ProfileId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. E-wallets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(EWallets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EWallets::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EWallets::ProfileId).string().not_null())
                    .col(ColumnDef::new(EWallets::Provider).string().not_null())
                    .col(ColumnDef::new(EWallets::AccountName).string().not_null())
                    .col(ColumnDef::new(EWallets::PhoneNumber).string().not_null())
                    .col(ColumnDef::new(EWallets::IsPrimary).boolean().not_null())
                    .col(ColumnDef::new(EWallets::Archived).boolean().not_null())
                    .col(ColumnDef::new(EWallets::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-e_wallets-profile_id")
                            .from(EWallets::Table, EWallets::ProfileId)
                            .to(Profiles::Table, Profiles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-e_wallets-profile_id")
                    .table(EWallets::Table)
                    .col(EWallets::ProfileId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Clients
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Clients::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Clients::UserId).string().not_null())
                    .col(ColumnDef::new(Clients::Name).string().not_null())
                    .col(ColumnDef::new(Clients::Email).string())
                    .col(ColumnDef::new(Clients::Phone).string())
                    .col(ColumnDef::new(Clients::Address).string())
                    .col(ColumnDef::new(Clients::Note).string())
                    .col(ColumnDef::new(Clients::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Clients::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Clients::DeletedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-clients-user_id")
                            .from(Clients::Table, Clients::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Name uniqueness among live rows is enforced by the engine: a
        // soft-deleted client may share its name with a live one.
        manager
            .create_index(
                Index::create()
                    .name("idx-clients-user_id")
                    .table(Clients::Table)
                    .col(Clients::UserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Products
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::UserId).string().not_null())
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(ColumnDef::new(Products::Description).string())
                    .col(ColumnDef::new(Products::Unit).string())
                    .col(
                        ColumnDef::new(Products::PriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::TaxRateBps)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Products::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Products::DeletedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-products-user_id")
                            .from(Products::Table, Products::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-products-user_id")
                    .table(Products::Table)
                    .col(Products::UserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Invoices
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Invoices::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Invoices::UserId).string().not_null())
                    .col(ColumnDef::new(Invoices::ClientId).string().not_null())
                    .col(ColumnDef::new(Invoices::Number).string().not_null())
                    .col(ColumnDef::new(Invoices::Status).string().not_null())
                    .col(ColumnDef::new(Invoices::IssueDate).date().not_null())
                    .col(ColumnDef::new(Invoices::DueDate).date().not_null())
                    .col(
                        ColumnDef::new(Invoices::SubtotalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::TaxMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Invoices::DiscountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::TotalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::Currency).string().not_null())
                    .col(ColumnDef::new(Invoices::Note).string())
                    .col(ColumnDef::new(Invoices::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Invoices::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Invoices::DeletedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoices-user_id")
                            .from(Invoices::Table, Invoices::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoices-client_id")
                            .from(Invoices::Table, Invoices::ClientId)
                            .to(Clients::Table, Clients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoices-user_id-number-unique")
                    .table(Invoices::Table)
                    .col(Invoices::UserId)
                    .col(Invoices::Number)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoices-user_id-issue_date")
                    .table(Invoices::Table)
                    .col(Invoices::UserId)
                    .col(Invoices::IssueDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoices-user_id-status")
                    .table(Invoices::Table)
                    .col(Invoices::UserId)
                    .col(Invoices::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoices-client_id")
                    .table(Invoices::Table)
                    .col(Invoices::ClientId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Invoice items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(InvoiceItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvoiceItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InvoiceItems::InvoiceId).string().not_null())
                    .col(ColumnDef::new(InvoiceItems::ProductId).string().not_null())
                    .col(
                        ColumnDef::new(InvoiceItems::Position)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoiceItems::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoiceItems::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoiceItems::UnitPriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoiceItems::TaxRateBps)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoiceItems::TaxMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoiceItems::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoice_items-invoice_id")
                            .from(InvoiceItems::Table, InvoiceItems::InvoiceId)
                            .to(Invoices::Table, Invoices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoice_items-product_id")
                            .from(InvoiceItems::Table, InvoiceItems::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoice_items-invoice_id")
                    .table(InvoiceItems::Table)
                    .col(InvoiceItems::InvoiceId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 9. Payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::InvoiceId).string().not_null())
                    .col(
                        ColumnDef::new(Payments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::PaymentDate).date().not_null())
                    .col(ColumnDef::new(Payments::Method).string().not_null())
                    .col(ColumnDef::new(Payments::BankAccountId).string())
                    .col(ColumnDef::new(Payments::EWalletId).string())
                    .col(ColumnDef::new(Payments::Reference).string())
                    .col(ColumnDef::new(Payments::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Payments::VoidedAt).timestamp())
                    .col(ColumnDef::new(Payments::VoidedBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-invoice_id")
                            .from(Payments::Table, Payments::InvoiceId)
                            .to(Invoices::Table, Invoices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-bank_account_id")
                            .from(Payments::Table, Payments::BankAccountId)
                            .to(BankAccounts::Table, BankAccounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-e_wallet_id")
                            .from(Payments::Table, Payments::EWalletId)
                            .to(EWallets::Table, EWallets::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-invoice_id")
                    .table(Payments::Table)
                    .col(Payments::InvoiceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InvoiceItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EWallets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BankAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
