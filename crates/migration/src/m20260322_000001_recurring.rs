//! Recurring invoice support.
//!
//! Adds the template tables and the provenance column linking generated
//! invoices back to their template.

use sea_orm_migration::prelude::*;

use crate::m20260310_000000_init::{Clients, Invoices, Products, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum RecurringInvoices {
    Table,
    Id,
    UserId,
    ClientId,
    Pattern,
    StartDate,
    NextInvoiceDate,
    EndDate,
    DueInDays,
    DiscountMinor,
    IsActive,
    Note,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(Iden)]
enum RecurringInvoiceItems {
    Table,
    Id,
    RecurringInvoiceId,
    ProductId,
    Position,
    Description,
    Quantity,
    UnitPriceMinor,
    TaxRateBps,
}

#[derive(Iden)]
enum InvoicesAlter {
    RecurringInvoiceId,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RecurringInvoices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringInvoices::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoices::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoices::ClientId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoices::Pattern)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoices::StartDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoices::NextInvoiceDate)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringInvoices::EndDate).date())
                    .col(
                        ColumnDef::new(RecurringInvoices::DueInDays)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoices::DiscountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoices::IsActive)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringInvoices::Note).string())
                    .col(
                        ColumnDef::new(RecurringInvoices::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoices::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringInvoices::DeletedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_invoices-user_id")
                            .from(RecurringInvoices::Table, RecurringInvoices::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_invoices-client_id")
                            .from(RecurringInvoices::Table, RecurringInvoices::ClientId)
                            .to(Clients::Table, Clients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_invoices-user_id")
                    .table(RecurringInvoices::Table)
                    .col(RecurringInvoices::UserId)
                    .to_owned(),
            )
            .await?;

        // The generation walk scans by (is_active, next_invoice_date).
        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_invoices-active-next")
                    .table(RecurringInvoices::Table)
                    .col(RecurringInvoices::IsActive)
                    .col(RecurringInvoices::NextInvoiceDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RecurringInvoiceItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::RecurringInvoiceId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::ProductId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::Position)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::UnitPriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::TaxRateBps)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_invoice_items-recurring_invoice_id")
                            .from(
                                RecurringInvoiceItems::Table,
                                RecurringInvoiceItems::RecurringInvoiceId,
                            )
                            .to(RecurringInvoices::Table, RecurringInvoices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_invoice_items-product_id")
                            .from(
                                RecurringInvoiceItems::Table,
                                RecurringInvoiceItems::ProductId,
                            )
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_invoice_items-recurring_invoice_id")
                    .table(RecurringInvoiceItems::Table)
                    .col(RecurringInvoiceItems::RecurringInvoiceId)
                    .to_owned(),
            )
            .await?;

        // Provenance column on invoices. SQLite cannot add a foreign key via
        // ALTER TABLE, so the link stays application-enforced (it always
        // comes from the generation path).
        manager
            .alter_table(
                Table::alter()
                    .table(Invoices::Table)
                    .add_column(ColumnDef::new(InvoicesAlter::RecurringInvoiceId).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoices-recurring_invoice_id")
                    .table(Invoices::Table)
                    .col(InvoicesAlter::RecurringInvoiceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx-invoices-recurring_invoice_id")
                    .table(Invoices::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Invoices::Table)
                    .drop_column(InvoicesAlter::RecurringInvoiceId)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(RecurringInvoiceItems::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(RecurringInvoices::Table).to_owned())
            .await?;
        Ok(())
    }
}
