use sea_orm::{Statement, TransactionTrait, prelude::*};

use crate::{Currency, InvoiceStatus, Money, ResultEngine};

use super::{Engine, access::parse_account_currency, with_tx};

/// Dashboard totals for one user.
///
/// "Open" covers PENDING + PARTIAL + OVERDUE; the overdue slice is also
/// reported on its own. `outstanding` is what is still owed on open
/// invoices after non-voided payments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserStatistics {
    pub currency: Currency,
    pub draft_count: i64,
    pub draft_total: Money,
    pub open_count: i64,
    pub open_total: Money,
    pub overdue_count: i64,
    pub overdue_total: Money,
    pub paid_count: i64,
    pub paid_total: Money,
    pub total_received: Money,
    pub outstanding: Money,
}

impl Engine {
    /// Computes invoice/payment totals for a user's dashboard.
    pub async fn user_statistics(&self, user_id: &str) -> ResultEngine<UserStatistics> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let profile = self.require_profile(&db_tx, user_id).await?;
            let currency = parse_account_currency(&profile.currency)?;

            let backend = self.database.get_database_backend();

            let mut stats = UserStatistics {
                currency,
                draft_count: 0,
                draft_total: Money::ZERO,
                open_count: 0,
                open_total: Money::ZERO,
                overdue_count: 0,
                overdue_total: Money::ZERO,
                paid_count: 0,
                paid_total: Money::ZERO,
                total_received: Money::ZERO,
                outstanding: Money::ZERO,
            };

            let per_status = Statement::from_sql_and_values(
                backend,
                "SELECT status, COUNT(*) AS cnt, COALESCE(SUM(total_minor), 0) AS sum \
                 FROM invoices \
                 WHERE user_id = ? AND deleted_at IS NULL \
                 GROUP BY status",
                vec![user_id.into()],
            );
            for row in db_tx.query_all(per_status).await? {
                let status: String = row.try_get("", "status")?;
                let count: i64 = row.try_get("", "cnt")?;
                let total = Money::new(row.try_get("", "sum")?);

                match InvoiceStatus::try_from(status.as_str())? {
                    InvoiceStatus::Draft => {
                        stats.draft_count += count;
                        stats.draft_total += total;
                    }
                    InvoiceStatus::Pending | InvoiceStatus::Partial => {
                        stats.open_count += count;
                        stats.open_total += total;
                    }
                    InvoiceStatus::Overdue => {
                        stats.open_count += count;
                        stats.open_total += total;
                        stats.overdue_count += count;
                        stats.overdue_total += total;
                    }
                    InvoiceStatus::Paid => {
                        stats.paid_count += count;
                        stats.paid_total += total;
                    }
                    InvoiceStatus::Cancelled => {}
                }
            }

            let received = Statement::from_sql_and_values(
                backend,
                "SELECT COALESCE(SUM(p.amount_minor), 0) AS sum \
                 FROM payments p \
                 JOIN invoices i ON i.id = p.invoice_id \
                 WHERE i.user_id = ? AND i.deleted_at IS NULL AND p.voided_at IS NULL",
                vec![user_id.into()],
            );
            stats.total_received = Money::new(
                db_tx
                    .query_one(received)
                    .await?
                    .and_then(|r| r.try_get("", "sum").ok())
                    .unwrap_or(0),
            );

            let received_open = Statement::from_sql_and_values(
                backend,
                "SELECT COALESCE(SUM(p.amount_minor), 0) AS sum \
                 FROM payments p \
                 JOIN invoices i ON i.id = p.invoice_id \
                 WHERE i.user_id = ? AND i.deleted_at IS NULL AND p.voided_at IS NULL \
                   AND i.status IN (?, ?, ?)",
                vec![
                    user_id.into(),
                    InvoiceStatus::Pending.as_str().into(),
                    InvoiceStatus::Partial.as_str().into(),
                    InvoiceStatus::Overdue.as_str().into(),
                ],
            );
            let received_on_open = Money::new(
                db_tx
                    .query_one(received_open)
                    .await?
                    .and_then(|r| r.try_get("", "sum").ok())
                    .unwrap_or(0),
            );
            stats.outstanding = stats.open_total - received_on_open;

            Ok(stats)
        })
    }
}
