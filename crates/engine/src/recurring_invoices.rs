//! Recurring invoice templates.
//!
//! A template periodically materializes concrete DRAFT invoices according to
//! its pattern. Generation is an explicit operation (`generate_due_invoices`);
//! nothing runs on a timer.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, recurring_invoice_items::RecurringInvoiceItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurringPattern {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Semiannually,
    Annually,
}

impl RecurringPattern {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Semiannually => "semiannually",
            Self::Annually => "annually",
        }
    }

    /// Returns the `n`-th occurrence of a schedule anchored at `start`
    /// (occurrence 0 is `start` itself).
    ///
    /// Occurrences are always computed from the anchor, never from the
    /// previous occurrence, so month-end clamping does not drift: a schedule
    /// anchored on Jan 31 runs Jan 31, Feb 28/29, Mar 31, ...
    pub fn occurrence(self, start: NaiveDate, n: u32) -> ResultEngine<NaiveDate> {
        let date = match self {
            Self::Weekly => start.checked_add_days(Days::new(7 * u64::from(n))),
            Self::Biweekly => start.checked_add_days(Days::new(14 * u64::from(n))),
            Self::Monthly => start.checked_add_months(Months::new(n)),
            Self::Quarterly => n
                .checked_mul(3)
                .and_then(|months| start.checked_add_months(Months::new(months))),
            Self::Semiannually => n
                .checked_mul(6)
                .and_then(|months| start.checked_add_months(Months::new(months))),
            Self::Annually => n
                .checked_mul(12)
                .and_then(|months| start.checked_add_months(Months::new(months))),
        };
        date.ok_or_else(|| {
            EngineError::InvalidPattern(format!(
                "date overflow at occurrence {n} of {} from {start}",
                self.as_str()
            ))
        })
    }
}

impl TryFrom<&str> for RecurringPattern {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "semiannually" => Ok(Self::Semiannually),
            "annually" => Ok(Self::Annually),
            other => Err(EngineError::InvalidPattern(format!(
                "invalid recurring pattern: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecurringInvoice {
    pub id: Uuid,
    pub user_id: String,
    pub client_id: Uuid,
    pub pattern: RecurringPattern,
    pub start_date: NaiveDate,
    /// The next occurrence still to be materialized.
    pub next_invoice_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Generated invoices fall due this many days after their issue date.
    pub due_in_days: i64,
    /// Invoice-level discount applied to every generated invoice.
    pub discount: Money,
    pub is_active: bool,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub items: Vec<RecurringInvoiceItem>,
}

impl RecurringInvoice {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        client_id: Uuid,
        pattern: RecurringPattern,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        due_in_days: i64,
        discount: Money,
        note: Option<String>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if let Some(end) = end_date
            && end < start_date
        {
            return Err(EngineError::InvalidPattern(
                "end_date must not precede start_date".to_string(),
            ));
        }
        if due_in_days < 0 {
            return Err(EngineError::InvalidAmount(
                "due_in_days must not be negative".to_string(),
            ));
        }
        if discount.is_negative() {
            return Err(EngineError::InvalidAmount(
                "discount must not be negative".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            client_id,
            pattern,
            start_date,
            next_invoice_date: start_date,
            end_date,
            due_in_days,
            discount,
            is_active: true,
            note,
            created_at,
            updated_at: created_at,
            deleted_at: None,
            items: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub client_id: String,
    pub pattern: String,
    pub start_date: Date,
    pub next_invoice_date: Date,
    pub end_date: Option<Date>,
    pub due_in_days: i64,
    pub discount_minor: i64,
    pub is_active: bool,
    pub note: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::clients::Entity",
        from = "Column::ClientId",
        to = "super::clients::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Clients,
    #[sea_orm(has_many = "super::recurring_invoice_items::Entity")]
    RecurringInvoiceItems,
    #[sea_orm(has_many = "super::invoices::Entity")]
    GeneratedInvoices,
}

impl Related<super::recurring_invoice_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringInvoiceItems.def()
    }
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GeneratedInvoices.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&RecurringInvoice> for ActiveModel {
    fn from(template: &RecurringInvoice) -> Self {
        Self {
            id: ActiveValue::Set(template.id.to_string()),
            user_id: ActiveValue::Set(template.user_id.clone()),
            client_id: ActiveValue::Set(template.client_id.to_string()),
            pattern: ActiveValue::Set(template.pattern.as_str().to_string()),
            start_date: ActiveValue::Set(template.start_date),
            next_invoice_date: ActiveValue::Set(template.next_invoice_date),
            end_date: ActiveValue::Set(template.end_date),
            due_in_days: ActiveValue::Set(template.due_in_days),
            discount_minor: ActiveValue::Set(template.discount.minor()),
            is_active: ActiveValue::Set(template.is_active),
            note: ActiveValue::Set(template.note.clone()),
            created_at: ActiveValue::Set(template.created_at),
            updated_at: ActiveValue::Set(template.updated_at),
            deleted_at: ActiveValue::Set(template.deleted_at),
        }
    }
}

impl TryFrom<Model> for RecurringInvoice {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid recurring invoice id".to_string()))?,
            user_id: model.user_id,
            client_id: Uuid::parse_str(&model.client_id)
                .map_err(|_| EngineError::InvalidId("invalid client id".to_string()))?,
            pattern: RecurringPattern::try_from(model.pattern.as_str())?,
            start_date: model.start_date,
            next_invoice_date: model.next_invoice_date,
            end_date: model.end_date,
            due_in_days: model.due_in_days,
            discount: Money::new(model.discount_minor),
            is_active: model.is_active,
            note: model.note,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
            items: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_based_patterns_step_exactly() {
        let start = date(2026, 1, 1);
        assert_eq!(
            RecurringPattern::Weekly.occurrence(start, 0).unwrap(),
            start
        );
        assert_eq!(
            RecurringPattern::Weekly.occurrence(start, 1).unwrap(),
            date(2026, 1, 8)
        );
        assert_eq!(
            RecurringPattern::Biweekly
                .occurrence(date(2026, 12, 28), 1)
                .unwrap(),
            date(2027, 1, 11)
        );
    }

    #[test]
    fn month_based_patterns_clamp_without_drifting() {
        let start = date(2026, 1, 31);
        assert_eq!(
            RecurringPattern::Monthly.occurrence(start, 1).unwrap(),
            date(2026, 2, 28)
        );
        // Anchored at the 31st, March snaps back to the 31st instead of
        // inheriting February's clamp.
        assert_eq!(
            RecurringPattern::Monthly.occurrence(start, 2).unwrap(),
            date(2026, 3, 31)
        );
        assert_eq!(
            RecurringPattern::Monthly.occurrence(start, 3).unwrap(),
            date(2026, 4, 30)
        );
        // 2028 is a leap year.
        assert_eq!(
            RecurringPattern::Monthly
                .occurrence(date(2028, 1, 31), 1)
                .unwrap(),
            date(2028, 2, 29)
        );
        assert_eq!(
            RecurringPattern::Quarterly
                .occurrence(date(2026, 11, 30), 1)
                .unwrap(),
            date(2027, 2, 28)
        );
        assert_eq!(
            RecurringPattern::Semiannually
                .occurrence(date(2026, 8, 31), 1)
                .unwrap(),
            date(2027, 2, 28)
        );
        assert_eq!(
            RecurringPattern::Annually
                .occurrence(date(2028, 2, 29), 1)
                .unwrap(),
            date(2029, 2, 28)
        );
    }

    #[test]
    fn template_rejects_inverted_dates() {
        let res = RecurringInvoice::new(
            "user".to_string(),
            Uuid::new_v4(),
            RecurringPattern::Monthly,
            date(2026, 5, 1),
            Some(date(2026, 4, 1)),
            14,
            Money::ZERO,
            None,
            Utc::now(),
        );
        assert!(res.is_err());
    }
}
