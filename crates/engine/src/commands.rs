//! Command structs for engine operations.
//!
//! These types group parameters for multi-field write operations, keeping
//! call sites readable and avoiding long argument lists.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{Currency, Money, PaymentMethod, RecurringPattern};

/// One requested invoice line. The product supplies unit price, tax rate and
/// (unless overridden) the description; quantity comes from the caller.
#[derive(Clone, Debug)]
pub struct LineInput {
    pub product_id: Uuid,
    pub quantity: i64,
    /// Overrides the product description on this line when set.
    pub description: Option<String>,
}

impl LineInput {
    #[must_use]
    pub fn new(product_id: Uuid, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
            description: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Create a client.
#[derive(Clone, Debug)]
pub struct NewClientCmd {
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
}

impl NewClientCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            email: None,
            phone: None,
            address: None,
            note: None,
        }
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Full update of a client (all optional fields are replaced as given).
#[derive(Clone, Debug)]
pub struct UpdateClientCmd {
    pub user_id: String,
    pub client_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
}

/// Create a product.
#[derive(Clone, Debug)]
pub struct NewProductCmd {
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price: Money,
    pub tax_rate_bps: i64,
}

impl NewProductCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        tax_rate_bps: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            description: None,
            unit: None,
            price,
            tax_rate_bps,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Full update of a product.
#[derive(Clone, Debug)]
pub struct UpdateProductCmd {
    pub user_id: String,
    pub product_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price: Money,
    pub tax_rate_bps: i64,
}

/// Create-or-update the billing profile of a user.
#[derive(Clone, Debug)]
pub struct ProfileUpsertCmd {
    pub user_id: String,
    pub company_name: String,
    pub address: Option<String>,
    pub tax_number: Option<String>,
    /// Account currency. `None` keeps the current one (or the default on
    /// first creation). Changing it is rejected once invoices exist.
    pub currency: Option<Currency>,
}

/// Register a bank account on the user's profile.
#[derive(Clone, Debug)]
pub struct NewBankAccountCmd {
    pub user_id: String,
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
}

/// Register an e-wallet on the user's profile.
#[derive(Clone, Debug)]
pub struct NewEWalletCmd {
    pub user_id: String,
    pub provider: String,
    pub account_name: String,
    pub phone_number: String,
}

/// Create a DRAFT invoice.
#[derive(Clone, Debug)]
pub struct NewInvoiceCmd {
    pub user_id: String,
    pub client_id: Uuid,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<LineInput>,
    pub discount: Money,
    pub note: Option<String>,
}

impl NewInvoiceCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        client_id: Uuid,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        items: Vec<LineInput>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            client_id,
            issue_date,
            due_date,
            items,
            discount: Money::ZERO,
            note: None,
        }
    }

    #[must_use]
    pub fn discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Rework a DRAFT invoice: dates, note, discount and the full item list are
/// replaced, and all totals recomputed.
#[derive(Clone, Debug)]
pub struct UpdateInvoiceCmd {
    pub user_id: String,
    pub invoice_id: Uuid,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<LineInput>,
    pub discount: Money,
    pub note: Option<String>,
}

/// Record a payment against an open invoice.
#[derive(Clone, Debug)]
pub struct RecordPaymentCmd {
    pub user_id: String,
    pub invoice_id: Uuid,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub bank_account_id: Option<Uuid>,
    pub e_wallet_id: Option<Uuid>,
    pub reference: Option<String>,
}

impl RecordPaymentCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        invoice_id: Uuid,
        amount: Money,
        payment_date: NaiveDate,
        method: PaymentMethod,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            invoice_id,
            amount,
            payment_date,
            method,
            bank_account_id: None,
            e_wallet_id: None,
            reference: None,
        }
    }

    #[must_use]
    pub fn bank_account_id(mut self, id: Uuid) -> Self {
        self.bank_account_id = Some(id);
        self
    }

    #[must_use]
    pub fn e_wallet_id(mut self, id: Uuid) -> Self {
        self.e_wallet_id = Some(id);
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Create a recurring invoice template.
#[derive(Clone, Debug)]
pub struct NewRecurringCmd {
    pub user_id: String,
    pub client_id: Uuid,
    pub pattern: RecurringPattern,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub due_in_days: i64,
    pub items: Vec<LineInput>,
    pub discount: Money,
    pub note: Option<String>,
}

impl NewRecurringCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        client_id: Uuid,
        pattern: RecurringPattern,
        start_date: NaiveDate,
        due_in_days: i64,
        items: Vec<LineInput>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            client_id,
            pattern,
            start_date,
            end_date: None,
            due_in_days,
            items,
            discount: Money::ZERO,
            note: None,
        }
    }

    #[must_use]
    pub fn end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    #[must_use]
    pub fn discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Rework a recurring template. The item list is replaced; the schedule
/// fields are replaced as given. `next_invoice_date` is only touched when
/// explicitly provided.
#[derive(Clone, Debug)]
pub struct UpdateRecurringCmd {
    pub user_id: String,
    pub recurring_id: Uuid,
    pub pattern: RecurringPattern,
    pub end_date: Option<NaiveDate>,
    pub due_in_days: i64,
    pub items: Vec<LineInput>,
    pub discount: Money,
    pub note: Option<String>,
    pub next_invoice_date: Option<NaiveDate>,
}
