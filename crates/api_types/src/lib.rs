use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account currency. Monetary fields are integer minor units of this
/// currency (2 fraction digits for EUR/USD, 0 for IDR).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Idr,
}

pub mod client {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ClientNew {
        pub name: String,
        pub email: Option<String>,
        pub phone: Option<String>,
        pub address: Option<String>,
        pub note: Option<String>,
    }

    /// Full update: every optional field is replaced as given.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ClientUpdate {
        pub name: String,
        pub email: Option<String>,
        pub phone: Option<String>,
        pub address: Option<String>,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ClientView {
        pub id: Uuid,
        pub name: String,
        pub email: Option<String>,
        pub phone: Option<String>,
        pub address: Option<String>,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ClientsResponse {
        pub clients: Vec<ClientView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ClientCreated {
        pub id: Uuid,
    }
}

pub mod product {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductNew {
        pub name: String,
        pub description: Option<String>,
        /// Free-form unit label shown on invoice lines ("hour", "pcs").
        pub unit: Option<String>,
        pub price_minor: i64,
        /// Tax rate in basis points (1% = 100).
        pub tax_rate_bps: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductUpdate {
        pub name: String,
        pub description: Option<String>,
        pub unit: Option<String>,
        pub price_minor: i64,
        pub tax_rate_bps: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductView {
        pub id: Uuid,
        pub name: String,
        pub description: Option<String>,
        pub unit: Option<String>,
        pub price_minor: i64,
        pub tax_rate_bps: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductsResponse {
        pub products: Vec<ProductView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductCreated {
        pub id: Uuid,
    }
}

pub mod profile {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProfileUpsert {
        pub company_name: String,
        pub address: Option<String>,
        pub tax_number: Option<String>,
        /// `None` keeps the current currency (or the default on first
        /// creation). Rejected once invoices exist.
        pub currency: Option<Currency>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProfileView {
        pub company_name: String,
        pub address: Option<String>,
        pub tax_number: Option<String>,
        pub currency: Currency,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BankAccountNew {
        pub bank_name: String,
        pub account_name: String,
        pub account_number: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EWalletNew {
        pub provider: String,
        pub account_name: String,
        pub phone_number: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InstrumentCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BankAccountView {
        pub id: Uuid,
        pub bank_name: String,
        pub account_name: String,
        pub account_number: String,
        pub is_primary: bool,
        pub archived: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EWalletView {
        pub id: Uuid,
        pub provider: String,
        pub account_name: String,
        pub phone_number: String,
        pub is_primary: bool,
        pub archived: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InstrumentsResponse {
        pub bank_accounts: Vec<BankAccountView>,
        pub e_wallets: Vec<EWalletView>,
    }
}

pub mod invoice {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum InvoiceStatus {
        Draft,
        Pending,
        Paid,
        Partial,
        Overdue,
        Cancelled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LineNew {
        pub product_id: Uuid,
        pub quantity: i64,
        /// Overrides the product description on this line when set.
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvoiceNew {
        pub client_id: Uuid,
        pub issue_date: NaiveDate,
        pub due_date: NaiveDate,
        pub items: Vec<LineNew>,
        pub discount_minor: Option<i64>,
        pub note: Option<String>,
    }

    /// Rework a DRAFT invoice; the item list is replaced wholesale.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvoiceUpdate {
        pub issue_date: NaiveDate,
        pub due_date: NaiveDate,
        pub items: Vec<LineNew>,
        pub discount_minor: Option<i64>,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvoiceList {
        pub statuses: Option<Vec<InvoiceStatus>>,
        pub client_id: Option<Uuid>,
        /// Inclusive lower bound on the issue date.
        pub from: Option<NaiveDate>,
        /// Exclusive upper bound on the issue date.
        pub to: Option<NaiveDate>,
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvoiceView {
        pub id: Uuid,
        pub client_id: Uuid,
        pub recurring_invoice_id: Option<Uuid>,
        pub number: String,
        pub status: InvoiceStatus,
        pub issue_date: NaiveDate,
        pub due_date: NaiveDate,
        pub subtotal_minor: i64,
        pub tax_minor: i64,
        pub discount_minor: i64,
        pub total_minor: i64,
        pub currency: Currency,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvoiceItemView {
        pub product_id: Uuid,
        pub description: String,
        pub quantity: i64,
        pub unit_price_minor: i64,
        pub tax_rate_bps: i64,
        pub tax_minor: i64,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvoiceDetailResponse {
        pub invoice: InvoiceView,
        pub items: Vec<InvoiceItemView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvoiceListResponse {
        pub invoices: Vec<InvoiceView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvoiceCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SweepOverdue {
        /// Aging reference date; the server uses today when absent.
        pub as_of: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SweepOverdueResponse {
        pub invoice_ids: Vec<Uuid>,
    }
}

pub mod payment {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentMethod {
        Cash,
        BankTransfer,
        EWallet,
        Other,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentNew {
        pub amount_minor: i64,
        pub payment_date: NaiveDate,
        pub method: PaymentMethod,
        /// Required for `bank_transfer`, forbidden otherwise.
        pub bank_account_id: Option<Uuid>,
        /// Required for `e_wallet`, forbidden otherwise.
        pub e_wallet_id: Option<Uuid>,
        pub reference: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        pub id: Uuid,
        pub amount_minor: i64,
        pub payment_date: NaiveDate,
        pub method: PaymentMethod,
        pub bank_account_id: Option<Uuid>,
        pub e_wallet_id: Option<Uuid>,
        pub reference: Option<String>,
        pub voided: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentsResponse {
        pub payments: Vec<PaymentView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentCreated {
        pub id: Uuid,
    }
}

pub mod recurring {
    use super::*;
    use super::invoice::LineNew;

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

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecurringNew {
        pub client_id: Uuid,
        pub pattern: RecurringPattern,
        pub start_date: NaiveDate,
        pub end_date: Option<NaiveDate>,
        /// Generated invoices fall due this many days after their issue
        /// date.
        pub due_in_days: i64,
        pub items: Vec<LineNew>,
        pub discount_minor: Option<i64>,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecurringUpdate {
        pub pattern: RecurringPattern,
        pub end_date: Option<NaiveDate>,
        pub due_in_days: i64,
        pub items: Vec<LineNew>,
        pub discount_minor: Option<i64>,
        pub note: Option<String>,
        /// Only moves the schedule when explicitly provided.
        pub next_invoice_date: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecurringView {
        pub id: Uuid,
        pub client_id: Uuid,
        pub pattern: RecurringPattern,
        pub start_date: NaiveDate,
        pub next_invoice_date: NaiveDate,
        pub end_date: Option<NaiveDate>,
        pub due_in_days: i64,
        pub discount_minor: i64,
        pub is_active: bool,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecurringItemView {
        pub product_id: Uuid,
        pub description: String,
        pub quantity: i64,
        pub unit_price_minor: i64,
        pub tax_rate_bps: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecurringDetailResponse {
        pub recurring: RecurringView,
        pub items: Vec<RecurringItemView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecurringListResponse {
        pub recurring: Vec<RecurringView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecurringCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecurringSetActive {
        pub is_active: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GenerateRequest {
        /// Generate occurrences due up to this date; the server uses today
        /// when absent.
        pub as_of: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GeneratedInvoiceView {
        pub recurring_invoice_id: Uuid,
        pub invoice_id: Uuid,
        pub number: String,
        pub issue_date: NaiveDate,
        pub total_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GenerateResponse {
        pub generated: Vec<GeneratedInvoiceView>,
    }
}

pub mod stats {
    use super::*;

    /// Dashboard totals. "Open" covers pending + partial + overdue.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Statistic {
        pub currency: Currency,
        pub draft_count: i64,
        pub draft_total_minor: i64,
        pub open_count: i64,
        pub open_total_minor: i64,
        pub overdue_count: i64,
        pub overdue_total_minor: i64,
        pub paid_count: i64,
        pub paid_total_minor: i64,
        pub total_received_minor: i64,
        /// Still owed on open invoices after non-voided payments.
        pub outstanding_minor: i64,
    }
}
