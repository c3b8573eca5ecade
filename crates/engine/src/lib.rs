pub use bank_accounts::BankAccount;
pub use clients::Client;
pub use commands::{
    LineInput, NewBankAccountCmd, NewClientCmd, NewEWalletCmd, NewInvoiceCmd, NewProductCmd,
    NewRecurringCmd, ProfileUpsertCmd, RecordPaymentCmd, UpdateClientCmd, UpdateInvoiceCmd,
    UpdateProductCmd, UpdateRecurringCmd,
};
pub use currency::Currency;
pub use e_wallets::EWallet;
pub use error::EngineError;
pub use invoice_items::InvoiceItem;
pub use invoices::{Invoice, InvoiceStatus};
pub use money::Money;
pub use ops::{Engine, EngineBuilder, GeneratedInvoice, InvoiceListFilter, UserStatistics};
pub use payments::{Payment, PaymentMethod};
pub use products::Product;
pub use profiles::Profile;
pub use recurring_invoice_items::RecurringInvoiceItem;
pub use recurring_invoices::{RecurringInvoice, RecurringPattern};
pub use users::User;

mod bank_accounts;
mod clients;
mod commands;
mod currency;
mod e_wallets;
mod error;
mod invoice_items;
mod invoices;
mod money;
mod ops;
mod payments;
mod products;
mod profiles;
mod recurring_invoice_items;
mod recurring_invoices;
mod users;

type ResultEngine<T> = Result<T, EngineError>;
