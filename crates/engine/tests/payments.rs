use chrono::{DateTime, NaiveDate, Utc};
use engine::{
    Engine, EngineError, InvoiceStatus, LineInput, Money, NewBankAccountCmd, NewClientCmd,
    NewInvoiceCmd, NewProductCmd, PaymentMethod, ProfileUpsertCmd, RecordPaymentCmd,
};
use migration::MigratorTrait;
use sea_orm::Database;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn datetime(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    date(y, m, d).and_hms_opt(12, 0, 0).unwrap().and_utc()
}

struct Fixture {
    engine: Engine,
    user_id: String,
    bank_account_id: Uuid,
    /// PENDING invoice over 122.00 due 2026-03-31.
    invoice_id: Uuid,
}

async fn fixture() -> Fixture {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();

    let user_id = engine
        .new_user("Alice Rossi", "alice@example.com", "+39055123456", "password")
        .await
        .unwrap();
    engine
        .upsert_profile(ProfileUpsertCmd {
            user_id: user_id.clone(),
            company_name: "Rossi Consulting".to_string(),
            address: None,
            tax_number: None,
            currency: None,
        })
        .await
        .unwrap();
    let bank_account_id = engine
        .new_bank_account(NewBankAccountCmd {
            user_id: user_id.clone(),
            bank_name: "Banca Etica".to_string(),
            account_name: "Alice Rossi".to_string(),
            account_number: "IT60X0542811101000000123456".to_string(),
        })
        .await
        .unwrap();
    let client_id = engine
        .new_client(NewClientCmd::new(&user_id, "Acme Corp"))
        .await
        .unwrap();
    let product_id = engine
        .new_product(NewProductCmd::new(
            &user_id,
            "Consulting",
            Money::new(100_00),
            2200,
        ))
        .await
        .unwrap();

    let invoice_id = engine
        .new_invoice(NewInvoiceCmd::new(
            &user_id,
            client_id,
            date(2026, 3, 1),
            date(2026, 3, 31),
            vec![LineInput::new(product_id, 1)],
        ))
        .await
        .unwrap();
    engine.issue_invoice(&user_id, invoice_id).await.unwrap();

    Fixture {
        engine,
        user_id,
        bank_account_id,
        invoice_id,
    }
}

async fn status(f: &Fixture) -> InvoiceStatus {
    f.engine
        .invoice_with_items(&f.user_id, f.invoice_id)
        .await
        .unwrap()
        .status
}

#[tokio::test]
async fn partial_then_full_payment_reconciles_status() {
    let f = fixture().await;

    f.engine
        .record_payment(RecordPaymentCmd::new(
            &f.user_id,
            f.invoice_id,
            Money::new(22_00),
            date(2026, 3, 10),
            PaymentMethod::Cash,
        ))
        .await
        .unwrap();
    assert_eq!(status(&f).await, InvoiceStatus::Partial);

    f.engine
        .record_payment(
            RecordPaymentCmd::new(
                &f.user_id,
                f.invoice_id,
                Money::new(100_00),
                date(2026, 3, 20),
                PaymentMethod::BankTransfer,
            )
            .bank_account_id(f.bank_account_id)
            .reference("wire 42"),
        )
        .await
        .unwrap();
    assert_eq!(status(&f).await, InvoiceStatus::Paid);

    let payments = f
        .engine
        .payments_for_invoice(&f.user_id, f.invoice_id)
        .await
        .unwrap();
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[1].reference, Some("wire 42".to_string()));
    assert_eq!(payments[1].bank_account_id, Some(f.bank_account_id));

    // A settled invoice takes no further payments.
    let err = f
        .engine
        .record_payment(RecordPaymentCmd::new(
            &f.user_id,
            f.invoice_id,
            Money::new(1),
            date(2026, 3, 21),
            PaymentMethod::Cash,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidStatus(_)));
}

#[tokio::test]
async fn overpayment_is_rejected() {
    let f = fixture().await;

    let err = f
        .engine
        .record_payment(RecordPaymentCmd::new(
            &f.user_id,
            f.invoice_id,
            Money::new(122_01),
            date(2026, 3, 10),
            PaymentMethod::Cash,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
    assert_eq!(status(&f).await, InvoiceStatus::Pending);
}

#[tokio::test]
async fn method_and_instrument_must_match() {
    let f = fixture().await;

    // Bank transfer without an account.
    let err = f
        .engine
        .record_payment(RecordPaymentCmd::new(
            &f.user_id,
            f.invoice_id,
            Money::new(10_00),
            date(2026, 3, 10),
            PaymentMethod::BankTransfer,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    // Cash with an account.
    let err = f
        .engine
        .record_payment(
            RecordPaymentCmd::new(
                &f.user_id,
                f.invoice_id,
                Money::new(10_00),
                date(2026, 3, 10),
                PaymentMethod::Cash,
            )
            .bank_account_id(f.bank_account_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    // Someone else's instrument is a not-found, not a validation error.
    let err = f
        .engine
        .record_payment(
            RecordPaymentCmd::new(
                &f.user_id,
                f.invoice_id,
                Money::new(10_00),
                date(2026, 3, 10),
                PaymentMethod::BankTransfer,
            )
            .bank_account_id(Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("bank account not exists".to_string())
    );
}

#[tokio::test]
async fn payments_only_against_open_invoices() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();

    let user_id = engine
        .new_user("Alice Rossi", "alice@example.com", "+39055123456", "password")
        .await
        .unwrap();
    engine
        .upsert_profile(ProfileUpsertCmd {
            user_id: user_id.clone(),
            company_name: "Rossi Consulting".to_string(),
            address: None,
            tax_number: None,
            currency: None,
        })
        .await
        .unwrap();
    let client_id = engine
        .new_client(NewClientCmd::new(&user_id, "Acme Corp"))
        .await
        .unwrap();
    let product_id = engine
        .new_product(NewProductCmd::new(&user_id, "Consulting", Money::new(100_00), 0))
        .await
        .unwrap();

    // Still a draft.
    let invoice_id = engine
        .new_invoice(NewInvoiceCmd::new(
            &user_id,
            client_id,
            date(2026, 3, 1),
            date(2026, 3, 31),
            vec![LineInput::new(product_id, 1)],
        ))
        .await
        .unwrap();

    let err = engine
        .record_payment(RecordPaymentCmd::new(
            &user_id,
            invoice_id,
            Money::new(10_00),
            date(2026, 3, 10),
            PaymentMethod::Cash,
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidStatus("cannot record a payment against a draft invoice".to_string())
    );
}

#[tokio::test]
async fn late_partial_payment_lands_on_overdue() {
    let f = fixture().await;

    // Paying after the due date: partially covered and late means OVERDUE.
    f.engine
        .record_payment(RecordPaymentCmd::new(
            &f.user_id,
            f.invoice_id,
            Money::new(22_00),
            date(2026, 4, 10),
            PaymentMethod::Cash,
        ))
        .await
        .unwrap();
    assert_eq!(status(&f).await, InvoiceStatus::Overdue);

    // Full coverage wins regardless of lateness.
    f.engine
        .record_payment(RecordPaymentCmd::new(
            &f.user_id,
            f.invoice_id,
            Money::new(100_00),
            date(2026, 4, 20),
            PaymentMethod::Cash,
        ))
        .await
        .unwrap();
    assert_eq!(status(&f).await, InvoiceStatus::Paid);
}

#[tokio::test]
async fn voiding_reverts_reconciliation() {
    let f = fixture().await;

    let first = f
        .engine
        .record_payment(RecordPaymentCmd::new(
            &f.user_id,
            f.invoice_id,
            Money::new(22_00),
            date(2026, 3, 10),
            PaymentMethod::Cash,
        ))
        .await
        .unwrap();
    let second = f
        .engine
        .record_payment(RecordPaymentCmd::new(
            &f.user_id,
            f.invoice_id,
            Money::new(100_00),
            date(2026, 3, 12),
            PaymentMethod::Cash,
        ))
        .await
        .unwrap();
    assert_eq!(status(&f).await, InvoiceStatus::Paid);

    // Void while the invoice is still within terms: the status falls back
    // according to what remains covered.
    f.engine
        .void_payment(&f.user_id, second, datetime(2026, 3, 15))
        .await
        .unwrap();
    assert_eq!(status(&f).await, InvoiceStatus::Partial);

    f.engine
        .void_payment(&f.user_id, first, datetime(2026, 3, 16))
        .await
        .unwrap();
    assert_eq!(status(&f).await, InvoiceStatus::Pending);

    // A second void of the same payment is an error.
    let err = f
        .engine
        .void_payment(&f.user_id, first, datetime(2026, 3, 17))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidStatus("payment already voided".to_string())
    );

    // The voided rows are still listed for the audit trail.
    let payments = f
        .engine
        .payments_for_invoice(&f.user_id, f.invoice_id)
        .await
        .unwrap();
    assert_eq!(payments.len(), 2);
    assert!(payments.iter().all(|p| p.is_voided()));
}
