use chrono::NaiveDate;
use engine::{
    Engine, EngineError, InvoiceListFilter, InvoiceStatus, LineInput, Money, NewClientCmd,
    NewInvoiceCmd, NewProductCmd, PaymentMethod, ProfileUpsertCmd, RecordPaymentCmd,
    UpdateInvoiceCmd,
};
use migration::MigratorTrait;
use sea_orm::Database;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Fixture {
    engine: Engine,
    user_id: String,
    client_id: Uuid,
    consulting_id: Uuid,
    hosting_id: Uuid,
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
    let client_id = engine
        .new_client(NewClientCmd::new(&user_id, "Acme Corp"))
        .await
        .unwrap();
    // 100.00 at 22% VAT.
    let consulting_id = engine
        .new_product(NewProductCmd::new(
            &user_id,
            "Consulting",
            Money::new(100_00),
            2200,
        ))
        .await
        .unwrap();
    // 25.50 at 10%.
    let hosting_id = engine
        .new_product(NewProductCmd::new(
            &user_id,
            "Hosting",
            Money::new(25_50),
            1000,
        ))
        .await
        .unwrap();

    Fixture {
        engine,
        user_id,
        client_id,
        consulting_id,
        hosting_id,
    }
}

#[tokio::test]
async fn create_invoice_computes_totals_and_numbers() {
    let f = fixture().await;

    let invoice_id = f
        .engine
        .new_invoice(
            NewInvoiceCmd::new(
                &f.user_id,
                f.client_id,
                date(2026, 3, 1),
                date(2026, 3, 31),
                vec![
                    LineInput::new(f.consulting_id, 2),
                    LineInput::new(f.hosting_id, 3).description("Hosting Q1"),
                ],
            )
            .discount(Money::new(10_00)),
        )
        .await
        .unwrap();

    let invoice = f
        .engine
        .invoice_with_items(&f.user_id, invoice_id)
        .await
        .unwrap();

    assert_eq!(invoice.number, "INV-2026-0001");
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    // 2 * 100.00 + 3 * 25.50 = 276.50
    assert_eq!(invoice.subtotal, Money::new(276_50));
    // 22% of 200.00 + 10% of 76.50 = 44.00 + 7.65
    assert_eq!(invoice.tax, Money::new(51_65));
    assert_eq!(invoice.discount, Money::new(10_00));
    assert_eq!(invoice.total, Money::new(318_15));
    assert_eq!(
        invoice.subtotal + invoice.tax - invoice.discount,
        invoice.total
    );

    assert_eq!(invoice.items.len(), 2);
    assert_eq!(invoice.items[0].description, "Consulting");
    assert_eq!(invoice.items[1].description, "Hosting Q1");

    // Numbers are sequential per user and year.
    let second = f
        .engine
        .new_invoice(NewInvoiceCmd::new(
            &f.user_id,
            f.client_id,
            date(2026, 4, 1),
            date(2026, 4, 30),
            vec![LineInput::new(f.consulting_id, 1)],
        ))
        .await
        .unwrap();
    let second = f.engine.invoice_with_items(&f.user_id, second).await.unwrap();
    assert_eq!(second.number, "INV-2026-0002");
}

#[tokio::test]
async fn draft_update_replaces_items_and_recomputes() {
    let f = fixture().await;

    let invoice_id = f
        .engine
        .new_invoice(NewInvoiceCmd::new(
            &f.user_id,
            f.client_id,
            date(2026, 3, 1),
            date(2026, 3, 31),
            vec![LineInput::new(f.consulting_id, 2)],
        ))
        .await
        .unwrap();

    f.engine
        .update_invoice(UpdateInvoiceCmd {
            user_id: f.user_id.clone(),
            invoice_id,
            issue_date: date(2026, 3, 2),
            due_date: date(2026, 4, 1),
            items: vec![LineInput::new(f.hosting_id, 1)],
            discount: Money::ZERO,
            note: Some("replaced".to_string()),
        })
        .await
        .unwrap();

    let invoice = f
        .engine
        .invoice_with_items(&f.user_id, invoice_id)
        .await
        .unwrap();
    assert_eq!(invoice.items.len(), 1);
    assert_eq!(invoice.subtotal, Money::new(25_50));
    assert_eq!(invoice.tax, Money::new(2_55));
    assert_eq!(invoice.total, Money::new(28_05));
    assert_eq!(invoice.issue_date, date(2026, 3, 2));
    assert_eq!(invoice.note, Some("replaced".to_string()));
}

#[tokio::test]
async fn issued_invoices_are_frozen() {
    let f = fixture().await;

    let invoice_id = f
        .engine
        .new_invoice(NewInvoiceCmd::new(
            &f.user_id,
            f.client_id,
            date(2026, 3, 1),
            date(2026, 3, 31),
            vec![LineInput::new(f.consulting_id, 1)],
        ))
        .await
        .unwrap();

    f.engine.issue_invoice(&f.user_id, invoice_id).await.unwrap();
    let invoice = f
        .engine
        .invoice_with_items(&f.user_id, invoice_id)
        .await
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Pending);

    // No second issue, no edits, no delete.
    assert!(f.engine.issue_invoice(&f.user_id, invoice_id).await.is_err());
    let err = f
        .engine
        .update_invoice(UpdateInvoiceCmd {
            user_id: f.user_id.clone(),
            invoice_id,
            issue_date: date(2026, 3, 1),
            due_date: date(2026, 3, 31),
            items: vec![LineInput::new(f.hosting_id, 1)],
            discount: Money::ZERO,
            note: None,
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidStatus("only draft invoices can be edited".to_string())
    );
    assert!(f.engine.delete_invoice(&f.user_id, invoice_id).await.is_err());

    // An unpaid pending invoice can still be cancelled, then deleted.
    f.engine.cancel_invoice(&f.user_id, invoice_id).await.unwrap();
    f.engine.delete_invoice(&f.user_id, invoice_id).await.unwrap();
    let err = f
        .engine
        .invoice_with_items(&f.user_id, invoice_id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("invoice not exists".to_string())
    );
}

#[tokio::test]
async fn list_filters_and_paginates() {
    let f = fixture().await;

    let mut ids = Vec::new();
    for day in 1..=5 {
        let id = f
            .engine
            .new_invoice(NewInvoiceCmd::new(
                &f.user_id,
                f.client_id,
                date(2026, 3, day),
                date(2026, 3, 31),
                vec![LineInput::new(f.consulting_id, 1)],
            ))
            .await
            .unwrap();
        ids.push(id);
    }
    // Issue the two oldest.
    f.engine.issue_invoice(&f.user_id, ids[0]).await.unwrap();
    f.engine.issue_invoice(&f.user_id, ids[1]).await.unwrap();

    // Status filter.
    let pending = f
        .engine
        .list_invoices(
            &f.user_id,
            50,
            &InvoiceListFilter {
                statuses: Some(vec![InvoiceStatus::Pending]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);

    // Date range [2026-03-02, 2026-03-04).
    let ranged = f
        .engine
        .list_invoices(
            &f.user_id,
            50,
            &InvoiceListFilter {
                from: Some(date(2026, 3, 2)),
                to: Some(date(2026, 3, 4)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ranged.len(), 2);

    // Cursor pagination, newest first.
    let filter = InvoiceListFilter::default();
    let (page1, cursor) = f
        .engine
        .list_invoices_page(&f.user_id, 2, None, &filter)
        .await
        .unwrap();
    assert_eq!(page1.len(), 2);
    assert_eq!(page1[0].issue_date, date(2026, 3, 5));
    let cursor = cursor.expect("more pages expected");

    let (page2, cursor2) = f
        .engine
        .list_invoices_page(&f.user_id, 2, Some(&cursor), &filter)
        .await
        .unwrap();
    assert_eq!(page2.len(), 2);
    assert_eq!(page2[0].issue_date, date(2026, 3, 3));
    let cursor2 = cursor2.expect("more pages expected");

    let (page3, cursor3) = f
        .engine
        .list_invoices_page(&f.user_id, 2, Some(&cursor2), &filter)
        .await
        .unwrap();
    assert_eq!(page3.len(), 1);
    assert!(cursor3.is_none());

    // Garbage cursors are rejected.
    let err = f
        .engine
        .list_invoices_page(&f.user_id, 2, Some("not-a-cursor"), &filter)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCursor(_)));
}

#[tokio::test]
async fn sweep_rolls_open_invoices_overdue() {
    let f = fixture().await;

    let due_soon = f
        .engine
        .new_invoice(NewInvoiceCmd::new(
            &f.user_id,
            f.client_id,
            date(2026, 3, 1),
            date(2026, 3, 31),
            vec![LineInput::new(f.consulting_id, 1)],
        ))
        .await
        .unwrap();
    let due_long = f
        .engine
        .new_invoice(NewInvoiceCmd::new(
            &f.user_id,
            f.client_id,
            date(2026, 3, 1),
            date(2026, 6, 30),
            vec![LineInput::new(f.consulting_id, 1)],
        ))
        .await
        .unwrap();
    f.engine.issue_invoice(&f.user_id, due_soon).await.unwrap();
    f.engine.issue_invoice(&f.user_id, due_long).await.unwrap();

    let swept = f
        .engine
        .sweep_overdue_for_user(&f.user_id, date(2026, 4, 1))
        .await
        .unwrap();
    assert_eq!(swept, vec![due_soon]);

    let invoice = f
        .engine
        .invoice_with_items(&f.user_id, due_soon)
        .await
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Overdue);
    let other = f
        .engine
        .invoice_with_items(&f.user_id, due_long)
        .await
        .unwrap();
    assert_eq!(other.status, InvoiceStatus::Pending);

    // Drafts are never swept.
    let draft = f
        .engine
        .new_invoice(NewInvoiceCmd::new(
            &f.user_id,
            f.client_id,
            date(2026, 1, 1),
            date(2026, 1, 15),
            vec![LineInput::new(f.consulting_id, 1)],
        ))
        .await
        .unwrap();
    let swept = f
        .engine
        .sweep_overdue_for_user(&f.user_id, date(2026, 4, 1))
        .await
        .unwrap();
    assert!(swept.is_empty());
    let invoice = f.engine.invoice_with_items(&f.user_id, draft).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Draft);
}

#[tokio::test]
async fn client_with_open_invoices_cannot_be_deleted() {
    let f = fixture().await;

    let invoice_id = f
        .engine
        .new_invoice(NewInvoiceCmd::new(
            &f.user_id,
            f.client_id,
            date(2026, 3, 1),
            date(2026, 3, 31),
            vec![LineInput::new(f.consulting_id, 1)],
        ))
        .await
        .unwrap();
    f.engine.issue_invoice(&f.user_id, invoice_id).await.unwrap();

    let err = f
        .engine
        .delete_client(&f.user_id, f.client_id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidStatus("client has open invoices".to_string())
    );

    // Settle the invoice; the client can now go.
    f.engine
        .record_payment(RecordPaymentCmd::new(
            &f.user_id,
            invoice_id,
            Money::new(122_00),
            date(2026, 3, 10),
            PaymentMethod::Cash,
        ))
        .await
        .unwrap();
    f.engine.delete_client(&f.user_id, f.client_id).await.unwrap();
}

#[tokio::test]
async fn other_users_cannot_see_the_invoice() {
    let f = fixture().await;

    let invoice_id = f
        .engine
        .new_invoice(NewInvoiceCmd::new(
            &f.user_id,
            f.client_id,
            date(2026, 3, 1),
            date(2026, 3, 31),
            vec![LineInput::new(f.consulting_id, 1)],
        ))
        .await
        .unwrap();

    let other = f
        .engine
        .new_user("Bob", "bob@example.com", "+39055999999", "password")
        .await
        .unwrap();
    let err = f
        .engine
        .invoice_with_items(&other, invoice_id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("invoice not exists".to_string())
    );
}
