use chrono::NaiveDate;
use engine::{
    Engine, EngineError, InvoiceStatus, LineInput, Money, NewClientCmd, NewProductCmd,
    NewRecurringCmd, ProfileUpsertCmd, RecurringPattern, UpdateProductCmd, UpdateRecurringCmd,
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
    product_id: Uuid,
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
    // 50.00 at 22%.
    let product_id = engine
        .new_product(NewProductCmd::new(
            &user_id,
            "Retainer",
            Money::new(50_00),
            2200,
        ))
        .await
        .unwrap();

    Fixture {
        engine,
        user_id,
        client_id,
        product_id,
    }
}

#[tokio::test]
async fn generation_materializes_draft_invoices_with_provenance() {
    let f = fixture().await;

    let recurring_id = f
        .engine
        .new_recurring(NewRecurringCmd::new(
            &f.user_id,
            f.client_id,
            RecurringPattern::Monthly,
            date(2026, 1, 15),
            14,
            vec![LineInput::new(f.product_id, 2)],
        ))
        .await
        .unwrap();

    let generated = f
        .engine
        .generate_due_invoices(date(2026, 1, 15))
        .await
        .unwrap();
    assert_eq!(generated.len(), 1);
    assert_eq!(generated[0].number, "INV-2026-0001");
    assert_eq!(generated[0].issue_date, date(2026, 1, 15));
    // 2 * 50.00 + 22% tax = 122.00
    assert_eq!(generated[0].total, Money::new(122_00));

    let invoice = f
        .engine
        .invoice_with_items(&f.user_id, generated[0].invoice_id)
        .await
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.recurring_invoice_id, Some(recurring_id));
    assert_eq!(invoice.issue_date, date(2026, 1, 15));
    assert_eq!(invoice.due_date, date(2026, 1, 29));
    assert_eq!(invoice.items.len(), 1);

    let template = f
        .engine
        .recurring_with_items(&f.user_id, recurring_id)
        .await
        .unwrap();
    assert_eq!(template.next_invoice_date, date(2026, 2, 15));
    assert!(template.is_active);

    // Nothing more is due until the next occurrence.
    let generated = f
        .engine
        .generate_due_invoices(date(2026, 2, 14))
        .await
        .unwrap();
    assert!(generated.is_empty());
}

#[tokio::test]
async fn stale_templates_catch_up_one_invoice_per_period() {
    let f = fixture().await;

    f.engine
        .new_recurring(NewRecurringCmd::new(
            &f.user_id,
            f.client_id,
            RecurringPattern::Monthly,
            date(2026, 1, 31),
            30,
            vec![LineInput::new(f.product_id, 1)],
        ))
        .await
        .unwrap();

    let generated = f
        .engine
        .generate_due_invoices(date(2026, 4, 10))
        .await
        .unwrap();

    // Jan 31, Feb 28, Mar 31 (month-end clamped), next is Apr 30.
    let dates: Vec<NaiveDate> = generated.iter().map(|g| g.issue_date).collect();
    assert_eq!(
        dates,
        vec![date(2026, 1, 31), date(2026, 2, 28), date(2026, 3, 31)]
    );
    let numbers: Vec<&str> = generated.iter().map(|g| g.number.as_str()).collect();
    assert_eq!(
        numbers,
        vec!["INV-2026-0001", "INV-2026-0002", "INV-2026-0003"]
    );
}

#[tokio::test]
async fn templates_expire_at_end_date() {
    let f = fixture().await;

    let recurring_id = f
        .engine
        .new_recurring(
            NewRecurringCmd::new(
                &f.user_id,
                f.client_id,
                RecurringPattern::Weekly,
                date(2026, 3, 2),
                7,
                vec![LineInput::new(f.product_id, 1)],
            )
            .end_date(date(2026, 3, 16)),
        )
        .await
        .unwrap();

    let generated = f
        .engine
        .generate_due_invoices(date(2026, 4, 1))
        .await
        .unwrap();
    // Mar 2, Mar 9, Mar 16; Mar 23 is past the end date.
    assert_eq!(generated.len(), 3);

    let template = f
        .engine
        .recurring_with_items(&f.user_id, recurring_id)
        .await
        .unwrap();
    assert!(!template.is_active);

    // Expired templates generate nothing further.
    let generated = f
        .engine
        .generate_due_invoices(date(2026, 5, 1))
        .await
        .unwrap();
    assert!(generated.is_empty());
}

#[tokio::test]
async fn paused_templates_are_skipped() {
    let f = fixture().await;

    let recurring_id = f
        .engine
        .new_recurring(NewRecurringCmd::new(
            &f.user_id,
            f.client_id,
            RecurringPattern::Monthly,
            date(2026, 1, 1),
            14,
            vec![LineInput::new(f.product_id, 1)],
        ))
        .await
        .unwrap();

    f.engine
        .set_recurring_active(&f.user_id, recurring_id, false)
        .await
        .unwrap();
    let generated = f
        .engine
        .generate_due_invoices(date(2026, 2, 1))
        .await
        .unwrap();
    assert!(generated.is_empty());

    // Resume and catch up.
    f.engine
        .set_recurring_active(&f.user_id, recurring_id, true)
        .await
        .unwrap();
    let generated = f
        .engine
        .generate_due_invoices(date(2026, 2, 1))
        .await
        .unwrap();
    assert_eq!(generated.len(), 2);
}

#[tokio::test]
async fn generation_uses_template_snapshots_not_current_prices() {
    let f = fixture().await;

    f.engine
        .new_recurring(NewRecurringCmd::new(
            &f.user_id,
            f.client_id,
            RecurringPattern::Monthly,
            date(2026, 1, 1),
            14,
            vec![LineInput::new(f.product_id, 1)],
        ))
        .await
        .unwrap();

    // Raise the catalogue price afterwards; the template must not notice.
    f.engine
        .update_product(UpdateProductCmd {
            user_id: f.user_id.clone(),
            product_id: f.product_id,
            name: "Retainer".to_string(),
            description: None,
            unit: None,
            price: Money::new(99_00),
            tax_rate_bps: 2200,
        })
        .await
        .unwrap();

    let generated = f
        .engine
        .generate_due_invoices(date(2026, 1, 1))
        .await
        .unwrap();
    assert_eq!(generated.len(), 1);
    // 50.00 + 22% = 61.00, the price at template creation.
    assert_eq!(generated[0].total, Money::new(61_00));
}

#[tokio::test]
async fn update_replaces_items_and_validates_schedule() {
    let f = fixture().await;

    let recurring_id = f
        .engine
        .new_recurring(NewRecurringCmd::new(
            &f.user_id,
            f.client_id,
            RecurringPattern::Monthly,
            date(2026, 2, 1),
            14,
            vec![LineInput::new(f.product_id, 1)],
        ))
        .await
        .unwrap();

    // next_invoice_date cannot move before the start.
    let err = f
        .engine
        .update_recurring(UpdateRecurringCmd {
            user_id: f.user_id.clone(),
            recurring_id,
            pattern: RecurringPattern::Monthly,
            end_date: None,
            due_in_days: 14,
            items: vec![LineInput::new(f.product_id, 1)],
            discount: Money::ZERO,
            note: None,
            next_invoice_date: Some(date(2026, 1, 1)),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPattern(_)));

    f.engine
        .update_recurring(UpdateRecurringCmd {
            user_id: f.user_id.clone(),
            recurring_id,
            pattern: RecurringPattern::Quarterly,
            end_date: None,
            due_in_days: 30,
            items: vec![LineInput::new(f.product_id, 3).description("Quarterly retainer")],
            discount: Money::new(10_00),
            note: Some("renegotiated".to_string()),
            next_invoice_date: None,
        })
        .await
        .unwrap();

    let template = f
        .engine
        .recurring_with_items(&f.user_id, recurring_id)
        .await
        .unwrap();
    assert_eq!(template.pattern, RecurringPattern::Quarterly);
    assert_eq!(template.due_in_days, 30);
    assert_eq!(template.discount, Money::new(10_00));
    assert_eq!(template.items.len(), 1);
    assert_eq!(template.items[0].quantity, 3);
    assert_eq!(template.items[0].description, "Quarterly retainer");
    // Untouched by the update.
    assert_eq!(template.next_invoice_date, date(2026, 2, 1));
}

#[tokio::test]
async fn deleted_templates_stop_generating() {
    let f = fixture().await;

    let recurring_id = f
        .engine
        .new_recurring(NewRecurringCmd::new(
            &f.user_id,
            f.client_id,
            RecurringPattern::Monthly,
            date(2026, 1, 1),
            14,
            vec![LineInput::new(f.product_id, 1)],
        ))
        .await
        .unwrap();

    let generated = f
        .engine
        .generate_due_invoices(date(2026, 1, 1))
        .await
        .unwrap();
    assert_eq!(generated.len(), 1);

    f.engine
        .delete_recurring(&f.user_id, recurring_id)
        .await
        .unwrap();
    let generated = f
        .engine
        .generate_due_invoices(date(2026, 6, 1))
        .await
        .unwrap();
    assert!(generated.is_empty());

    // The generated invoice keeps its provenance link.
    let invoices = f
        .engine
        .list_invoices(&f.user_id, 10, &Default::default())
        .await
        .unwrap();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].recurring_invoice_id, Some(recurring_id));
}
