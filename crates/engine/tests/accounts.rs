use engine::{
    Currency, Engine, EngineError, Money, NewBankAccountCmd, NewClientCmd, NewEWalletCmd,
    NewProductCmd, ProfileUpsertCmd, UpdateClientCmd,
};
use migration::MigratorTrait;
use sea_orm::Database;

async fn engine_with_user() -> (Engine, String) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();

    let user_id = engine
        .new_user("Alice Rossi", "alice@example.com", "+39055123456", "password")
        .await
        .unwrap();
    (engine, user_id)
}

#[tokio::test]
async fn new_user_enforces_unique_email_and_phone() {
    let (engine, _user_id) = engine_with_user().await;

    let err = engine
        .new_user("Bob", "ALICE@example.com", "+39055999999", "secret")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("alice@example.com".to_string()));

    let err = engine
        .new_user("Bob", "bob@example.com", "+39055123456", "secret")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("+39055123456".to_string()));
}

#[tokio::test]
async fn deactivated_users_are_locked_out() {
    let (engine, user_id) = engine_with_user().await;

    engine.delete_user(&user_id).await.unwrap();

    let err = engine.user(&user_id).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("user not exists".to_string()));
    let err = engine.list_clients(&user_id).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("user not exists".to_string()));
}

#[tokio::test]
async fn profile_upsert_creates_then_updates() {
    let (engine, user_id) = engine_with_user().await;

    engine
        .upsert_profile(ProfileUpsertCmd {
            user_id: user_id.clone(),
            company_name: "Rossi Consulting".to_string(),
            address: Some("Via Roma 1, Firenze".to_string()),
            tax_number: None,
            currency: None,
        })
        .await
        .unwrap();

    let profile = engine.profile(&user_id).await.unwrap();
    assert_eq!(profile.company_name, "Rossi Consulting");
    assert_eq!(profile.currency, Currency::Eur);

    engine
        .upsert_profile(ProfileUpsertCmd {
            user_id: user_id.clone(),
            company_name: "Rossi Consulting SRL".to_string(),
            address: None,
            tax_number: Some("IT01234567890".to_string()),
            currency: Some(Currency::Usd),
        })
        .await
        .unwrap();

    let profile = engine.profile(&user_id).await.unwrap();
    assert_eq!(profile.company_name, "Rossi Consulting SRL");
    assert_eq!(profile.tax_number, Some("IT01234567890".to_string()));
    assert_eq!(profile.address, None);
    assert_eq!(profile.currency, Currency::Usd);
}

#[tokio::test]
async fn first_instrument_of_each_type_becomes_primary() {
    let (engine, user_id) = engine_with_user().await;
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

    let first = engine
        .new_bank_account(NewBankAccountCmd {
            user_id: user_id.clone(),
            bank_name: "Banca Etica".to_string(),
            account_name: "Alice Rossi".to_string(),
            account_number: "IT60X0542811101000000123456".to_string(),
        })
        .await
        .unwrap();
    let second = engine
        .new_bank_account(NewBankAccountCmd {
            user_id: user_id.clone(),
            bank_name: "Intesa".to_string(),
            account_name: "Alice Rossi".to_string(),
            account_number: "IT60X0542811101000000654321".to_string(),
        })
        .await
        .unwrap();
    let wallet = engine
        .new_e_wallet(NewEWalletCmd {
            user_id: user_id.clone(),
            provider: "PayPal".to_string(),
            account_name: "Alice Rossi".to_string(),
            phone_number: "+39055123456".to_string(),
        })
        .await
        .unwrap();

    let (accounts, wallets) = engine.list_instruments(&user_id).await.unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(wallets.len(), 1);
    assert!(accounts.iter().find(|a| a.id == first).unwrap().is_primary);
    assert!(!accounts.iter().find(|a| a.id == second).unwrap().is_primary);
    assert!(wallets.iter().find(|w| w.id == wallet).unwrap().is_primary);
}

#[tokio::test]
async fn set_primary_demotes_the_previous_primary() {
    let (engine, user_id) = engine_with_user().await;
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

    let first = engine
        .new_bank_account(NewBankAccountCmd {
            user_id: user_id.clone(),
            bank_name: "Banca Etica".to_string(),
            account_name: "Alice Rossi".to_string(),
            account_number: "IT60X0542811101000000123456".to_string(),
        })
        .await
        .unwrap();
    let second = engine
        .new_bank_account(NewBankAccountCmd {
            user_id: user_id.clone(),
            bank_name: "Intesa".to_string(),
            account_name: "Alice Rossi".to_string(),
            account_number: "IT60X0542811101000000654321".to_string(),
        })
        .await
        .unwrap();

    engine
        .set_primary_bank_account(&user_id, second)
        .await
        .unwrap();

    let (accounts, _) = engine.list_instruments(&user_id).await.unwrap();
    assert!(!accounts.iter().find(|a| a.id == first).unwrap().is_primary);
    assert!(accounts.iter().find(|a| a.id == second).unwrap().is_primary);

    // Exactly one primary, always.
    assert_eq!(accounts.iter().filter(|a| a.is_primary).count(), 1);
}

#[tokio::test]
async fn archiving_clears_primary_and_hides_from_payments() {
    let (engine, user_id) = engine_with_user().await;
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

    let account = engine
        .new_bank_account(NewBankAccountCmd {
            user_id: user_id.clone(),
            bank_name: "Banca Etica".to_string(),
            account_name: "Alice Rossi".to_string(),
            account_number: "IT60X0542811101000000123456".to_string(),
        })
        .await
        .unwrap();

    engine.archive_bank_account(&user_id, account).await.unwrap();

    let (accounts, _) = engine.list_instruments(&user_id).await.unwrap();
    let archived = accounts.iter().find(|a| a.id == account).unwrap();
    assert!(archived.archived);
    assert!(!archived.is_primary);

    // Archived instruments cannot be promoted again.
    let err = engine
        .set_primary_bank_account(&user_id, account)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("bank account not exists".to_string())
    );
}

#[tokio::test]
async fn clients_crud_and_unique_names() {
    let (engine, user_id) = engine_with_user().await;

    let client_id = engine
        .new_client(
            NewClientCmd::new(&user_id, "Acme Corp")
                .email("billing@acme.test")
                .note("pays late"),
        )
        .await
        .unwrap();

    let err = engine
        .new_client(NewClientCmd::new(&user_id, "  acme corp "))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("acme corp".to_string()));

    engine
        .update_client(UpdateClientCmd {
            user_id: user_id.clone(),
            client_id,
            name: "Acme Corporation".to_string(),
            email: Some("accounts@acme.test".to_string()),
            phone: None,
            address: None,
            note: None,
        })
        .await
        .unwrap();

    let client = engine.client(&user_id, client_id).await.unwrap();
    assert_eq!(client.name, "Acme Corporation");
    assert_eq!(client.email, Some("accounts@acme.test".to_string()));
    assert_eq!(client.note, None);

    engine.delete_client(&user_id, client_id).await.unwrap();
    let clients = engine.list_clients(&user_id).await.unwrap();
    assert!(clients.is_empty());

    // Soft-deleted clients are gone from lookups too.
    let err = engine.client(&user_id, client_id).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("client not exists".to_string()));
}

#[tokio::test]
async fn products_validate_pricing() {
    let (engine, user_id) = engine_with_user().await;

    let err = engine
        .new_product(NewProductCmd::new(
            &user_id,
            "Consulting",
            Money::new(-1),
            0,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .new_product(NewProductCmd::new(
            &user_id,
            "Consulting",
            Money::new(100_00),
            10_001,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let product_id = engine
        .new_product(
            NewProductCmd::new(&user_id, "Consulting", Money::new(100_00), 2200).unit("hour"),
        )
        .await
        .unwrap();

    let product = engine.product(&user_id, product_id).await.unwrap();
    assert_eq!(product.price, Money::new(100_00));
    assert_eq!(product.tax_rate_bps, 2200);
    assert_eq!(product.unit, Some("hour".to_string()));
}
