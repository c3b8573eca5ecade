use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{clients, invoices, payments, products, profile, recurring, statistics, user};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

/// Basic-auth middleware: email + password against the users table.
///
/// Soft-deleted users are locked out. The matched row is attached as an
/// `Extension<user::Model>` for the handlers.
async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let email = auth_header.username().trim().to_lowercase();
    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .filter(user::Column::Password.eq(auth_header.password()))
        .filter(user::Column::DeletedAt.is_null())
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/clients", post(clients::create).get(clients::list))
        .route(
            "/clients/{id}",
            get(clients::get_one)
                .put(clients::update)
                .delete(clients::remove),
        )
        .route("/products", post(products::create).get(products::list))
        .route(
            "/products/{id}",
            get(products::get_one)
                .put(products::update)
                .delete(products::remove),
        )
        .route("/profile", put(profile::upsert).get(profile::get_profile))
        .route("/profile/instruments", get(profile::list_instruments))
        .route("/profile/bankAccounts", post(profile::bank_account_new))
        .route(
            "/profile/bankAccounts/{id}/primary",
            post(profile::bank_account_set_primary),
        )
        .route(
            "/profile/bankAccounts/{id}/archive",
            post(profile::bank_account_archive),
        )
        .route("/profile/eWallets", post(profile::e_wallet_new))
        .route(
            "/profile/eWallets/{id}/primary",
            post(profile::e_wallet_set_primary),
        )
        .route(
            "/profile/eWallets/{id}/archive",
            post(profile::e_wallet_archive),
        )
        .route("/invoices", post(invoices::create).get(invoices::list))
        .route("/invoices/sweepOverdue", post(invoices::sweep_overdue))
        .route(
            "/invoices/{id}",
            get(invoices::get_detail)
                .put(invoices::update)
                .delete(invoices::remove),
        )
        .route("/invoices/{id}/issue", post(invoices::issue))
        .route("/invoices/{id}/cancel", post(invoices::cancel))
        .route(
            "/invoices/{id}/payments",
            post(payments::record).get(payments::list),
        )
        .route("/payments/{id}/void", post(payments::void_payment))
        .route("/recurring", post(recurring::create).get(recurring::list))
        .route("/recurring/generate", post(recurring::generate))
        .route(
            "/recurring/{id}",
            get(recurring::get_detail)
                .put(recurring::update)
                .delete(recurring::remove),
        )
        .route("/recurring/{id}/active", post(recurring::set_active))
        .route("/stats", get(statistics::get_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder().database(db.clone()).build().await.unwrap();
        engine
            .new_user("Alice Rossi", "alice@example.com", "+39055123456", "password")
            .await
            .unwrap();

        router(ServerState {
            engine: Arc::new(engine),
            db,
        })
    }

    fn basic_auth(email: &str, password: &str) -> String {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{email}:{password}"));
        format!("Basic {encoded}")
    }

    #[tokio::test]
    async fn requests_without_credentials_are_unauthorized() {
        let app = test_router().await;

        let res = app
            .oneshot(Request::get("/clients").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = test_router().await;

        let res = app
            .oneshot(
                Request::get("/clients")
                    .header(
                        header::AUTHORIZATION,
                        basic_auth("alice@example.com", "wrong"),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn client_roundtrip_over_http() {
        let app = test_router().await;
        let auth = basic_auth("alice@example.com", "password");

        let res = app
            .clone()
            .oneshot(
                Request::post("/clients")
                    .header(header::AUTHORIZATION, auth.clone())
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "name": "Acme Corp",
                            "email": "billing@acme.test",
                            "phone": null,
                            "address": null,
                            "note": null,
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = app
            .oneshot(
                Request::get("/clients")
                    .header(header::AUTHORIZATION, auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = res.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["clients"][0]["name"], "Acme Corp");
    }

    #[tokio::test]
    async fn missing_profile_maps_to_not_found() {
        let app = test_router().await;

        let res = app
            .oneshot(
                Request::get("/stats")
                    .header(
                        header::AUTHORIZATION,
                        basic_auth("alice@example.com", "password"),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
