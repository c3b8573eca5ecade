//! Statistics API endpoints

use api_types::stats::Statistic;
use axum::{Extension, Json, extract::State};

use crate::{ServerError, server::ServerState, user};

fn map_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Eur => api_types::Currency::Eur,
        engine::Currency::Usd => api_types::Currency::Usd,
        engine::Currency::Idr => api_types::Currency::Idr,
    }
}

/// Handle requests for user dashboard statistics
pub async fn get_stats(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Statistic>, ServerError> {
    let stats = state.engine.user_statistics(&user.id).await?;

    Ok(Json(Statistic {
        currency: map_currency(stats.currency),
        draft_count: stats.draft_count,
        draft_total_minor: stats.draft_total.minor(),
        open_count: stats.open_count,
        open_total_minor: stats.open_total.minor(),
        overdue_count: stats.overdue_count,
        overdue_total_minor: stats.overdue_total.minor(),
        paid_count: stats.paid_count,
        paid_total_minor: stats.paid_total.minor(),
        total_received_minor: stats.total_received.minor(),
        outstanding_minor: stats.outstanding.minor(),
    }))
}
