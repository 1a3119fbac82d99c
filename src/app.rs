use axum::{
    Form, Router,
    extract::{DefaultBodyLimit, Query, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use handlebars::Handlebars;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

use crate::calculator::{
    CalculationRequest, CalculationResult, OperationTag, UserReference, evaluate, format_number,
};
use crate::config::Config;
use crate::downloader;
use crate::history::{FileHistoryStore, HistoryStore, paginate};
use crate::login::{self, UserDatabase, current_user};
use crate::profile::{self, MAX_UPLOAD_BYTES};
use crate::subscribe::{self, SubscriberList};
use crate::templates::{self, Notice, render};

pub struct AppState {
    pub config: Config,
    pub users: UserDatabase,
    pub history: Arc<dyn HistoryStore>,
    pub subscribers: SubscriberList,
    pub templates: Handlebars<'static>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// State backed by files under `config.database_dir`.
    pub fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let history = Arc::new(FileHistoryStore::new(config.database_dir.clone()));
        Self::with_history(config, history)
    }

    pub fn with_history(
        config: Config,
        history: Arc<dyn HistoryStore>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(AppState {
            users: UserDatabase::open(config.database_dir.clone())?,
            subscribers: SubscriberList::new(config.database_dir.clone()),
            templates: templates::registry()?,
            history,
            config,
        })
    }
}

#[derive(Serialize)]
struct OperationOption {
    name: &'static str,
    label: &'static str,
    symbol: &'static str,
    selected: bool,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    // Kept as text so a bad value falls back to page 1 instead of a 400
    page: Option<String>,
}

#[derive(Clone, Serialize)]
struct HistoryRow {
    created_at: String,
    expression: String,
    result: String,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(serve_calculator).post(handle_calculate))
        .route("/history", get(show_history))
        .route("/history/export.csv", get(export_history_csv))
        .route("/history/export.xlsx", get(export_history_xlsx))
        .route(
            "/login",
            get(login::serve_login_page).post(login::handle_login),
        )
        .route(
            "/signup",
            get(login::serve_signup_page).post(login::handle_signup),
        )
        .route("/logout", get(login::handle_logout))
        .route(
            "/forgot-password",
            get(login::serve_forgot_password_page).post(login::handle_forgot_password),
        )
        .route(
            "/reset-password",
            get(login::serve_reset_password_page).post(login::handle_reset_password),
        )
        .route(
            "/change-password",
            get(login::serve_change_password_page).post(login::handle_change_password),
        )
        .route(
            "/profile",
            get(profile::serve_profile).post(profile::handle_profile_upload),
        )
        .route("/media/:username/avatar.png", get(profile::serve_avatar))
        .route("/subscribe", post(subscribe::handle_subscribe))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config)?);

    let app = router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

fn operation_options(selected: Option<&str>) -> Vec<OperationOption> {
    OperationTag::ALL
        .iter()
        .map(|op| OperationOption {
            name: op.name(),
            label: op.label(),
            symbol: op.symbol(),
            selected: selected == Some(op.name()),
        })
        .collect()
}

fn calculator_page(
    state: &AppState,
    user: Option<&UserReference>,
    result: Option<&CalculationResult>,
    notice: Notice,
) -> Response {
    let selected = match result {
        Some(CalculationResult::Failure {
            echoed_operation, ..
        }) => Some(echoed_operation.as_str()),
        _ => None,
    };

    render(
        &state.templates,
        "calculator",
        &json!({
            "user": user.map(|u| u.username()),
            "notice": notice,
            "succeeded": result.is_some_and(|r| r.is_success()),
            "outcome": result.map(|r| r.view()),
            "operations": operation_options(selected),
        }),
    )
}

async fn serve_calculator(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(notice): Query<Notice>,
) -> Response {
    let user = current_user(&jar);
    calculator_page(&state, user.as_ref(), None, notice)
}

/// Evaluates the form; signed-in users get the result saved to history.
async fn handle_calculate(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(request): Form<CalculationRequest>,
) -> Response {
    let user = current_user(&jar);
    let result = evaluate(&request, user.as_ref(), state.history.as_ref());
    calculator_page(&state, user.as_ref(), Some(&result), Notice::default())
}

async fn show_history(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let Some(user) = current_user(&jar) else {
        return Redirect::to("/login?error=Please+log+in+to+see+your+history").into_response();
    };

    let records = match state.history.list(user.username()) {
        Ok(records) => records,
        Err(e) => {
            warn!("failed to load history for {}: {}", user.username(), e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load history").into_response();
        }
    };

    let rows: Vec<HistoryRow> = records
        .iter()
        .map(|record| HistoryRow {
            created_at: record.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            expression: record.expression(),
            result: format_number(record.result),
        })
        .collect();

    let page_number = query
        .page
        .as_deref()
        .and_then(|p| p.trim().parse::<usize>().ok())
        .unwrap_or(1);
    let page = paginate(&rows, page_number, state.config.history_page_size);

    render(
        &state.templates,
        "history",
        &json!({ "user": user.username(), "page": page }),
    )
}

async fn export_history_csv(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let Some(user) = current_user(&jar) else {
        return Redirect::to("/login").into_response();
    };

    match state.history.list(user.username()) {
        Ok(records) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"history.csv\"",
                ),
            ],
            downloader::to_csv(&records),
        )
            .into_response(),
        Err(e) => {
            warn!("failed to export history for {}: {}", user.username(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to export history").into_response()
        }
    }
}

async fn export_history_xlsx(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let Some(user) = current_user(&jar) else {
        return Redirect::to("/login").into_response();
    };

    let exported = state
        .history
        .list(user.username())
        .map_err(|e| e.to_string())
        .and_then(|records| downloader::to_xlsx(&records).map_err(|e| e.to_string()));

    match exported {
        Ok(bytes) => (
            [
                (
                    header::CONTENT_TYPE,
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                ),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"history.xlsx\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            warn!("failed to export history for {}: {}", user.username(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to export history").into_response()
        }
    }
}
