use crate::{
    db::payments as db_payments,
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    routes::{today, AppState},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

/// `GET /api/v1/payments?student_id=&group_id=&from=&to=`
pub async fn list_payments(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<Value>, AppError> {
    let payments = db_payments::list_payments(&state.pool, &query).await?;
    Ok(Json(json!({ "payments": payments })))
}

pub async fn list_student_payments(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(student_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let query = PaymentListQuery {
        student_id: Some(student_id),
        ..Default::default()
    };
    let payments = db_payments::list_payments(&state.pool, &query).await?;
    Ok(Json(json!({ "payments": payments })))
}

pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(student_id): Path<i64>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let payment =
        db_payments::create_payment(&state.pool, student_id, &req, user.user_id, today()).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !db_payments::delete_payment(&state.pool, id).await? {
        return Err(AppError::not_found("Оплату не знайдено"));
    }
    Ok(StatusCode::NO_CONTENT)
}
