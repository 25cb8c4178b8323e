use crate::{
    db::teachers as db_teachers,
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    routes::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

pub async fn list_teachers(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let teachers = db_teachers::list_teachers(&state.pool).await?;
    Ok(Json(json!({ "teachers": teachers })))
}

pub async fn get_teacher(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Teacher>, AppError> {
    let teacher = db_teachers::get_teacher(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Викладача не знайдено"))?;
    Ok(Json(teacher))
}

pub async fn create_teacher(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<CreateTeacherRequest>,
) -> Result<(StatusCode, Json<Teacher>), AppError> {
    let teacher = db_teachers::create_teacher(&state.pool, &req).await?;
    Ok((StatusCode::CREATED, Json(teacher)))
}

pub async fn update_teacher(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTeacherRequest>,
) -> Result<Json<Teacher>, AppError> {
    let teacher = db_teachers::update_teacher(&state.pool, id, &req)
        .await?
        .ok_or(AppError::not_found("Викладача не знайдено"))?;
    Ok(Json(teacher))
}

/// 409 while the teacher still leads a group.
pub async fn delete_teacher(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !db_teachers::delete_teacher(&state.pool, id).await? {
        return Err(AppError::not_found("Викладача не знайдено"));
    }
    Ok(StatusCode::NO_CONTENT)
}
