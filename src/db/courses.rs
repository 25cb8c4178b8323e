//! # 과정 데이터베이스 쿼리 모듈
//!
//! `courses` 테이블 CRUD. 수정은 "읽기 → 병합 → 전체 컬럼 쓰기" 방식입니다.

use crate::error::AppError;
use crate::models::*;
use sqlx::SqlitePool;

const COURSE_COLUMNS: &str = "id, public_id, name, description, age_min, age_max, \
                              duration_months, price, is_active, created_at, updated_at";

/// 과정 목록 (이름순). `active`가 주어지면 해당 상태만 반환합니다.
pub async fn list_courses(pool: &SqlitePool, active: Option<bool>) -> Result<Vec<Course>, AppError> {
    let sql = format!(
        "SELECT {} FROM courses WHERE (? IS NULL OR is_active = ?) ORDER BY name",
        COURSE_COLUMNS
    );
    let courses = sqlx::query_as::<_, Course>(&sql)
        .bind(active)
        .bind(active)
        .fetch_all(pool)
        .await?;

    Ok(courses)
}

pub async fn get_course(pool: &SqlitePool, id: i64) -> Result<Option<Course>, AppError> {
    let sql = format!("SELECT {} FROM courses WHERE id = ?", COURSE_COLUMNS);
    let course = sqlx::query_as::<_, Course>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(course)
}

fn validate_ages(age_min: Option<i64>, age_max: Option<i64>) -> Result<(), AppError> {
    if let (Some(min), Some(max)) = (age_min, age_max) {
        if min > max {
            return Err(AppError::BadRequest(
                "Мінімальний вік не може бути більшим за максимальний".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Назва курсу обов'язкова".to_string()));
    }
    Ok(())
}

pub async fn create_course(pool: &SqlitePool, req: &CreateCourseRequest) -> Result<Course, AppError> {
    validate_name(&req.name)?;
    validate_ages(req.age_min, req.age_max)?;

    let result = sqlx::query(
        r#"
        INSERT INTO courses
            (public_id, name, description, age_min, age_max, duration_months, price, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(super::new_public_id())
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(req.age_min)
    .bind(req.age_max)
    .bind(req.duration_months)
    .bind(req.price)
    .bind(req.is_active.unwrap_or(true))
    .execute(pool)
    .await?;

    get_course(pool, result.last_insert_rowid())
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created course".to_string()))
}

/// 과정을 부분 수정합니다. 과정이 없으면 `Ok(None)`.
pub async fn update_course(
    pool: &SqlitePool,
    id: i64,
    req: &UpdateCourseRequest,
) -> Result<Option<Course>, AppError> {
    let Some(mut course) = get_course(pool, id).await? else {
        return Ok(None);
    };

    if let Some(name) = &req.name {
        validate_name(name)?;
        course.name = name.trim().to_string();
    }
    if let Some(description) = &req.description {
        course.description = description.clone();
    }
    if let Some(age_min) = req.age_min {
        course.age_min = age_min;
    }
    if let Some(age_max) = req.age_max {
        course.age_max = age_max;
    }
    if let Some(duration_months) = req.duration_months {
        course.duration_months = duration_months;
    }
    if let Some(price) = req.price {
        course.price = price;
    }
    if let Some(is_active) = req.is_active {
        course.is_active = is_active;
    }
    validate_ages(course.age_min, course.age_max)?;

    sqlx::query(
        r#"
        UPDATE courses
        SET name = ?, description = ?, age_min = ?, age_max = ?, duration_months = ?,
            price = ?, is_active = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(&course.name)
    .bind(&course.description)
    .bind(course.age_min)
    .bind(course.age_max)
    .bind(course.duration_months)
    .bind(course.price)
    .bind(course.is_active)
    .bind(id)
    .execute(pool)
    .await?;

    get_course(pool, id).await
}

/// 과정을 삭제합니다. 이 과정을 쓰는 그룹이 있으면 409.
///
/// # 반환값
/// - `Ok(true)`: 삭제됨
/// - `Ok(false)`: 해당 과정이 없음
pub async fn delete_course(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let groups: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM study_groups WHERE course_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if groups > 0 {
        return Err(AppError::Conflict(format!(
            "Курс використовується у {} групах, видалення неможливе",
            groups
        )));
    }

    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
