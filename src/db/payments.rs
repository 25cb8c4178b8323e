use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::AppError;
use crate::models::*;
use crate::services::schedule::{format_date, parse_date, parse_optional_date};

const PAYMENT_COLUMNS: &str = "id, public_id, student_id, group_id, amount, paid_at, period_month, \
                               method, comment, created_by, created_at";

pub async fn list_payments(pool: &SqlitePool, query: &PaymentListQuery) -> Result<Vec<Payment>, AppError> {
    let from = parse_optional_date(query.from.as_deref())?.map(format_date);
    let to = parse_optional_date(query.to.as_deref())?.map(format_date);

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
    qb.push(PAYMENT_COLUMNS);
    qb.push(" FROM payments WHERE 1 = 1");
    if let Some(student_id) = query.student_id {
        qb.push(" AND student_id = ").push_bind(student_id);
    }
    if let Some(group_id) = query.group_id {
        qb.push(" AND group_id = ").push_bind(group_id);
    }
    if let Some(from) = from {
        qb.push(" AND paid_at >= ").push_bind(from);
    }
    if let Some(to) = to {
        qb.push(" AND paid_at <= ").push_bind(to);
    }
    qb.push(" ORDER BY paid_at DESC, id DESC");

    let payments = qb.build_query_as::<Payment>().fetch_all(pool).await?;
    Ok(payments)
}

pub async fn get_payment(pool: &SqlitePool, id: i64) -> Result<Option<Payment>, AppError> {
    let sql = format!("SELECT {} FROM payments WHERE id = ?", PAYMENT_COLUMNS);
    let payment = sqlx::query_as::<_, Payment>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(payment)
}

/// Accepts "YYYY-MM" only.
fn validate_period_month(value: &str) -> Result<String, AppError> {
    let value = value.trim();
    parse_date(&format!("{}-01", value))
        .ok()
        .filter(|_| value.len() == 7)
        .map(|_| value.to_string())
        .ok_or_else(|| {
            AppError::BadRequest(format!("Некоректний місяць оплати «{}» (очікується РРРР-ММ)", value))
        })
}

pub async fn create_payment(
    pool: &SqlitePool,
    student_id: i64,
    req: &CreatePaymentRequest,
    created_by: i64,
    today: NaiveDate,
) -> Result<Payment, AppError> {
    if req.amount <= 0 {
        return Err(AppError::BadRequest("Сума оплати має бути більшою за нуль".to_string()));
    }
    let paid_at = parse_optional_date(req.paid_at.as_deref())?.unwrap_or(today);
    let period_month = match req.period_month.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => Some(validate_period_month(p)?),
        None => None,
    };

    let student: Option<i64> = sqlx::query_scalar("SELECT id FROM students WHERE id = ?")
        .bind(student_id)
        .fetch_optional(pool)
        .await?;
    if student.is_none() {
        return Err(AppError::not_found("Студента не знайдено"));
    }
    if let Some(group_id) = req.group_id {
        let group: Option<i64> = sqlx::query_scalar("SELECT id FROM study_groups WHERE id = ?")
            .bind(group_id)
            .fetch_optional(pool)
            .await?;
        if group.is_none() {
            return Err(AppError::BadRequest("Групу не знайдено".to_string()));
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO payments
            (public_id, student_id, group_id, amount, paid_at, period_month, method, comment, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(super::new_public_id())
    .bind(student_id)
    .bind(req.group_id)
    .bind(req.amount)
    .bind(format_date(paid_at))
    .bind(period_month)
    .bind(req.method.unwrap_or(PaymentMethod::Cash))
    .bind(&req.comment)
    .bind(created_by)
    .execute(pool)
    .await?;

    tracing::info!(student_id, amount = req.amount, "payment recorded");

    get_payment(pool, result.last_insert_rowid())
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created payment".to_string()))
}

pub async fn delete_payment(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM payments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
