use crate::error::AppError;
use crate::models::*;
use sqlx::{SqliteConnection, SqlitePool};

pub async fn list_teachers(pool: &SqlitePool) -> Result<Vec<Teacher>, AppError> {
    let teachers = sqlx::query_as::<_, Teacher>(
        r#"
        SELECT id, public_id, full_name, phone, email, notes, is_active, created_at, updated_at
        FROM teachers
        ORDER BY full_name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(teachers)
}

pub async fn get_teacher(pool: &SqlitePool, id: i64) -> Result<Option<Teacher>, AppError> {
    let teacher = sqlx::query_as::<_, Teacher>(
        r#"
        SELECT id, public_id, full_name, phone, email, notes, is_active, created_at, updated_at
        FROM teachers
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(teacher)
}

/// Teacher name inside an open transaction, for history descriptions.
pub async fn teacher_name(conn: &mut SqliteConnection, id: i64) -> Result<Option<String>, AppError> {
    let name = sqlx::query_scalar("SELECT full_name FROM teachers WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(name)
}

pub async fn create_teacher(pool: &SqlitePool, req: &CreateTeacherRequest) -> Result<Teacher, AppError> {
    if req.full_name.trim().is_empty() {
        return Err(AppError::BadRequest("Ім'я викладача обов'язкове".to_string()));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO teachers (public_id, full_name, phone, email, notes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(super::new_public_id())
    .bind(req.full_name.trim())
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.notes)
    .execute(pool)
    .await?;

    get_teacher(pool, result.last_insert_rowid())
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created teacher".to_string()))
}

pub async fn update_teacher(
    pool: &SqlitePool,
    id: i64,
    req: &UpdateTeacherRequest,
) -> Result<Option<Teacher>, AppError> {
    let Some(mut teacher) = get_teacher(pool, id).await? else {
        return Ok(None);
    };

    if let Some(full_name) = &req.full_name {
        if full_name.trim().is_empty() {
            return Err(AppError::BadRequest("Ім'я викладача обов'язкове".to_string()));
        }
        teacher.full_name = full_name.trim().to_string();
    }
    if let Some(phone) = &req.phone {
        teacher.phone = phone.clone();
    }
    if let Some(email) = &req.email {
        teacher.email = email.clone();
    }
    if let Some(notes) = &req.notes {
        teacher.notes = notes.clone();
    }
    if let Some(is_active) = req.is_active {
        teacher.is_active = is_active;
    }

    sqlx::query(
        r#"
        UPDATE teachers
        SET full_name = ?, phone = ?, email = ?, notes = ?, is_active = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(&teacher.full_name)
    .bind(&teacher.phone)
    .bind(&teacher.email)
    .bind(&teacher.notes)
    .bind(teacher.is_active)
    .bind(id)
    .execute(pool)
    .await?;

    get_teacher(pool, id).await
}

/// Refuses with a conflict while any group still has this teacher assigned.
pub async fn delete_teacher(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let groups: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM study_groups WHERE teacher_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if groups > 0 {
        return Err(AppError::Conflict(format!(
            "Викладач закріплений за {} групами, спершу змініть викладача",
            groups
        )));
    }

    let result = sqlx::query("DELETE FROM teachers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;

    #[tokio::test]
    async fn assigned_teacher_cannot_be_deleted() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;

        let err = delete_teacher(&pool, fx.teacher_id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(get_teacher(&pool, fx.teacher_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_clears_nullable_fields() {
        let pool = testing::pool().await;
        let teacher = create_teacher(
            &pool,
            &CreateTeacherRequest {
                full_name: "Коваль Андрій".to_string(),
                phone: Some("+380501112233".to_string()),
                email: None,
                notes: None,
            },
        )
        .await
        .unwrap();

        let patch: UpdateTeacherRequest = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        let updated = update_teacher(&pool, teacher.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.phone, None);
        assert_eq!(updated.full_name, "Коваль Андрій");

        assert!(update_teacher(&pool, 9999, &patch).await.unwrap().is_none());
    }
}
