//! # 학생 데이터베이스 쿼리 모듈
//!
//! `students` 테이블 CRUD와 검색, 학생의 그룹 소속 목록 조회.

use crate::error::AppError;
use crate::models::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

const STUDENT_COLUMNS: &str = "id, public_id, full_name, birth_date, phone, email, \
                               parent_name, parent_phone, notes, is_active, created_at, updated_at";

/// 학생 목록 (이름순)
///
/// - `q`: 이름, 학생 전화번호, 보호자 전화번호의 부분 일치
/// - `active`: 활성/비활성 필터
///
/// 조건이 요청마다 달라지므로 `QueryBuilder`로 조립합니다.
/// 사용자 입력은 모두 `push_bind`로만 들어갑니다.
pub async fn list_students(
    pool: &SqlitePool,
    query: &StudentListQuery,
) -> Result<Vec<Student>, AppError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
    qb.push(STUDENT_COLUMNS);
    qb.push(" FROM students WHERE 1 = 1");

    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q);
        qb.push(" AND (full_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR phone LIKE ")
            .push_bind(pattern.clone())
            .push(" OR parent_phone LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(active) = query.active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    qb.push(" ORDER BY full_name");

    let students = qb.build_query_as::<Student>().fetch_all(pool).await?;
    Ok(students)
}

pub async fn get_student(pool: &SqlitePool, id: i64) -> Result<Option<Student>, AppError> {
    let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS);
    let student = sqlx::query_as::<_, Student>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(student)
}

/// 외부 식별자(public_id)로 학생을 조회합니다.
pub async fn get_student_by_public_id(
    pool: &SqlitePool,
    public_id: &str,
) -> Result<Option<Student>, AppError> {
    let sql = format!("SELECT {} FROM students WHERE public_id = ?", STUDENT_COLUMNS);
    let student = sqlx::query_as::<_, Student>(&sql)
        .bind(public_id)
        .fetch_optional(pool)
        .await?;

    Ok(student)
}

/// 트랜잭션 안에서 학생 이름만 조회합니다. (이력 문장용)
pub async fn student_name(conn: &mut SqliteConnection, id: i64) -> Result<Option<String>, AppError> {
    let name = sqlx::query_scalar("SELECT full_name FROM students WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(name)
}

fn validate_student(full_name: &str, birth_date: Option<&str>) -> Result<(), AppError> {
    if full_name.trim().is_empty() {
        return Err(AppError::BadRequest("Ім'я студента обов'язкове".to_string()));
    }
    crate::services::schedule::parse_optional_date(birth_date)?;
    Ok(())
}

pub async fn create_student(pool: &SqlitePool, req: &CreateStudentRequest) -> Result<Student, AppError> {
    validate_student(&req.full_name, req.birth_date.as_deref())?;

    let result = sqlx::query(
        r#"
        INSERT INTO students
            (public_id, full_name, birth_date, phone, email, parent_name, parent_phone, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(super::new_public_id())
    .bind(req.full_name.trim())
    .bind(&req.birth_date)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.parent_name)
    .bind(&req.parent_phone)
    .bind(&req.notes)
    .execute(pool)
    .await?;

    get_student(pool, result.last_insert_rowid())
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created student".to_string()))
}

pub async fn update_student(
    pool: &SqlitePool,
    id: i64,
    req: &UpdateStudentRequest,
) -> Result<Option<Student>, AppError> {
    let Some(mut student) = get_student(pool, id).await? else {
        return Ok(None);
    };

    if let Some(full_name) = &req.full_name {
        student.full_name = full_name.trim().to_string();
    }
    if let Some(birth_date) = &req.birth_date {
        student.birth_date = birth_date.clone();
    }
    if let Some(phone) = &req.phone {
        student.phone = phone.clone();
    }
    if let Some(email) = &req.email {
        student.email = email.clone();
    }
    if let Some(parent_name) = &req.parent_name {
        student.parent_name = parent_name.clone();
    }
    if let Some(parent_phone) = &req.parent_phone {
        student.parent_phone = parent_phone.clone();
    }
    if let Some(notes) = &req.notes {
        student.notes = notes.clone();
    }
    if let Some(is_active) = req.is_active {
        student.is_active = is_active;
    }
    validate_student(&student.full_name, student.birth_date.as_deref())?;

    sqlx::query(
        r#"
        UPDATE students
        SET full_name = ?, birth_date = ?, phone = ?, email = ?, parent_name = ?,
            parent_phone = ?, notes = ?, is_active = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(&student.full_name)
    .bind(&student.birth_date)
    .bind(&student.phone)
    .bind(&student.email)
    .bind(&student.parent_name)
    .bind(&student.parent_phone)
    .bind(&student.notes)
    .bind(student.is_active)
    .bind(id)
    .execute(pool)
    .await?;

    get_student(pool, id).await
}

/// 학생을 삭제합니다.
///
/// 활성 소속이 남아 있으면 409입니다. 먼저 그룹에서 제외해야
/// 해당 그룹의 이력에 `student_removed`가 남습니다.
/// 과거 출석/결제 기록은 `ON DELETE CASCADE`로 함께 지워집니다.
pub async fn delete_student(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM student_groups WHERE student_id = ? AND is_active = 1",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    if active > 0 {
        return Err(AppError::Conflict(
            "Студент навчається в активних групах, спершу виключіть його з груп".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM students WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 학생의 모든 그룹 소속 (현재 + 과거), 최근 가입순
pub async fn list_student_memberships(
    pool: &SqlitePool,
    student_id: i64,
) -> Result<Vec<StudentMembership>, AppError> {
    let memberships = sqlx::query_as::<_, StudentMembership>(
        r#"
        SELECT sg.id AS membership_id, sg.group_id, g.title AS group_title,
               sg.join_date, sg.leave_date, sg.is_active
        FROM student_groups sg
        JOIN study_groups g ON g.id = sg.group_id
        WHERE sg.student_id = ?
        ORDER BY sg.is_active DESC, sg.join_date DESC, sg.id DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    Ok(memberships)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;

    fn new_student(name: &str, phone: Option<&str>, parent_phone: Option<&str>) -> CreateStudentRequest {
        CreateStudentRequest {
            full_name: name.to_string(),
            birth_date: Some("2015-03-14".to_string()),
            phone: phone.map(str::to_string),
            email: None,
            parent_name: None,
            parent_phone: parent_phone.map(str::to_string),
            notes: None,
        }
    }

    #[tokio::test]
    async fn search_matches_name_and_both_phones() {
        let pool = testing::pool().await;
        create_student(&pool, &new_student("Петренко Марія", Some("0501234567"), None))
            .await
            .unwrap();
        create_student(&pool, &new_student("Шевченко Тарас", None, Some("0679998877")))
            .await
            .unwrap();

        let by_name = StudentListQuery { q: Some("Петр".to_string()), active: None };
        assert_eq!(list_students(&pool, &by_name).await.unwrap().len(), 1);

        let by_parent_phone = StudentListQuery { q: Some("99988".to_string()), active: None };
        let found = list_students(&pool, &by_parent_phone).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].full_name, "Шевченко Тарас");

        // 와일드카드 문자도 그대로 바인딩되므로 SQL이 깨지지 않습니다.
        let odd = StudentListQuery { q: Some("' OR 1=1 --".to_string()), active: None };
        assert!(list_students(&pool, &odd).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_birth_date_is_rejected() {
        let pool = testing::pool().await;
        let mut req = new_student("Бондар Іра", None, None);
        req.birth_date = Some("14.03.2015".to_string());

        let err = create_student(&pool, &req).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn active_member_cannot_be_deleted() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let student_id = fx.add_student(&pool, "Ткаченко Оля").await;

        let err = delete_student(&pool, student_id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let memberships = list_student_memberships(&pool, student_id).await.unwrap();
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].group_id, fx.group_id);
        assert!(memberships[0].is_active);
    }

    #[tokio::test]
    async fn lookup_by_public_id() {
        let pool = testing::pool().await;
        let created = create_student(&pool, &new_student("Мельник Данило", None, None))
            .await
            .unwrap();

        let found = get_student_by_public_id(&pool, &created.public_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert!(get_student_by_public_id(&pool, "missing").await.unwrap().is_none());
    }
}
