//! # 출석 데이터베이스 쿼리 모듈
//!
//! 수업 × 학생마다 출석 기록이 최대 하나 있습니다. (`UNIQUE (lesson_id, student_id)`)
//! 처음 기록할 때 INSERT, 그 후로는 같은 행을 UPDATE합니다(upsert).
//!
//! ## 트랜잭션 경계
//! - `set_attendance_for_all`, `copy_attendance_from_previous_lesson`:
//!   여러 행을 쓰므로 하나의 트랜잭션입니다. 중간에 실패하면 아무것도 남지 않습니다.
//! - `set_attendance`: 단일 upsert. 호출하는 쪽의 연결(또는 트랜잭션)에서 실행됩니다.
//! - `clear_attendance_for_lesson`: 단일 DELETE. 되돌릴 수 없고 이력도 남기지 않습니다.
//!
//! ## 통계
//! 취소(`canceled`)된 수업의 기록은 통계에서 제외합니다.
//! 출석률 = round(present / total × 100), total이 0이면 0.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::error::AppError;
use crate::models::*;
use crate::services::schedule::{format_date, parse_optional_date};

/// 출석 한 건을 기록(upsert)하고 행 id를 반환합니다.
///
/// 같은 (수업, 학생) 쌍에 다시 호출하면 상태·코멘트·보강 수업·수정자를 덮어씁니다.
/// `makeup_lesson_id`가 같은 그룹의 수업인지는 검사하지 않습니다.
pub async fn set_attendance(
    conn: &mut SqliteConnection,
    lesson_id: i64,
    student_id: i64,
    status: AttendanceStatus,
    updated_by: i64,
    comment: Option<&str>,
    makeup_lesson_id: Option<i64>,
) -> Result<i64, AppError> {
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO attendance (lesson_id, student_id, status, comment, makeup_lesson_id, updated_by)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (lesson_id, student_id) DO UPDATE SET
            status = excluded.status,
            comment = excluded.comment,
            makeup_lesson_id = excluded.makeup_lesson_id,
            updated_by = excluded.updated_by,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        RETURNING id
        "#,
    )
    .bind(lesson_id)
    .bind(student_id)
    .bind(status)
    .bind(comment)
    .bind(makeup_lesson_id)
    .bind(updated_by)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

pub async fn get_attendance(pool: &SqlitePool, id: i64) -> Result<Option<Attendance>, AppError> {
    let row = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT id, lesson_id, student_id, status, comment, makeup_lesson_id, updated_by,
               created_at, updated_at
        FROM attendance
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

async fn lesson_group(conn: &mut SqliteConnection, lesson_id: i64) -> Result<Option<i64>, AppError> {
    let group_id = sqlx::query_scalar("SELECT group_id FROM lessons WHERE id = ?")
        .bind(lesson_id)
        .fetch_optional(conn)
        .await?;

    Ok(group_id)
}

/// HTTP에서 들어온 출석 한 건 기록
///
/// 수업/학생이 없으면 404, 보강 수업 id가 없는 수업이면 400.
pub async fn record_attendance(
    pool: &SqlitePool,
    lesson_id: i64,
    req: &SetAttendanceRequest,
    updated_by: i64,
) -> Result<Attendance, AppError> {
    let mut conn = pool.acquire().await?;

    let group_id = lesson_group(&mut conn, lesson_id)
        .await?
        .ok_or_else(|| AppError::not_found("Заняття не знайдено"))?;

    let student: Option<i64> = sqlx::query_scalar("SELECT id FROM students WHERE id = ?")
        .bind(req.student_id)
        .fetch_optional(&mut *conn)
        .await?;
    if student.is_none() {
        return Err(AppError::not_found("Студента не знайдено"));
    }

    if let Some(makeup_id) = req.makeup_lesson_id {
        let makeup_group = lesson_group(&mut conn, makeup_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("Заняття для відпрацювання не знайдено".to_string()))?;
        if makeup_group != group_id {
            tracing::debug!(
                lesson_id,
                makeup_lesson_id = makeup_id,
                "makeup lesson belongs to another group"
            );
        }
    }

    let comment = req.comment.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let id = set_attendance(
        &mut conn,
        lesson_id,
        req.student_id,
        req.status,
        updated_by,
        comment,
        req.makeup_lesson_id,
    )
    .await?;
    drop(conn);

    get_attendance(pool, id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve attendance".to_string()))
}

/// 수업 그룹의 모든 활성 학생에게 같은 상태를 기록합니다.
///
/// 이름순으로 하나씩 upsert하며, 전체가 하나의 트랜잭션입니다.
/// 반환값은 기록한 행 수입니다.
pub async fn set_attendance_for_all(
    pool: &SqlitePool,
    lesson_id: i64,
    status: AttendanceStatus,
    updated_by: i64,
) -> Result<u32, AppError> {
    let mut tx = pool.begin().await?;

    let group_id = lesson_group(&mut tx, lesson_id)
        .await?
        .ok_or_else(|| AppError::not_found("Заняття не знайдено"))?;

    let students: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT s.id
        FROM student_groups sg
        JOIN students s ON s.id = sg.student_id
        WHERE sg.group_id = ? AND sg.is_active = 1
        ORDER BY s.full_name, s.id
        "#,
    )
    .bind(group_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut written = 0u32;
    for student_id in students {
        set_attendance(&mut tx, lesson_id, student_id, status, updated_by, None, None).await?;
        written += 1;
    }

    tx.commit().await?;

    tracing::info!(lesson_id, written, status = ?status, "attendance set for all students");
    Ok(written)
}

/// 같은 그룹의 직전 수업(취소 제외) 출석을 이 수업으로 복사합니다.
///
/// 직전 수업이 없거나 기록이 없으면 `{copied: 0}`이고 아무것도 쓰지 않습니다.
/// 상태와 코멘트만 복사하며 보강 수업 참조는 복사하지 않습니다.
pub async fn copy_attendance_from_previous_lesson(
    pool: &SqlitePool,
    lesson_id: i64,
    updated_by: i64,
) -> Result<CopyAttendanceResult, AppError> {
    let mut tx = pool.begin().await?;

    let target: Option<(i64, String)> =
        sqlx::query_as("SELECT group_id, lesson_date FROM lessons WHERE id = ?")
            .bind(lesson_id)
            .fetch_optional(&mut *tx)
            .await?;
    let (group_id, lesson_date) =
        target.ok_or_else(|| AppError::not_found("Заняття не знайдено"))?;

    let previous: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id
        FROM lessons
        WHERE group_id = ? AND lesson_date < ? AND status != 'canceled'
        ORDER BY lesson_date DESC
        LIMIT 1
        "#,
    )
    .bind(group_id)
    .bind(&lesson_date)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(previous_id) = previous else {
        return Ok(CopyAttendanceResult { copied: 0 });
    };

    let rows: Vec<(i64, AttendanceStatus, Option<String>)> = sqlx::query_as(
        "SELECT student_id, status, comment FROM attendance WHERE lesson_id = ? ORDER BY id",
    )
    .bind(previous_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut copied = 0u32;
    for (student_id, status, comment) in rows {
        set_attendance(
            &mut tx,
            lesson_id,
            student_id,
            status,
            updated_by,
            comment.as_deref(),
            None,
        )
        .await?;
        copied += 1;
    }

    tx.commit().await?;

    tracing::info!(lesson_id, previous_id, copied, "attendance copied from previous lesson");
    Ok(CopyAttendanceResult { copied })
}

/// 수업의 모든 출석 기록을 삭제하고 삭제된 행 수를 반환합니다.
pub async fn clear_attendance_for_lesson(pool: &SqlitePool, lesson_id: i64) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM attendance WHERE lesson_id = ?")
        .bind(lesson_id)
        .execute(pool)
        .await?;

    tracing::info!(lesson_id, removed = result.rows_affected(), "attendance cleared");
    Ok(result.rows_affected())
}

/// 수업 출석부: 그룹의 활성 학생 + 이미 기록이 있는 학생, 이름순
///
/// 기록이 없는 학생은 `status`가 None입니다.
pub async fn get_attendance_for_lesson_with_students(
    pool: &SqlitePool,
    lesson_id: i64,
) -> Result<Vec<LessonAttendanceRow>, AppError> {
    let rows = sqlx::query_as::<_, LessonAttendanceRow>(
        r#"
        SELECT s.id AS student_id, s.full_name,
               a.id AS attendance_id, a.status, a.comment, a.makeup_lesson_id
        FROM students s
        LEFT JOIN attendance a ON a.student_id = s.id AND a.lesson_id = ?
        WHERE s.id IN (
                SELECT sg.student_id
                FROM student_groups sg
                JOIN lessons l ON l.group_id = sg.group_id
                WHERE l.id = ? AND sg.is_active = 1
              )
           OR a.id IS NOT NULL
        ORDER BY s.full_name, s.id
        "#,
    )
    .bind(lesson_id)
    .bind(lesson_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// 상태별 집계 SELECT 절 (`a`는 attendance 별칭)
const COUNT_COLUMNS: &str = r#"
    COUNT(a.id) AS total,
    COALESCE(SUM(CASE WHEN a.status = 'present' THEN 1 ELSE 0 END), 0) AS present,
    COALESCE(SUM(CASE WHEN a.status = 'absent' THEN 1 ELSE 0 END), 0) AS absent,
    COALESCE(SUM(CASE WHEN a.status = 'makeup_planned' THEN 1 ELSE 0 END), 0) AS makeup_planned,
    COALESCE(SUM(CASE WHEN a.status = 'makeup_done' THEN 1 ELSE 0 END), 0) AS makeup_done
"#;

/// `l`(lessons 별칭)에 날짜 범위와 "취소 제외" 조건을 붙입니다.
fn push_lesson_filters(qb: &mut QueryBuilder<'_, Sqlite>, from: Option<String>, to: Option<String>) {
    qb.push(" AND l.status != 'canceled'");
    if let Some(from) = from {
        qb.push(" AND l.lesson_date >= ").push_bind(from);
    }
    if let Some(to) = to {
        qb.push(" AND l.lesson_date <= ").push_bind(to);
    }
}

fn date_bounds(from: Option<&str>, to: Option<&str>) -> Result<(Option<String>, Option<String>), AppError> {
    Ok((
        parse_optional_date(from)?.map(format_date),
        parse_optional_date(to)?.map(format_date),
    ))
}

/// 학생 한 명의 출석 통계 (그룹/기간 필터 선택)
pub async fn get_student_attendance_stats(
    pool: &SqlitePool,
    student_id: i64,
    query: &StudentStatsQuery,
) -> Result<AttendanceStats, AppError> {
    let (from, to) = date_bounds(query.from.as_deref(), query.to.as_deref())?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
    qb.push(COUNT_COLUMNS);
    qb.push(" FROM attendance a JOIN lessons l ON l.id = a.lesson_id WHERE a.student_id = ")
        .push_bind(student_id);
    if let Some(group_id) = query.group_id {
        qb.push(" AND l.group_id = ").push_bind(group_id);
    }
    push_lesson_filters(&mut qb, from, to);

    let counts = qb.build_query_as::<AttendanceCounts>().fetch_one(pool).await?;
    Ok(counts.into())
}

#[derive(sqlx::FromRow)]
struct StudentCountsRow {
    student_id: i64,
    full_name: String,
    #[sqlx(flatten)]
    counts: AttendanceCounts,
}

/// 그룹 출석 통계: 전체 집계 + 학생별 집계 + 수업 수
///
/// 학생별 목록에는 현재 활성 학생(기록이 없어도 0으로)과 기간 내 기록이 있는 학생이 포함됩니다.
pub async fn get_group_attendance_stats(
    pool: &SqlitePool,
    group_id: i64,
    range: &DateRangeQuery,
) -> Result<GroupAttendanceStats, AppError> {
    let (from, to) = date_bounds(range.from.as_deref(), range.to.as_deref())?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT COUNT(*) AS lessons_total, \
         COALESCE(SUM(CASE WHEN l.status = 'done' THEN 1 ELSE 0 END), 0) AS lessons_done \
         FROM lessons l WHERE l.group_id = ",
    );
    qb.push_bind(group_id);
    push_lesson_filters(&mut qb, from.clone(), to.clone());
    let (lessons_total, lessons_done): (i64, i64) =
        qb.build_query_as().fetch_one(pool).await?;

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT s.id AS student_id, s.full_name, ");
    qb.push(COUNT_COLUMNS);
    qb.push(
        " FROM students s \
          LEFT JOIN attendance a ON a.student_id = s.id AND a.lesson_id IN \
          (SELECT l.id FROM lessons l WHERE l.group_id = ",
    )
    .push_bind(group_id);
    push_lesson_filters(&mut qb, from, to);
    qb.push(
        ") WHERE s.id IN (SELECT student_id FROM student_groups WHERE is_active = 1 AND group_id = ",
    )
    .push_bind(group_id);
    qb.push(") OR a.id IS NOT NULL GROUP BY s.id, s.full_name ORDER BY s.full_name, s.id");

    let rows = qb.build_query_as::<StudentCountsRow>().fetch_all(pool).await?;

    let mut totals = AttendanceCounts::default();
    let students = rows
        .into_iter()
        .map(|row| {
            totals.total += row.counts.total;
            totals.present += row.counts.present;
            totals.absent += row.counts.absent;
            totals.makeup_planned += row.counts.makeup_planned;
            totals.makeup_done += row.counts.makeup_done;
            StudentAttendanceSummary {
                student_id: row.student_id,
                full_name: row.full_name,
                stats: row.counts.into(),
            }
        })
        .collect();

    Ok(GroupAttendanceStats {
        group_id,
        lessons_total,
        lessons_done,
        stats: totals.into(),
        students,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{history, testing};
    use crate::services::history_format;

    async fn count_rows(pool: &SqlitePool, lesson_id: i64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE lesson_id = ?")
            .bind(lesson_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn mark(student_id: i64, status: AttendanceStatus) -> SetAttendanceRequest {
        SetAttendanceRequest {
            student_id,
            status,
            comment: None,
            makeup_lesson_id: None,
        }
    }

    #[tokio::test]
    async fn upsert_keeps_one_row_with_last_status() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let student = fx.add_student(&pool, "Петренко Марія").await;
        let lesson = fx.add_lesson(&pool, "2026-10-20", "scheduled").await;
        let user = fx.actor.user_id;

        let first = record_attendance(&pool, lesson, &mark(student, AttendanceStatus::Absent), user)
            .await
            .unwrap();
        let second = record_attendance(&pool, lesson, &mark(student, AttendanceStatus::Present), user)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, AttendanceStatus::Present);
        assert_eq!(count_rows(&pool, lesson).await, 1);
    }

    #[tokio::test]
    async fn missing_lesson_student_or_makeup_is_rejected() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let student = fx.add_student(&pool, "Петренко Марія").await;
        let lesson = fx.add_lesson(&pool, "2026-10-20", "scheduled").await;
        let user = fx.actor.user_id;

        let err = record_attendance(&pool, 9999, &mark(student, AttendanceStatus::Present), user)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = record_attendance(&pool, lesson, &mark(9999, AttendanceStatus::Present), user)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let mut req = mark(student, AttendanceStatus::MakeupPlanned);
        req.makeup_lesson_id = Some(9999);
        let err = record_attendance(&pool, lesson, &req, user).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(count_rows(&pool, lesson).await, 0);
    }

    #[tokio::test]
    async fn makeup_reference_is_nulled_when_lesson_deleted() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let student = fx.add_student(&pool, "Петренко Марія").await;
        let lesson = fx.add_lesson(&pool, "2026-10-20", "done").await;
        let makeup = fx.add_lesson(&pool, "2026-10-23", "scheduled").await;

        let mut req = mark(student, AttendanceStatus::MakeupPlanned);
        req.makeup_lesson_id = Some(makeup);
        let row = record_attendance(&pool, lesson, &req, fx.actor.user_id).await.unwrap();
        assert_eq!(row.makeup_lesson_id, Some(makeup));

        crate::db::lessons::delete_lesson(&pool, makeup).await.unwrap();
        let row = get_attendance(&pool, row.id).await.unwrap().unwrap();
        assert_eq!(row.makeup_lesson_id, None);
    }

    #[tokio::test]
    async fn bulk_set_covers_active_members_only() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        for name in ["Бойко Софія", "Андрієнко Іван", "Гнатюк Марко"] {
            fx.add_student(&pool, name).await;
        }
        let left = fx.add_student(&pool, "Дячук Олег").await;
        sqlx::query("UPDATE student_groups SET is_active = 0, leave_date = '2026-10-01' WHERE student_id = ?")
            .bind(left)
            .execute(&pool)
            .await
            .unwrap();
        let lesson = fx.add_lesson(&pool, "2026-10-20", "scheduled").await;

        let written = set_attendance_for_all(&pool, lesson, AttendanceStatus::Present, fx.actor.user_id)
            .await
            .unwrap();
        assert_eq!(written, 3);

        let sheet = get_attendance_for_lesson_with_students(&pool, lesson).await.unwrap();
        let names: Vec<&str> = sheet.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["Андрієнко Іван", "Бойко Софія", "Гнатюк Марко"]);
        assert!(sheet.iter().all(|r| r.status == Some(AttendanceStatus::Present)));
    }

    #[tokio::test]
    async fn bulk_set_is_all_or_nothing() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let mut ids = Vec::new();
        for name in ["Андрієнко Іван", "Бойко Софія", "Гнатюк Марко", "Дячук Олег", "Жук Аня"] {
            ids.push(fx.add_student(&pool, name).await);
        }
        let lesson = fx.add_lesson(&pool, "2026-10-20", "scheduled").await;

        // 세 번째 학생(이름순)의 INSERT에서 저장소 오류를 일으킵니다.
        sqlx::query(&format!(
            "CREATE TRIGGER fail_third BEFORE INSERT ON attendance WHEN NEW.student_id = {} \
             BEGIN SELECT RAISE(ABORT, 'simulated failure'); END",
            ids[2]
        ))
        .execute(&pool)
        .await
        .unwrap();

        let result =
            set_attendance_for_all(&pool, lesson, AttendanceStatus::Present, fx.actor.user_id).await;
        assert!(result.is_err());
        assert_eq!(count_rows(&pool, lesson).await, 0);
    }

    #[tokio::test]
    async fn copy_from_first_lesson_is_a_no_op() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        fx.add_student(&pool, "Петренко Марія").await;
        let lesson = fx.add_lesson(&pool, "2026-10-20", "scheduled").await;

        let result = copy_attendance_from_previous_lesson(&pool, lesson, fx.actor.user_id)
            .await
            .unwrap();
        assert_eq!(result.copied, 0);
        assert_eq!(count_rows(&pool, lesson).await, 0);
    }

    #[tokio::test]
    async fn copy_skips_canceled_lessons() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let maria = fx.add_student(&pool, "Петренко Марія").await;
        let ivan = fx.add_student(&pool, "Андрієнко Іван").await;
        let user = fx.actor.user_id;

        let first = fx.add_lesson(&pool, "2026-10-13", "done").await;
        let canceled = fx.add_lesson(&pool, "2026-10-20", "canceled").await;
        let target = fx.add_lesson(&pool, "2026-10-27", "scheduled").await;

        let mut req = mark(maria, AttendanceStatus::Absent);
        req.comment = Some("хворіє".to_string());
        record_attendance(&pool, first, &req, user).await.unwrap();
        record_attendance(&pool, first, &mark(ivan, AttendanceStatus::Present), user)
            .await
            .unwrap();
        record_attendance(&pool, canceled, &mark(ivan, AttendanceStatus::Absent), user)
            .await
            .unwrap();

        let result = copy_attendance_from_previous_lesson(&pool, target, user).await.unwrap();
        assert_eq!(result.copied, 2);

        let sheet = get_attendance_for_lesson_with_students(&pool, target).await.unwrap();
        let maria_row = sheet.iter().find(|r| r.student_id == maria).unwrap();
        assert_eq!(maria_row.status, Some(AttendanceStatus::Absent));
        assert_eq!(maria_row.comment.as_deref(), Some("хворіє"));
        let ivan_row = sheet.iter().find(|r| r.student_id == ivan).unwrap();
        assert_eq!(ivan_row.status, Some(AttendanceStatus::Present));
    }

    #[tokio::test]
    async fn sheet_lists_unrecorded_students_as_null() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let maria = fx.add_student(&pool, "Петренко Марія").await;
        fx.add_student(&pool, "Андрієнко Іван").await;
        let lesson = fx.add_lesson(&pool, "2026-10-20", "scheduled").await;
        record_attendance(&pool, lesson, &mark(maria, AttendanceStatus::Present), fx.actor.user_id)
            .await
            .unwrap();

        let sheet = get_attendance_for_lesson_with_students(&pool, lesson).await.unwrap();
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet[0].full_name, "Андрієнко Іван");
        assert_eq!(sheet[0].status, None);
        assert_eq!(sheet[0].attendance_id, None);
        assert_eq!(sheet[1].status, Some(AttendanceStatus::Present));

        assert_eq!(clear_attendance_for_lesson(&pool, lesson).await.unwrap(), 1);
        assert_eq!(count_rows(&pool, lesson).await, 0);
    }

    #[tokio::test]
    async fn clearing_leaves_group_history_alone() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let maria = fx.add_student(&pool, "Петренко Марія").await;
        let ivan = fx.add_student(&pool, "Андрієнко Іван").await;
        let lesson = fx.add_lesson(&pool, "2026-10-20", "done").await;
        for student in [maria, ivan] {
            record_attendance(&pool, lesson, &mark(student, AttendanceStatus::Present), fx.actor.user_id)
                .await
                .unwrap();
        }

        let mut conn = pool.acquire().await.unwrap();
        history::add_group_history_entry(
            &mut conn,
            fx.group_id,
            &history_format::lesson_conducted("2026-10-20", None),
            &fx.actor,
        )
        .await
        .unwrap();
        drop(conn);
        let before = history::get_group_history(&pool, fx.group_id, None).await.unwrap();

        assert_eq!(clear_attendance_for_lesson(&pool, lesson).await.unwrap(), 2);
        assert_eq!(count_rows(&pool, lesson).await, 0);

        let after = history::get_group_history(&pool, fx.group_id, None).await.unwrap();
        assert_eq!(after.len(), before.len());
        assert_eq!(after[0].id, before[0].id);
    }

    #[tokio::test]
    async fn stats_without_records_have_zero_rate() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let student = fx.add_student(&pool, "Петренко Марія").await;

        let stats = get_student_attendance_stats(&pool, student, &StudentStatsQuery::default())
            .await
            .unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.attendance_rate, 0);
    }

    #[tokio::test]
    async fn group_stats_aggregate_per_student() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let maria = fx.add_student(&pool, "Петренко Марія").await;
        let ivan = fx.add_student(&pool, "Андрієнко Іван").await;
        let user = fx.actor.user_id;

        let lessons = [
            fx.add_lesson(&pool, "2026-10-06", "done").await,
            fx.add_lesson(&pool, "2026-10-13", "done").await,
            fx.add_lesson(&pool, "2026-10-20", "done").await,
        ];
        let canceled = fx.add_lesson(&pool, "2026-10-27", "canceled").await;

        for lesson in lessons {
            record_attendance(&pool, lesson, &mark(maria, AttendanceStatus::Present), user)
                .await
                .unwrap();
        }
        record_attendance(&pool, lessons[0], &mark(ivan, AttendanceStatus::Present), user)
            .await
            .unwrap();
        record_attendance(&pool, lessons[1], &mark(ivan, AttendanceStatus::Absent), user)
            .await
            .unwrap();
        record_attendance(&pool, lessons[2], &mark(ivan, AttendanceStatus::MakeupPlanned), user)
            .await
            .unwrap();
        record_attendance(&pool, canceled, &mark(ivan, AttendanceStatus::Absent), user)
            .await
            .unwrap();

        let stats = get_group_attendance_stats(&pool, fx.group_id, &DateRangeQuery::default())
            .await
            .unwrap();
        assert_eq!(stats.lessons_total, 3);
        assert_eq!(stats.lessons_done, 3);
        assert_eq!(stats.stats.total, 6);
        assert_eq!(stats.stats.present, 4);
        assert_eq!(stats.stats.attendance_rate, 67);

        assert_eq!(stats.students.len(), 2);
        assert_eq!(stats.students[0].full_name, "Андрієнко Іван");
        assert_eq!(stats.students[0].stats.attendance_rate, 33);
        assert_eq!(stats.students[1].stats.attendance_rate, 100);

        let october_13 = StudentStatsQuery {
            group_id: Some(fx.group_id),
            from: Some("2026-10-13".to_string()),
            to: Some("2026-10-13".to_string()),
        };
        let ivan_stats = get_student_attendance_stats(&pool, ivan, &october_13).await.unwrap();
        assert_eq!(ivan_stats.total, 1);
        assert_eq!(ivan_stats.absent, 1);
        assert_eq!(ivan_stats.attendance_rate, 0);
    }
}
