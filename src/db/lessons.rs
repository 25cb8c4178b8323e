//! # 수업 데이터베이스 쿼리 모듈
//!
//! 수업 CRUD와 **주간 일정 자동 생성**을 담당합니다.
//!
//! ## 일정 생성 흐름
//! ```text
//! 그룹 조회 → RecurrenceRule/ValidityWindow 검증
//!          → services::schedule::plan_lessons()로 후보 날짜 계산 (순수 계산)
//!          → 후보마다: 이미 있으면 skipped, 없으면 INSERT → generated
//! ```
//! 같은 기간으로 여러 번 실행해도 수업이 중복되지 않습니다(멱등).
//! `(group_id, lesson_date)` UNIQUE 인덱스가 있으므로 동시에 두 요청이 같은 날짜를 넣으려 해도
//! `ON CONFLICT DO NOTHING`에 걸린 쪽은 skipped로 집계됩니다.
//!
//! 후보 INSERT들은 하나의 트랜잭션으로 묶지 않습니다. 중간에 실패해도 다시 실행하면 됩니다.

use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::db::groups;
use crate::db::history;
use crate::error::AppError;
use crate::models::*;
use crate::services::history_format;
use crate::services::schedule::{
    format_date, parse_date, parse_optional_date, plan_lessons, RecurrenceRule, ScheduleError,
    ValidityWindow, MAX_WEEKS_AHEAD,
};

const LESSON_COLUMNS: &str = "id, public_id, group_id, lesson_date, start_datetime, end_datetime, \
                              status, topic, notes, created_by, created_at, updated_at";

/// 날짜 범위 필터를 검증해 정규화된 문자열로 돌려줍니다.
fn date_range(range: &DateRangeQuery) -> Result<(Option<String>, Option<String>), AppError> {
    let from = parse_optional_date(range.from.as_deref())?.map(format_date);
    let to = parse_optional_date(range.to.as_deref())?.map(format_date);
    Ok((from, to))
}

/// 그룹의 수업 목록 (날짜순)
pub async fn list_group_lessons(
    pool: &SqlitePool,
    group_id: i64,
    range: &DateRangeQuery,
) -> Result<Vec<Lesson>, AppError> {
    let (from, to) = date_range(range)?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
    qb.push(LESSON_COLUMNS);
    qb.push(" FROM lessons WHERE group_id = ").push_bind(group_id);
    if let Some(from) = from {
        qb.push(" AND lesson_date >= ").push_bind(from);
    }
    if let Some(to) = to {
        qb.push(" AND lesson_date <= ").push_bind(to);
    }
    qb.push(" ORDER BY lesson_date");

    let lessons = qb.build_query_as::<Lesson>().fetch_all(pool).await?;
    Ok(lessons)
}

/// 모든 그룹의 수업을 그룹 이름과 함께 시각순으로 조회합니다. (달력 화면)
pub async fn list_calendar(
    pool: &SqlitePool,
    range: &DateRangeQuery,
) -> Result<Vec<LessonWithGroup>, AppError> {
    let (from, to) = date_range(range)?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT l.id, l.public_id, l.group_id, l.lesson_date, l.start_datetime, l.end_datetime,
               l.status, l.topic, l.notes, l.created_by, l.created_at, l.updated_at,
               g.title AS group_title
        FROM lessons l
        JOIN study_groups g ON g.id = l.group_id
        WHERE 1 = 1
        "#,
    );
    if let Some(from) = from {
        qb.push(" AND l.lesson_date >= ").push_bind(from);
    }
    if let Some(to) = to {
        qb.push(" AND l.lesson_date <= ").push_bind(to);
    }
    qb.push(" ORDER BY l.start_datetime, g.title");

    let lessons = qb.build_query_as::<LessonWithGroup>().fetch_all(pool).await?;
    Ok(lessons)
}

pub async fn get_lesson(pool: &SqlitePool, id: i64) -> Result<Option<Lesson>, AppError> {
    let mut conn = pool.acquire().await?;
    fetch_lesson(&mut conn, id).await
}

pub async fn fetch_lesson(conn: &mut SqliteConnection, id: i64) -> Result<Option<Lesson>, AppError> {
    let sql = format!("SELECT {} FROM lessons WHERE id = ?", LESSON_COLUMNS);
    let lesson = sqlx::query_as::<_, Lesson>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(lesson)
}

fn blank_to_none(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// 그룹 규칙에 따라 특정 날짜의 수업 하나를 만듭니다.
///
/// - 날짜가 그룹의 유효 기간 밖이면 400
/// - 같은 날짜의 수업이 이미 있으면 409
pub async fn create_lesson(
    pool: &SqlitePool,
    group_id: i64,
    req: &CreateLessonRequest,
    created_by: i64,
) -> Result<Lesson, AppError> {
    let group = groups::get_group(pool, group_id)
        .await?
        .ok_or_else(|| AppError::not_found("Групу не знайдено"))?;
    let rule = RecurrenceRule::from_group(&group)?;
    let window = ValidityWindow::from_group(&group)?;

    let date = parse_date(&req.lesson_date)?;
    if !window.contains(date) {
        return Err(ScheduleError::OutsideWindow(format_date(date)).into());
    }
    let slot = rule.slot(date)?;

    let result = sqlx::query(
        r#"
        INSERT INTO lessons
            (public_id, group_id, lesson_date, start_datetime, end_datetime, status, topic, notes, created_by)
        VALUES (?, ?, ?, ?, ?, 'scheduled', ?, ?, ?)
        "#,
    )
    .bind(super::new_public_id())
    .bind(group_id)
    .bind(slot.date_string())
    .bind(slot.start_string())
    .bind(slot.end_string())
    .bind(blank_to_none(req.topic.as_deref()))
    .bind(blank_to_none(req.notes.as_deref()))
    .bind(created_by)
    .execute(pool)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "На цю дату в групи вже є заняття"))?;

    get_lesson(pool, result.last_insert_rowid())
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created lesson".to_string()))
}

async fn write_lesson(conn: &mut SqliteConnection, lesson: &Lesson) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE lessons
        SET lesson_date = ?, start_datetime = ?, end_datetime = ?, status = ?, topic = ?, notes = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(&lesson.lesson_date)
    .bind(&lesson.start_datetime)
    .bind(&lesson.end_datetime)
    .bind(lesson.status)
    .bind(&lesson.topic)
    .bind(&lesson.notes)
    .bind(lesson.id)
    .execute(conn)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "На цю дату в групи вже є заняття"))?;

    Ok(())
}

/// 수업을 부분 수정합니다. 수업이 없으면 `Ok(None)`.
///
/// 날짜를 옮기면 그룹 규칙으로 시작/종료 시각을 다시 계산합니다.
/// 상태가 `done`으로 바뀌는 순간에만 그룹 이력에 `lesson_conducted`를 남깁니다.
///
/// 현재 상태 조회, 수정, 이력 기록이 모두 한 트랜잭션 안에서 일어나므로
/// 두 요청이 동시에 `done`으로 바꿔도 이력은 한 건만 남습니다.
pub async fn update_lesson(
    pool: &SqlitePool,
    id: i64,
    req: &UpdateLessonRequest,
    actor: &Actor,
) -> Result<Option<Lesson>, AppError> {
    let mut tx = pool.begin().await?;

    let Some(current) = fetch_lesson(&mut tx, id).await? else {
        return Ok(None);
    };
    let mut next = current.clone();

    if let Some(date) = &req.lesson_date {
        let date = parse_date(date)?;
        if format_date(date) != current.lesson_date {
            let group = groups::fetch_group(&mut tx, current.group_id)
                .await?
                .ok_or(AppError::Internal("Lesson without group".to_string()))?;
            if !ValidityWindow::from_group(&group)?.contains(date) {
                return Err(ScheduleError::OutsideWindow(format_date(date)).into());
            }
            let slot = RecurrenceRule::from_group(&group)?.slot(date)?;
            next.lesson_date = slot.date_string();
            next.start_datetime = slot.start_string();
            next.end_datetime = slot.end_string();
        }
    }
    if let Some(status) = req.status {
        next.status = status;
    }
    if let Some(topic) = &req.topic {
        next.topic = blank_to_none(topic.as_deref());
    }
    if let Some(notes) = &req.notes {
        next.notes = blank_to_none(notes.as_deref());
    }

    write_lesson(&mut tx, &next).await?;

    let conducted = current.status != LessonStatus::Done && next.status == LessonStatus::Done;
    if conducted {
        history::add_group_history_entry(
            &mut tx,
            next.group_id,
            &history_format::lesson_conducted(&next.lesson_date, next.topic.as_deref()),
            actor,
        )
        .await?;
    }

    let updated = fetch_lesson(&mut tx, id).await?;
    tx.commit().await?;

    if conducted {
        tracing::info!(lesson_id = id, group_id = next.group_id, "lesson conducted");
    }
    Ok(updated)
}

/// 수업을 삭제합니다. 출석 기록이 있으면 409 (CASCADE로 지우지 않습니다).
pub async fn delete_lesson(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE lesson_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if records > 0 {
        return Err(AppError::Conflict(
            "Заняття має записи відвідуваності, спершу очистіть їх".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM lessons WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn check_weeks_ahead(weeks_ahead: u32) -> Result<(), ScheduleError> {
    if !(1..=MAX_WEEKS_AHEAD).contains(&weeks_ahead) {
        return Err(ScheduleError::InvalidWeeksAhead(weeks_ahead));
    }
    Ok(())
}

/// 그룹 하나의 수업을 앞으로 `weeks_ahead`주 동안 생성합니다.
///
/// # 매개변수
/// - `created_by`: 생성한 사용자 id (수업의 `created_by`)
/// - `today`: 기준일. HTTP 계층은 서버의 현지 날짜를 넘깁니다.
///
/// # 반환값
/// `{generated, skipped}`. 그룹이 없으면 404, 규칙이 잘못되었으면 400.
pub async fn generate_lessons_for_group(
    pool: &SqlitePool,
    group_id: i64,
    weeks_ahead: u32,
    created_by: i64,
    today: NaiveDate,
) -> Result<GenerationResult, AppError> {
    check_weeks_ahead(weeks_ahead)?;
    let group = groups::get_group(pool, group_id)
        .await?
        .ok_or_else(|| AppError::not_found("Групу не знайдено"))?;

    let result = generate_for(pool, &group, weeks_ahead, created_by, today).await?;
    tracing::info!(
        group_id,
        generated = result.generated,
        skipped = result.skipped,
        "lessons generated"
    );
    Ok(result)
}

async fn generate_for(
    pool: &SqlitePool,
    group: &Group,
    weeks_ahead: u32,
    created_by: i64,
    today: NaiveDate,
) -> Result<GenerationResult, AppError> {
    let rule = RecurrenceRule::from_group(group)?;
    let window = ValidityWindow::from_group(group)?;
    let planned = plan_lessons(&rule, &window, today, weeks_ahead)?;

    let mut result = GenerationResult { generated: 0, skipped: 0 };

    for slot in planned {
        let date = slot.date_string();

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM lessons WHERE group_id = ? AND lesson_date = ?",
        )
        .bind(group.id)
        .bind(&date)
        .fetch_one(pool)
        .await?;
        if existing > 0 {
            result.skipped += 1;
            continue;
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO lessons
                (public_id, group_id, lesson_date, start_datetime, end_datetime, status, created_by)
            VALUES (?, ?, ?, ?, ?, 'scheduled', ?)
            ON CONFLICT (group_id, lesson_date) DO NOTHING
            "#,
        )
        .bind(super::new_public_id())
        .bind(group.id)
        .bind(&date)
        .bind(slot.start_string())
        .bind(slot.end_string())
        .bind(created_by)
        .execute(pool)
        .await?;

        if inserted.rows_affected() > 0 {
            result.generated += 1;
        } else {
            tracing::debug!(group_id = group.id, date = %date, "lesson inserted concurrently, skipping");
            result.skipped += 1;
        }
    }

    Ok(result)
}

/// 모든 활성(`status = active`) 그룹의 수업을 생성합니다.
///
/// 그룹 하나의 실패(잘못된 규칙 등)는 그 그룹의 `error`에만 기록되고
/// 나머지 그룹의 생성은 계속됩니다.
pub async fn generate_lessons_for_active_groups(
    pool: &SqlitePool,
    weeks_ahead: u32,
    created_by: i64,
    today: NaiveDate,
) -> Result<BatchGenerationReport, AppError> {
    check_weeks_ahead(weeks_ahead)?;

    let active = groups::list_groups(
        pool,
        &GroupListQuery {
            status: Some(GroupStatus::Active),
            ..Default::default()
        },
    )
    .await?;

    let mut report = BatchGenerationReport {
        groups: Vec::with_capacity(active.len()),
        total_generated: 0,
        total_skipped: 0,
        failed: 0,
    };

    for view in active {
        let group = view.group;
        let mut outcome = GroupGenerationOutcome {
            group_id: group.id,
            group_title: group.title.clone(),
            generated: 0,
            skipped: 0,
            error: None,
        };

        match generate_for(pool, &group, weeks_ahead, created_by, today).await {
            Ok(result) => {
                outcome.generated = result.generated;
                outcome.skipped = result.skipped;
                report.total_generated += result.generated;
                report.total_skipped += result.skipped;
            }
            Err(AppError::BadRequest(message)) => {
                tracing::warn!(group_id = group.id, error = %message, "skipping group with invalid schedule");
                outcome.error = Some(message);
                report.failed += 1;
            }
            Err(err) => {
                tracing::warn!(group_id = group.id, error = %err, "lesson generation failed for group");
                outcome.error = Some("Не вдалося згенерувати заняття".to_string());
                report.failed += 1;
            }
        }

        report.groups.push(outcome);
    }

    tracing::info!(
        groups = report.groups.len(),
        generated = report.total_generated,
        skipped = report.total_skipped,
        failed = report.failed,
        "batch lesson generation finished"
    );
    Ok(report)
}
