//! # 그룹 데이터베이스 쿼리 모듈
//!
//! `study_groups`와 `student_groups` 테이블을 다룹니다.
//!
//! ## 이력 기록 규칙
//! 그룹을 바꾸는 함수(생성, 수정, 학생 추가/제외)는 모두 `GroupAudit` 안에서 실행되며,
//! 변경과 이력 항목이 같은 트랜잭션으로 커밋됩니다.
//!
//! | 작업              | 이력 종류                                      |
//! |-------------------|------------------------------------------------|
//! | 생성              | `created`                                      |
//! | 상태 변경         | `status_changed`                               |
//! | 강사 변경         | `teacher_changed`                              |
//! | 그 외 필드 변경   | 바뀐 필드마다 `edited` 한 건                   |
//! | 학생 추가 / 제외  | `student_added` / `student_removed`            |
//!
//! 그룹 삭제는 이력을 남기지 않습니다. 이력 행이 그룹과 함께 CASCADE로 삭제되기 때문입니다.

use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::db::history::GroupAudit;
use crate::db::{students, teachers};
use crate::error::AppError;
use crate::models::*;
use crate::services::history_format;
use crate::services::schedule::{format_date, parse_date, RecurrenceRule, ValidityWindow};

/// GroupView 조회용 SELECT 절 (WHERE/ORDER BY는 호출하는 쪽에서 붙입니다)
const GROUP_VIEW_SELECT: &str = r#"
    SELECT g.id, g.public_id, g.course_id, g.teacher_id, g.title, g.weekly_day, g.start_time,
           g.duration_minutes, g.start_date, g.end_date, g.room, g.capacity, g.monthly_price,
           g.status, g.notes, g.created_at, g.updated_at,
           c.name AS course_name,
           t.full_name AS teacher_name,
           (SELECT COUNT(*) FROM student_groups sg
             WHERE sg.group_id = g.id AND sg.is_active = 1) AS active_students
    FROM study_groups g
    JOIN courses c ON c.id = g.course_id
    LEFT JOIN teachers t ON t.id = g.teacher_id
"#;

const GROUP_COLUMNS: &str = "id, public_id, course_id, teacher_id, title, weekly_day, start_time, \
                             duration_minutes, start_date, end_date, room, capacity, monthly_price, \
                             status, notes, created_at, updated_at";

/// 그룹 목록 (상태/과정/강사 필터)
pub async fn list_groups(pool: &SqlitePool, query: &GroupListQuery) -> Result<Vec<GroupView>, AppError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(GROUP_VIEW_SELECT);
    qb.push(" WHERE 1 = 1");

    if let Some(status) = query.status {
        qb.push(" AND g.status = ").push_bind(status);
    }
    if let Some(course_id) = query.course_id {
        qb.push(" AND g.course_id = ").push_bind(course_id);
    }
    if let Some(teacher_id) = query.teacher_id {
        qb.push(" AND g.teacher_id = ").push_bind(teacher_id);
    }
    qb.push(" ORDER BY g.weekly_day, g.start_time, g.title");

    let groups = qb.build_query_as::<GroupView>().fetch_all(pool).await?;
    Ok(groups)
}

pub async fn get_group(pool: &SqlitePool, id: i64) -> Result<Option<Group>, AppError> {
    let mut conn = pool.acquire().await?;
    fetch_group(&mut conn, id).await
}

/// 트랜잭션 안에서 그룹 행을 읽습니다.
pub async fn fetch_group(conn: &mut SqliteConnection, id: i64) -> Result<Option<Group>, AppError> {
    let sql = format!("SELECT {} FROM study_groups WHERE id = ?", GROUP_COLUMNS);
    let group = sqlx::query_as::<_, Group>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(group)
}

pub async fn get_group_view(pool: &SqlitePool, id: i64) -> Result<Option<GroupView>, AppError> {
    let sql = format!("{} WHERE g.id = ?", GROUP_VIEW_SELECT);
    let group = sqlx::query_as::<_, GroupView>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(group)
}

pub async fn get_group_by_public_id(
    pool: &SqlitePool,
    public_id: &str,
) -> Result<Option<GroupView>, AppError> {
    let sql = format!("{} WHERE g.public_id = ?", GROUP_VIEW_SELECT);
    let group = sqlx::query_as::<_, GroupView>(&sql)
        .bind(public_id)
        .fetch_optional(pool)
        .await?;

    Ok(group)
}

async fn course_name(conn: &mut SqliteConnection, id: i64) -> Result<Option<String>, AppError> {
    let name = sqlx::query_scalar("SELECT name FROM courses WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(name)
}

/// 빈 문자열을 NULL로 정리합니다.
fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 저장 직전의 그룹 필드 검증과 정규화
///
/// - 반복 규칙과 유효 기간을 검증합니다.
/// - 시작 시각은 "HH:MM", 날짜는 "YYYY-MM-DD"로 정규화합니다.
fn normalize_group(group: &mut Group) -> Result<(), AppError> {
    group.title = group.title.trim().to_string();
    if group.title.is_empty() {
        return Err(AppError::BadRequest("Назва групи обов'язкова".to_string()));
    }

    let rule = RecurrenceRule::new(group.weekly_day, &group.start_time, group.duration_minutes)?;
    group.start_time = rule.start_time.format("%H:%M").to_string();

    let window = ValidityWindow::new(group.start_date.as_deref(), group.end_date.as_deref())?;
    group.start_date = window.start_date.map(format_date);
    group.end_date = window.end_date.map(format_date);

    if group.capacity.is_some_and(|c| c <= 0) {
        return Err(AppError::BadRequest(
            "Кількість місць має бути більшою за нуль".to_string(),
        ));
    }
    if group.monthly_price.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("Вартість не може бути від'ємною".to_string()));
    }

    group.room = blank_to_none(group.room.take());
    group.notes = blank_to_none(group.notes.take());
    Ok(())
}

async fn require_course(conn: &mut SqliteConnection, course_id: i64) -> Result<String, AppError> {
    course_name(conn, course_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Курс не знайдено".to_string()))
}

async fn require_teacher(
    conn: &mut SqliteConnection,
    teacher_id: Option<i64>,
) -> Result<Option<String>, AppError> {
    match teacher_id {
        None => Ok(None),
        Some(id) => teachers::teacher_name(conn, id)
            .await?
            .map(Some)
            .ok_or_else(|| AppError::BadRequest("Викладача не знайдено".to_string())),
    }
}

/// 그룹을 생성하고 `created` 이력을 남깁니다.
pub async fn create_group(
    pool: &SqlitePool,
    req: &CreateGroupRequest,
    actor: &Actor,
) -> Result<GroupView, AppError> {
    let mut group = Group {
        id: 0,
        public_id: super::new_public_id(),
        course_id: req.course_id,
        teacher_id: req.teacher_id,
        title: req.title.clone(),
        weekly_day: req.weekly_day,
        start_time: req.start_time.clone(),
        duration_minutes: req.duration_minutes,
        start_date: req.start_date.clone(),
        end_date: req.end_date.clone(),
        room: req.room.clone(),
        capacity: req.capacity,
        monthly_price: req.monthly_price,
        status: req.status.unwrap_or(GroupStatus::Active),
        notes: req.notes.clone(),
        created_at: String::new(),
        updated_at: String::new(),
    };
    normalize_group(&mut group)?;

    let mut audit = GroupAudit::begin(pool, actor).await?;
    require_course(audit.conn(), group.course_id).await?;
    require_teacher(audit.conn(), group.teacher_id).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO study_groups
            (public_id, course_id, teacher_id, title, weekly_day, start_time, duration_minutes,
             start_date, end_date, room, capacity, monthly_price, status, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&group.public_id)
    .bind(group.course_id)
    .bind(group.teacher_id)
    .bind(&group.title)
    .bind(group.weekly_day)
    .bind(&group.start_time)
    .bind(group.duration_minutes)
    .bind(&group.start_date)
    .bind(&group.end_date)
    .bind(&group.room)
    .bind(group.capacity)
    .bind(group.monthly_price)
    .bind(group.status)
    .bind(&group.notes)
    .execute(audit.conn())
    .await?;
    let id = result.last_insert_rowid();

    audit.record(id, history_format::group_created(&group.title)).await?;
    audit.commit().await?;

    tracing::info!(group_id = id, title = %group.title, "group created");

    get_group_view(pool, id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created group".to_string()))
}

fn opt_to_string<T: ToString>(value: &Option<T>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

/// 바뀐 "일반" 필드 목록: (필드 이름, 이전 값, 새 값)
///
/// 상태, 강사, 과정은 별도의 이력 문장을 쓰므로 여기에 포함하지 않습니다.
fn edited_fields(old: &Group, new: &Group) -> Vec<(&'static str, Option<String>, Option<String>)> {
    let candidates = [
        ("title", Some(old.title.clone()), Some(new.title.clone())),
        ("weekly_day", Some(old.weekly_day.to_string()), Some(new.weekly_day.to_string())),
        ("start_time", Some(old.start_time.clone()), Some(new.start_time.clone())),
        (
            "duration_minutes",
            Some(old.duration_minutes.to_string()),
            Some(new.duration_minutes.to_string()),
        ),
        ("start_date", old.start_date.clone(), new.start_date.clone()),
        ("end_date", old.end_date.clone(), new.end_date.clone()),
        ("room", old.room.clone(), new.room.clone()),
        ("capacity", opt_to_string(&old.capacity), opt_to_string(&new.capacity)),
        (
            "monthly_price",
            opt_to_string(&old.monthly_price),
            opt_to_string(&new.monthly_price),
        ),
        ("notes", old.notes.clone(), new.notes.clone()),
    ];

    candidates
        .into_iter()
        .filter(|(_, before, after)| before != after)
        .collect()
}

/// 그룹을 부분 수정합니다.
///
/// 바뀐 필드마다 이력을 한 건씩 기록하고, 변경과 이력을 한 트랜잭션으로 커밋합니다.
/// 실제로 바뀐 것이 없으면 아무것도 쓰지 않고 현재 상태를 반환합니다.
/// 그룹이 없으면 `Ok(None)`.
pub async fn update_group(
    pool: &SqlitePool,
    id: i64,
    req: &UpdateGroupRequest,
    actor: &Actor,
) -> Result<Option<GroupView>, AppError> {
    let mut audit = GroupAudit::begin(pool, actor).await?;

    let Some(current) = fetch_group(audit.conn(), id).await? else {
        return Ok(None);
    };

    let mut next = current.clone();
    if let Some(course_id) = req.course_id {
        next.course_id = course_id;
    }
    if let Some(teacher_id) = req.teacher_id {
        next.teacher_id = teacher_id;
    }
    if let Some(title) = &req.title {
        next.title = title.clone();
    }
    if let Some(weekly_day) = req.weekly_day {
        next.weekly_day = weekly_day;
    }
    if let Some(start_time) = &req.start_time {
        next.start_time = start_time.clone();
    }
    if let Some(duration_minutes) = req.duration_minutes {
        next.duration_minutes = duration_minutes;
    }
    if let Some(start_date) = &req.start_date {
        next.start_date = start_date.clone();
    }
    if let Some(end_date) = &req.end_date {
        next.end_date = end_date.clone();
    }
    if let Some(room) = &req.room {
        next.room = room.clone();
    }
    if let Some(capacity) = req.capacity {
        next.capacity = capacity;
    }
    if let Some(monthly_price) = req.monthly_price {
        next.monthly_price = monthly_price;
    }
    if let Some(status) = req.status {
        next.status = status;
    }
    if let Some(notes) = &req.notes {
        next.notes = notes.clone();
    }
    normalize_group(&mut next)?;

    let mut drafts = Vec::new();

    if current.status != next.status {
        drafts.push(history_format::status_changed(current.status, next.status));
    }

    if current.teacher_id != next.teacher_id {
        let new_name = require_teacher(audit.conn(), next.teacher_id).await?;
        let old_name = match current.teacher_id {
            Some(old_id) => teachers::teacher_name(audit.conn(), old_id).await?,
            None => None,
        };
        drafts.push(history_format::teacher_changed(
            old_name.as_deref(),
            new_name.as_deref(),
        ));
    }

    if current.course_id != next.course_id {
        let new_name = require_course(audit.conn(), next.course_id).await?;
        let old_name = course_name(audit.conn(), current.course_id).await?;
        drafts.push(history_format::field_edited(
            "course_id",
            old_name.as_deref(),
            Some(&new_name),
        ));
    }

    for (field, before, after) in edited_fields(&current, &next) {
        drafts.push(history_format::field_edited(
            field,
            before.as_deref(),
            after.as_deref(),
        ));
    }

    if drafts.is_empty() {
        drop(audit);
        return get_group_view(pool, id).await;
    }

    sqlx::query(
        r#"
        UPDATE study_groups
        SET course_id = ?, teacher_id = ?, title = ?, weekly_day = ?, start_time = ?,
            duration_minutes = ?, start_date = ?, end_date = ?, room = ?, capacity = ?,
            monthly_price = ?, status = ?, notes = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(next.course_id)
    .bind(next.teacher_id)
    .bind(&next.title)
    .bind(next.weekly_day)
    .bind(&next.start_time)
    .bind(next.duration_minutes)
    .bind(&next.start_date)
    .bind(&next.end_date)
    .bind(&next.room)
    .bind(next.capacity)
    .bind(next.monthly_price)
    .bind(next.status)
    .bind(&next.notes)
    .bind(id)
    .execute(audit.conn())
    .await?;

    for draft in drafts {
        audit.record(id, draft).await?;
    }
    let recorded = audit.commit().await?;

    tracing::info!(group_id = id, entries = recorded, "group updated");

    get_group_view(pool, id).await
}

/// 그룹을 삭제합니다. 활성 학생이 있으면 409.
///
/// 수업, 출석, 소속, 이력은 CASCADE로 함께 삭제됩니다.
pub async fn delete_group(pool: &SqlitePool, id: i64, actor: &Actor) -> Result<bool, AppError> {
    let Some(group) = get_group(pool, id).await? else {
        return Ok(false);
    };

    let active = count_active_students(&mut *pool.acquire().await?, id).await?;
    if active > 0 {
        return Err(AppError::Conflict(format!(
            "У групі {} активних студентів, спершу виключіть їх",
            active
        )));
    }

    let result = sqlx::query("DELETE FROM study_groups WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        let entry = history_format::group_deleted(&group.title);
        tracing::info!(
            group_id = id,
            user_id = actor.user_id,
            user_name = %actor.user_name,
            "{}",
            entry.description
        );
    }
    Ok(result.rows_affected() > 0)
}

async fn count_active_students(conn: &mut SqliteConnection, group_id: i64) -> Result<i64, AppError> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM student_groups WHERE group_id = ? AND is_active = 1",
    )
    .bind(group_id)
    .fetch_one(conn)
    .await?;

    Ok(count)
}

/// 그룹 학생 목록 (이름순). 기본은 활성 학생만.
pub async fn list_group_students(
    pool: &SqlitePool,
    group_id: i64,
    include_inactive: bool,
) -> Result<Vec<GroupStudent>, AppError> {
    let students = sqlx::query_as::<_, GroupStudent>(
        r#"
        SELECT s.id AS student_id, s.public_id, s.full_name, s.phone, s.parent_phone,
               sg.join_date, sg.leave_date, sg.is_active
        FROM student_groups sg
        JOIN students s ON s.id = sg.student_id
        WHERE sg.group_id = ? AND (sg.is_active = 1 OR ?)
        ORDER BY sg.is_active DESC, s.full_name, sg.join_date
        "#,
    )
    .bind(group_id)
    .bind(include_inactive)
    .fetch_all(pool)
    .await?;

    Ok(students)
}

async fn active_membership(
    conn: &mut SqliteConnection,
    group_id: i64,
    student_id: i64,
) -> Result<Option<StudentGroup>, AppError> {
    let membership = sqlx::query_as::<_, StudentGroup>(
        r#"
        SELECT id, student_id, group_id, join_date, leave_date, is_active
        FROM student_groups
        WHERE group_id = ? AND student_id = ? AND is_active = 1
        "#,
    )
    .bind(group_id)
    .bind(student_id)
    .fetch_optional(conn)
    .await?;

    Ok(membership)
}

/// 학생을 그룹에 추가하고 `student_added` 이력을 남깁니다.
///
/// - 이미 활성 소속이면 409
/// - 정원(`capacity`)이 찼으면 409
/// - 같은 날짜로 다시 가입하면 `UNIQUE (student_id, group_id, join_date)` 위반 → 409
/// - 동시에 두 요청이 같은 학생을 넣으면 활성 소속 부분 UNIQUE 인덱스 위반 → 409
pub async fn add_student_to_group(
    pool: &SqlitePool,
    group_id: i64,
    req: &AddStudentToGroupRequest,
    actor: &Actor,
    today: NaiveDate,
) -> Result<StudentGroup, AppError> {
    let join_date = match req.join_date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => parse_date(d)?,
        None => today,
    };
    let join_date = format_date(join_date);

    let mut audit = GroupAudit::begin(pool, actor).await?;

    let group = fetch_group(audit.conn(), group_id)
        .await?
        .ok_or_else(|| AppError::not_found("Групу не знайдено"))?;
    let student_name = students::student_name(audit.conn(), req.student_id)
        .await?
        .ok_or_else(|| AppError::not_found("Студента не знайдено"))?;

    if active_membership(audit.conn(), group_id, req.student_id).await?.is_some() {
        return Err(AppError::Conflict(
            "Студент вже навчається в цій групі".to_string(),
        ));
    }
    if let Some(capacity) = group.capacity {
        if count_active_students(audit.conn(), group_id).await? >= capacity {
            return Err(AppError::Conflict(format!(
                "У групі немає вільних місць (максимум {})",
                capacity
            )));
        }
    }

    let result = sqlx::query(
        "INSERT INTO student_groups (student_id, group_id, join_date) VALUES (?, ?, ?)",
    )
    .bind(req.student_id)
    .bind(group_id)
    .bind(&join_date)
    .execute(audit.conn())
    .await
    .map_err(|e| {
        AppError::conflict_on_unique(e, "Студент вже був доданий до групи цією датою")
    })?;
    let membership_id = result.last_insert_rowid();

    audit
        .record(group_id, history_format::student_added(&student_name, &join_date))
        .await?;
    audit.commit().await?;

    tracing::info!(group_id, student_id = req.student_id, "student added to group");

    Ok(StudentGroup {
        id: membership_id,
        student_id: req.student_id,
        group_id,
        join_date,
        leave_date: None,
        is_active: true,
    })
}

/// 학생을 그룹에서 제외합니다. 소속 행은 지우지 않고 `leave_date`를 기록합니다.
///
/// 활성 소속이 없으면 `Ok(None)`.
pub async fn remove_student_from_group(
    pool: &SqlitePool,
    group_id: i64,
    student_id: i64,
    leave_date: Option<&str>,
    actor: &Actor,
    today: NaiveDate,
) -> Result<Option<StudentGroup>, AppError> {
    let leave = match leave_date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => parse_date(d)?,
        None => today,
    };

    let mut audit = GroupAudit::begin(pool, actor).await?;

    let Some(mut membership) = active_membership(audit.conn(), group_id, student_id).await? else {
        return Ok(None);
    };
    if parse_date(&membership.join_date).is_ok_and(|join| leave < join) {
        return Err(AppError::BadRequest(
            "Дата виключення не може бути раніше дати вступу".to_string(),
        ));
    }
    let leave = format_date(leave);

    let student_name = students::student_name(audit.conn(), student_id)
        .await?
        .unwrap_or_default();

    sqlx::query("UPDATE student_groups SET is_active = 0, leave_date = ? WHERE id = ?")
        .bind(&leave)
        .bind(membership.id)
        .execute(audit.conn())
        .await?;

    audit
        .record(group_id, history_format::student_removed(&student_name, &leave))
        .await?;
    audit.commit().await?;

    tracing::info!(group_id, student_id, "student removed from group");

    membership.is_active = false;
    membership.leave_date = Some(leave);
    Ok(Some(membership))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{history, testing};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn new_group(fx: &testing::Fixture) -> CreateGroupRequest {
        CreateGroupRequest {
            course_id: fx.course_id,
            teacher_id: Some(fx.teacher_id),
            title: "Robotics Сб 10:00".to_string(),
            weekly_day: 6,
            start_time: "10:00:00".to_string(),
            duration_minutes: 60,
            start_date: Some("2026-09-01".to_string()),
            end_date: None,
            room: Some("  ".to_string()),
            capacity: Some(2),
            monthly_price: Some(1500),
            status: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn create_normalizes_fields_and_records_history() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;

        let view = create_group(&pool, &new_group(&fx), &fx.actor).await.unwrap();
        assert_eq!(view.group.start_time, "10:00");
        assert_eq!(view.group.room, None);
        assert_eq!(view.group.status, GroupStatus::Active);
        assert_eq!(view.course_name, "Програмування Scratch");
        assert_eq!(view.teacher_name.as_deref(), Some("Іваненко Олена"));
        assert_eq!(view.active_students, 0);

        let entries = history::get_group_history(&pool, view.group.id, None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action_type, HistoryAction::Created);
        assert_eq!(entries[0].user_id, Some(fx.actor.user_id));
    }

    #[tokio::test]
    async fn invalid_rule_is_rejected_without_writes() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let mut req = new_group(&fx);
        req.weekly_day = 8;

        let err = create_group(&pool, &req, &fx.actor).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let groups = list_groups(&pool, &GroupListQuery::default()).await.unwrap();
        assert_eq!(groups.len(), 1);
    }

    #[tokio::test]
    async fn update_records_one_entry_per_change() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let before = history::get_group_history(&pool, fx.group_id, None).await.unwrap().len();

        let patch: UpdateGroupRequest = serde_json::from_str(
            r#"{"status": "graduate", "teacher_id": null, "room": "A-12", "weekly_day": 4}"#,
        )
        .unwrap();
        let view = update_group(&pool, fx.group_id, &patch, &fx.actor)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.group.status, GroupStatus::Graduate);
        assert_eq!(view.group.teacher_id, None);
        assert_eq!(view.teacher_name, None);

        let entries = history::get_group_history(&pool, fx.group_id, None).await.unwrap();
        assert_eq!(entries.len(), before + 4);

        let actions: Vec<HistoryAction> = entries.iter().map(|e| e.action_type).collect();
        assert!(actions.contains(&HistoryAction::StatusChanged));
        assert!(actions.contains(&HistoryAction::TeacherChanged));
        assert_eq!(
            actions.iter().filter(|a| **a == HistoryAction::Edited).count(),
            2
        );

        let teacher_entry = entries
            .iter()
            .find(|e| e.action_type == HistoryAction::TeacherChanged)
            .unwrap();
        assert_eq!(
            teacher_entry.action_description,
            "Викладача змінено: Іваненко Олена → (порожньо)"
        );
    }

    #[tokio::test]
    async fn unchanged_patch_writes_nothing() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;

        let patch: UpdateGroupRequest =
            serde_json::from_str(r#"{"status": "active", "start_time": "16:00:00"}"#).unwrap();
        let view = update_group(&pool, fx.group_id, &patch, &fx.actor)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.group.start_time, "16:00");

        let entries = history::get_group_history(&pool, fx.group_id, None).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn failed_update_leaves_group_and_history_untouched() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;

        // 존재하지 않는 강사 → 400, 상태 변경도 함께 롤백
        let patch: UpdateGroupRequest =
            serde_json::from_str(r#"{"status": "inactive", "teacher_id": 9999}"#).unwrap();
        let err = update_group(&pool, fx.group_id, &patch, &fx.actor).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let group = get_group(&pool, fx.group_id).await.unwrap().unwrap();
        assert_eq!(group.status, GroupStatus::Active);
        assert!(history::get_group_history(&pool, fx.group_id, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn membership_rules_and_history() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let group = create_group(&pool, &new_group(&fx), &fx.actor).await.unwrap();
        let group_id = group.group.id;

        let mut ids = Vec::new();
        for name in ["Андрієнко Іван", "Бойко Софія", "Гнатюк Марко"] {
            let id = sqlx::query("INSERT INTO students (public_id, full_name) VALUES (?, ?)")
                .bind(crate::db::new_public_id())
                .bind(name)
                .execute(&pool)
                .await
                .unwrap()
                .last_insert_rowid();
            ids.push(id);
        }

        let add = |student_id| AddStudentToGroupRequest { student_id, join_date: None };

        let first = add_student_to_group(&pool, group_id, &add(ids[0]), &fx.actor, today())
            .await
            .unwrap();
        assert_eq!(first.join_date, "2026-10-19");

        // 이미 활성 소속
        let err = add_student_to_group(&pool, group_id, &add(ids[0]), &fx.actor, today())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        add_student_to_group(&pool, group_id, &add(ids[1]), &fx.actor, today())
            .await
            .unwrap();

        // 정원 2명 초과
        let err = add_student_to_group(&pool, group_id, &add(ids[2]), &fx.actor, today())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // 삭제는 활성 학생 때문에 거부
        let err = delete_group(&pool, group_id, &fx.actor).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let removed = remove_student_from_group(&pool, group_id, ids[0], None, &fx.actor, today())
            .await
            .unwrap()
            .unwrap();
        assert!(!removed.is_active);
        assert_eq!(removed.leave_date.as_deref(), Some("2026-10-19"));

        // 같은 날 재가입은 UNIQUE 위반 → 409
        let err = add_student_to_group(&pool, group_id, &add(ids[0]), &fx.actor, today())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let active = list_group_students(&pool, group_id, false).await.unwrap();
        assert_eq!(active.len(), 1);
        let all = list_group_students(&pool, group_id, true).await.unwrap();
        assert_eq!(all.len(), 2);

        let entries = history::get_group_history(&pool, group_id, None).await.unwrap();
        let actions: Vec<HistoryAction> = entries.iter().map(|e| e.action_type).collect();
        assert_eq!(
            actions,
            vec![
                HistoryAction::StudentRemoved,
                HistoryAction::StudentAdded,
                HistoryAction::StudentAdded,
                HistoryAction::Created,
            ]
        );
        assert_eq!(
            entries[0].action_description,
            "Студента Андрієнко Іван виключено з групи (19.10.2026)"
        );
    }

    #[tokio::test]
    async fn schema_allows_one_active_membership_per_student() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let student_id = fx.add_student(&pool, "Петренко Марія").await;

        let insert = |join_date: &'static str| {
            sqlx::query(
                "INSERT INTO student_groups (student_id, group_id, join_date) VALUES (?, ?, ?)",
            )
            .bind(student_id)
            .bind(fx.group_id)
            .bind(join_date)
        };

        // 다른 날짜라도 활성 소속이 이미 있으면 거부됩니다.
        assert!(insert("2026-10-01").execute(&pool).await.is_err());

        sqlx::query("UPDATE student_groups SET is_active = 0, leave_date = '2026-09-30' WHERE student_id = ?")
            .bind(student_id)
            .execute(&pool)
            .await
            .unwrap();
        insert("2026-10-01").execute(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn removing_non_member_is_none() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;

        let result = remove_student_from_group(&pool, fx.group_id, 9999, None, &fx.actor, today())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn list_filters_and_counts_active_students() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        fx.add_student(&pool, "Петренко Марія").await;
        fx.insert_group(&pool, "Scratch Чт", 4).await;
        sqlx::query("UPDATE study_groups SET status = 'inactive' WHERE title = 'Scratch Чт'")
            .execute(&pool)
            .await
            .unwrap();

        let active = list_groups(
            &pool,
            &GroupListQuery { status: Some(GroupStatus::Active), ..Default::default() },
        )
        .await
        .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].active_students, 1);

        let by_public = get_group_by_public_id(&pool, &active[0].group.public_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_public.group.id, fx.group_id);
    }
}
