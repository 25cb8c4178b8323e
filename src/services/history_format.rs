//! # 그룹 이력 설명 문장 생성
//!
//! 이력 종류별로 사람이 읽을 수 있는 우크라이나어 설명을 만듭니다.
//! 원시 필드 이름/값(`weekly_day`, `graduate` …)을 화면용 라벨로 바꾸며,
//! 모르는 필드 이름은 원래 키를 그대로 쓰고, 비어 있는 값은 `(порожньо)`로 표시합니다.

use crate::models::{GroupStatus, HistoryAction, HistoryDraft};
use crate::services::schedule::parse_date;

/// 비어 있는 값 표시
pub const EMPTY_VALUE: &str = "(порожньо)";

pub fn status_label(status: GroupStatus) -> &'static str {
    match status {
        GroupStatus::Active => "Активна",
        GroupStatus::Graduate => "Випущена",
        GroupStatus::Inactive => "Неактивна",
    }
}

pub fn weekday_label(day: i64) -> Option<&'static str> {
    let label = match day {
        1 => "Понеділок",
        2 => "Вівторок",
        3 => "Середа",
        4 => "Четвер",
        5 => "П'ятниця",
        6 => "Субота",
        7 => "Неділя",
        _ => return None,
    };
    Some(label)
}

/// 그룹 필드 이름 → 화면 라벨. 모르는 이름은 그대로 반환합니다.
pub fn field_label(field: &str) -> &str {
    match field {
        "title" => "Назва",
        "course_id" => "Курс",
        "teacher_id" => "Викладач",
        "weekly_day" => "День тижня",
        "start_time" => "Час початку",
        "duration_minutes" => "Тривалість (хв)",
        "start_date" => "Дата початку",
        "end_date" => "Дата завершення",
        "room" => "Аудиторія",
        "capacity" => "Кількість місць",
        "monthly_price" => "Вартість на місяць",
        "status" => "Статус",
        "notes" => "Примітки",
        other => other,
    }
}

/// 필드 값을 화면용 문자열로 바꿉니다.
fn display_value(field: &str, value: Option<&str>) -> String {
    let value = match value.map(str::trim) {
        None | Some("") => return EMPTY_VALUE.to_string(),
        Some(v) => v,
    };

    match field {
        "weekly_day" => value
            .parse::<i64>()
            .ok()
            .and_then(weekday_label)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        "start_date" | "end_date" => display_date(value),
        _ => value.to_string(),
    }
}

/// "2026-10-20" → "20.10.2026". 형식이 다르면 그대로 둡니다.
pub fn display_date(value: &str) -> String {
    parse_date(value)
        .map(|d| d.format("%d.%m.%Y").to_string())
        .unwrap_or_else(|_| value.to_string())
}

fn or_empty(value: Option<&str>) -> String {
    match value.map(str::trim) {
        None | Some("") => EMPTY_VALUE.to_string(),
        Some(v) => v.to_string(),
    }
}

pub fn group_created(title: &str) -> HistoryDraft {
    HistoryDraft {
        action: HistoryAction::Created,
        description: format!("Групу «{}» створено", title),
        old_value: None,
        new_value: Some(title.to_string()),
    }
}

pub fn status_changed(old: GroupStatus, new: GroupStatus) -> HistoryDraft {
    HistoryDraft {
        action: HistoryAction::StatusChanged,
        description: format!(
            "Статус змінено: {} → {}",
            status_label(old),
            status_label(new)
        ),
        old_value: Some(old.as_str().to_string()),
        new_value: Some(new.as_str().to_string()),
    }
}

/// 강사 변경. 이름이 없으면(배정 해제 등) `(порожньо)`로 표시합니다.
pub fn teacher_changed(old_name: Option<&str>, new_name: Option<&str>) -> HistoryDraft {
    HistoryDraft {
        action: HistoryAction::TeacherChanged,
        description: format!(
            "Викладача змінено: {} → {}",
            or_empty(old_name),
            or_empty(new_name)
        ),
        old_value: old_name.map(str::to_string),
        new_value: new_name.map(str::to_string),
    }
}

pub fn field_edited(field: &str, old: Option<&str>, new: Option<&str>) -> HistoryDraft {
    HistoryDraft {
        action: HistoryAction::Edited,
        description: format!(
            "Змінено поле «{}»: {} → {}",
            field_label(field),
            display_value(field, old),
            display_value(field, new)
        ),
        old_value: old.map(str::to_string),
        new_value: new.map(str::to_string),
    }
}

pub fn lesson_conducted(lesson_date: &str, topic: Option<&str>) -> HistoryDraft {
    let description = match topic.map(str::trim).filter(|t| !t.is_empty()) {
        Some(topic) => format!("Проведено заняття {}: {}", display_date(lesson_date), topic),
        None => format!("Проведено заняття {}", display_date(lesson_date)),
    };
    HistoryDraft {
        action: HistoryAction::LessonConducted,
        description,
        old_value: None,
        new_value: Some(lesson_date.to_string()),
    }
}

pub fn student_added(student_name: &str, join_date: &str) -> HistoryDraft {
    HistoryDraft {
        action: HistoryAction::StudentAdded,
        description: format!(
            "Додано студента {} (з {})",
            student_name,
            display_date(join_date)
        ),
        old_value: None,
        new_value: Some(student_name.to_string()),
    }
}

pub fn student_removed(student_name: &str, leave_date: &str) -> HistoryDraft {
    HistoryDraft {
        action: HistoryAction::StudentRemoved,
        description: format!(
            "Студента {} виключено з групи ({})",
            student_name,
            display_date(leave_date)
        ),
        old_value: Some(student_name.to_string()),
        new_value: None,
    }
}

/// 그룹 행과 함께 이력도 CASCADE로 지워지므로, 이 항목은 로그에만 남습니다.
pub fn group_deleted(title: &str) -> HistoryDraft {
    HistoryDraft {
        action: HistoryAction::Deleted,
        description: format!("Групу «{}» видалено", title),
        old_value: Some(title.to_string()),
        new_value: None,
    }
}
