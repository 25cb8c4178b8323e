//! # 그룹 이력(Group History) 모델
//!
//! 그룹에 일어난 변경을 사람이 읽을 수 있는 문장으로 남기는 **추가 전용(append-only)** 기록입니다.
//! 한 번 기록된 항목은 수정·삭제되지 않으며, 그룹이 삭제될 때만 함께(CASCADE) 지워집니다.
//!
//! `user_name`은 기록 시점의 사용자 이름을 복사해 두므로,
//! 나중에 사용자 이름이 바뀌어도 이력은 당시 이름을 유지합니다.

use serde::{Deserialize, Serialize};

/// 이력 항목의 종류 (닫힌 열거형)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Edited,
    TeacherChanged,
    StudentAdded,
    StudentRemoved,
    LessonConducted,
    StatusChanged,
    Deleted,
}

/// 이력 엔티티: DB의 `group_history` 테이블 한 행에 대응합니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupHistoryEntry {
    pub id: i64,
    pub group_id: i64,
    pub action_type: HistoryAction,
    /// 사람이 읽는 설명 (예: "Статус змінено: Активна → Випущена")
    pub action_description: String,
    /// 변경 전/후 값의 텍스트 스냅샷 (구조화된 diff가 아님)
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub user_id: Option<i64>,
    pub user_name: String,
    pub created_at: String,
}

/// 아직 저장되지 않은 이력 항목: 포매터(services::history_format)가 만듭니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryDraft {
    pub action: HistoryAction,
    pub description: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// 이력 조회 필터: `?limit=20`
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}
