//! # 출석(Attendance) 모델
//!
//! 학생 한 명 × 수업 한 회차마다 출석 기록이 최대 하나 존재합니다.
//! (`UNIQUE (lesson_id, student_id)`)
//!
//! ## 출석 상태
//! - `present`: 출석
//! - `absent`: 결석
//! - `makeup_planned`: 보강 예정 (`makeup_lesson_id`로 보강 수업을 가리킬 수 있음)
//! - `makeup_done`: 보강 완료

use serde::{Deserialize, Serialize};

/// 출석 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    MakeupPlanned,
    MakeupDone,
}

/// 출석 엔티티: DB의 `attendance` 테이블 한 행에 대응합니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: i64,
    pub lesson_id: i64,
    pub student_id: i64,
    pub status: AttendanceStatus,
    pub comment: Option<String>,
    /// 보강 수업 참조 (소유 관계가 아닌 역참조)
    pub makeup_lesson_id: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// 수업 출석부의 한 줄
///
/// 그룹 학생 목록에 출석 기록을 LEFT JOIN한 결과이므로,
/// 아직 출석이 기록되지 않은 학생은 `status`가 `None`(JSON null)입니다.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LessonAttendanceRow {
    pub student_id: i64,
    pub full_name: String,
    pub attendance_id: Option<i64>,
    pub status: Option<AttendanceStatus>,
    pub comment: Option<String>,
    pub makeup_lesson_id: Option<i64>,
}

/// 출석 한 건 기록 요청: `PUT /api/v1/lessons/{id}/attendance`
#[derive(Debug, Deserialize)]
pub struct SetAttendanceRequest {
    pub student_id: i64,
    pub status: AttendanceStatus,
    pub comment: Option<String>,
    pub makeup_lesson_id: Option<i64>,
}

/// 전체 학생 출석 일괄 기록 요청: `POST /api/v1/lessons/{id}/attendance/all`
#[derive(Debug, Deserialize)]
pub struct SetAttendanceForAllRequest {
    pub status: AttendanceStatus,
}

/// 상태별 집계 원본: SQL의 COUNT/SUM 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct AttendanceCounts {
    pub total: i64,
    pub present: i64,
    pub absent: i64,
    pub makeup_planned: i64,
    pub makeup_done: i64,
}

/// 출석 통계: 상태별 건수와 출석률(%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    pub total: i64,
    pub present: i64,
    pub absent: i64,
    pub makeup_planned: i64,
    pub makeup_done: i64,
    /// round(present / total × 100), total이 0이면 0
    pub attendance_rate: i64,
}

impl From<AttendanceCounts> for AttendanceStats {
    fn from(counts: AttendanceCounts) -> Self {
        Self {
            total: counts.total,
            present: counts.present,
            absent: counts.absent,
            makeup_planned: counts.makeup_planned,
            makeup_done: counts.makeup_done,
            attendance_rate: attendance_rate(counts.present, counts.total),
        }
    }
}

/// 출석률(%)을 계산합니다. 0으로 나누는 경우는 0을 반환합니다.
pub fn attendance_rate(present: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (present as f64 / total as f64 * 100.0).round() as i64
}

/// 학생 출석 통계 필터: `?group_id=3&from=2026-09-01&to=2026-12-31`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StudentStatsQuery {
    pub group_id: Option<i64>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// 그룹 내 학생 한 명의 출석 통계
#[derive(Debug, Clone, Serialize)]
pub struct StudentAttendanceSummary {
    pub student_id: i64,
    pub full_name: String,
    #[serde(flatten)]
    pub stats: AttendanceStats,
}

/// 그룹 전체 출석 통계
#[derive(Debug, Clone, Serialize)]
pub struct GroupAttendanceStats {
    pub group_id: i64,
    /// 기간 내 취소되지 않은 수업 수
    pub lessons_total: i64,
    /// 그중 진행 완료(done)된 수업 수
    pub lessons_done: i64,
    #[serde(flatten)]
    pub stats: AttendanceStats,
    pub students: Vec<StudentAttendanceSummary>,
}

/// 이전 수업 출석 복사 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CopyAttendanceResult {
    pub copied: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_zero_without_records() {
        assert_eq!(attendance_rate(0, 0), 0);
    }

    #[test]
    fn rate_rounds_to_nearest_percent() {
        assert_eq!(attendance_rate(2, 3), 67);
        assert_eq!(attendance_rate(1, 3), 33);
        assert_eq!(attendance_rate(1, 8), 13);
        assert_eq!(attendance_rate(5, 5), 100);
    }
}
