//! # 학생(Student) 모델
//!
//! 학생 정보와 학생의 그룹 소속 이력 조회용 구조체입니다.
//! 미성년 학생이 대부분이므로 보호자 연락처(parent_*)를 함께 관리합니다.

use serde::{Deserialize, Serialize};

use super::double_option;

/// 학생 엔티티: DB의 `students` 테이블 한 행에 대응합니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: i64,
    pub public_id: String,
    pub full_name: String,
    /// 생년월일 ("YYYY-MM-DD")
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// 학생 생성 요청: `POST /api/v1/students`
#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub full_name: String,
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
    pub notes: Option<String>,
}

/// 학생 수정 요청: `PATCH /api/v1/students/{id}`
#[derive(Debug, Default, Deserialize)]
pub struct UpdateStudentRequest {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub birth_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// 학생 목록 필터: `?q=Петренко&active=true`
///
/// `q`는 이름 또는 전화번호(학생/보호자)의 부분 일치로 검색합니다.
#[derive(Debug, Default, Deserialize)]
pub struct StudentListQuery {
    pub q: Option<String>,
    pub active: Option<bool>,
}

/// 학생의 그룹 소속 한 건 (그룹 이름 포함)
///
/// `GET /api/v1/students/{id}/groups`의 응답 항목입니다.
/// 탈퇴 후 재가입한 경우 같은 그룹이 여러 번 나타날 수 있습니다.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StudentMembership {
    pub membership_id: i64,
    pub group_id: i64,
    pub group_title: String,
    pub join_date: String,
    pub leave_date: Option<String>,
    pub is_active: bool,
}
