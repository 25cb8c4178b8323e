//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 라우트 핸들러(routes/)에서 이 모듈의 함수를 호출하여 DB 작업을 수행합니다.
//!
//! 모든 쿼리는 `?` 자리표시자와 `.bind()`만 사용합니다.
//! 조건이 동적으로 바뀌는 쿼리는 `sqlx::QueryBuilder::push_bind`로 조립하며,
//! 값을 SQL 문자열에 직접 이어 붙이지 않습니다.
//!
//! 각 하위 모듈:
//! - `attendance`: 출석 기록, 일괄 기록, 이전 수업 복사, 통계
//! - `courses`: 과정 CRUD
//! - `groups`: 그룹 CRUD, 학생 소속 관리 (변경 시 이력 자동 기록)
//! - `history`: 그룹 이력 추가/조회, `GroupAudit` 트랜잭션 가드
//! - `lessons`: 수업 CRUD, 일정 자동 생성
//! - `payments`: 결제 기록
//! - `students`: 학생 CRUD
//! - `teachers`: 강사 CRUD
//! - `users`: 관리자 계정과 refresh 토큰

pub mod attendance;
pub mod courses;
pub mod groups;
pub mod history;
pub mod lessons;
pub mod payments;
pub mod students;
pub mod teachers;
pub mod users;

/// 새 엔티티의 외부 노출용 식별자 (시간순 정렬 가능한 UUIDv7)
pub fn new_public_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
