//! # 서비스 모듈
//!
//! DB와 무관한 순수 비즈니스 로직을 모아둔 모듈입니다.
//! - `schedule`: 주간 반복 규칙 → 구체적인 수업 날짜/시각 계산
//! - `history_format`: 그룹 이력 항목의 설명 문장 생성

pub mod history_format;
pub mod schedule;
