//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로 (필수)
//! - `JWT_SECRET`: JWT 토큰 서명에 사용할 비밀키 (필수)
//! - `HOST`, `PORT`: 서버 바인딩 주소와 포트
//! - `LESSON_WEEKS_AHEAD`: 수업 일정 자동 생성 시 기본으로 내다보는 주 수
//! - `FRONTEND_DIST`: 빌드된 대시보드 정적 파일 경로
//! - `COOKIE_SECURE`: 세션 쿠키에 `Secure` 속성을 붙일지 여부 (HTTPS 환경)

use std::env;

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 환경변수에서 한 번 읽어온 후,
/// 애플리케이션 전체에서 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 파일 경로 (예: "sqlite:data/coursedesk.db")
    pub database_url: String,
    /// JWT 토큰 서명/검증에 사용하는 비밀키
    pub jwt_secret: String,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 3000)
    pub port: u16,
    /// 요청에 weeks_ahead가 없을 때 사용할 기본 생성 기간 (기본값: 8주)
    pub lesson_weeks_ahead: u32,
    /// 대시보드 빌드 결과물 디렉토리 (기본값: "../frontend/dist")
    pub frontend_dist: String,
    /// true이면 세션 쿠키에 Secure 속성을 추가합니다.
    pub cookie_secure: bool,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`과 `JWT_SECRET`은 필수이며, 없으면 에러가 발생합니다.
    /// 나머지 설정은 기본값이 있어 환경변수가 없거나 파싱에 실패해도 동작합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            lesson_weeks_ahead: env::var("LESSON_WEEKS_AHEAD")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|weeks| (1..=52).contains(weeks))
                .unwrap_or(8),
            frontend_dist: env::var("FRONTEND_DIST")
                .unwrap_or_else(|_| "../frontend/dist".to_string()),
            // "1", "true", "yes"만 참으로 취급
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}
