//! # Coursedesk 웹 서버 진입점
//!
//! 교육 센터 관리 대시보드의 백엔드 서버입니다.
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 데이터베이스 연결 풀 생성 (파일이 없으면 생성)
//! 4. 데이터베이스 마이그레이션 실행
//! 5. API 라우터 + 대시보드 정적 파일 설정
//! 6. HTTP 서버 시작

mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

use std::{path::Path, str::FromStr};

use anyhow::Result;
use config::Config;
use routes::AppState;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅(tracing) 초기화 ──
    // RUST_LOG가 없으면 coursedesk, tower_http, axum 모듈을 debug 레벨로 설정
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursedesk=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    let config = Config::from_env()?;
    tracing::info!("Starting Coursedesk server on {}:{}", config.host, config.port);

    // ── 4단계: SQLite 연결 풀 생성 ──
    // create_if_missing(true): 첫 실행 시 데이터베이스 파일을 새로 만듭니다.
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // ── 5단계: 데이터베이스 마이그레이션 실행 ──
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    // ── 6단계: 애플리케이션 상태(State) 생성 ──
    let state = AppState {
        pool,
        jwt_secret: config.jwt_secret.clone(),
        lesson_weeks_ahead: config.lesson_weeks_ahead,
        cookie_secure: config.cookie_secure,
    };

    // ── 7단계: 미들웨어 설정 ──
    // 개발 환경에서는 Any(모두 허용)로 설정합니다.
    // 쿠키 세션은 같은 출처(대시보드를 이 서버가 직접 서빙)에서만 전송됩니다.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // ── 8단계: 대시보드 정적 파일 서빙 ──
    // SPA이므로, 찾을 수 없는 경로는 index.html로 돌려보냅니다.
    let frontend_dist = Path::new(&config.frontend_dist);
    let app = if frontend_dist.exists() {
        tracing::info!("Serving dashboard static files from {}", config.frontend_dist);

        let serve_dir = ServeDir::new(frontend_dist)
            .not_found_service(ServeFile::new(frontend_dist.join("index.html")));

        routes::router(state)
            .fallback_service(serve_dir)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    } else {
        tracing::warn!(
            "Dashboard directory {} not found, serving API only",
            config.frontend_dist
        );

        routes::router(state)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    };

    // ── 9단계: 서버 시작 ──
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
