//! # 헬스체크(Health Check) 핸들러
//!
//! ## 엔드포인트
//! - `GET /api/v1/health` → `{ "status": "ok", "database": "ok" }`
//!
//! 인증 없이 호출할 수 있습니다. 데이터베이스에 `SELECT 1`을 보내
//! 연결 풀이 살아 있는지도 함께 확인합니다.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::routes::AppState;

/// `GET /health`: 서버와 데이터베이스 상태를 확인합니다.
///
/// DB 연결에 실패하면 503 Service Unavailable을 반환하여
/// 컨테이너 헬스체크가 재시작을 판단할 수 있게 합니다.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check database probe failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "database": "unavailable"
                })),
            )
        }
    }
}
