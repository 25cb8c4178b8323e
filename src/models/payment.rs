use serde::{Deserialize, Serialize};

/// 결제 수단
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

/// 결제 엔티티: `payments` 테이블
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: i64,
    pub public_id: String,
    pub student_id: i64,
    pub group_id: Option<i64>,
    /// 금액 (흐리우냐 단위 정수, 0보다 커야 함)
    pub amount: i64,
    /// 결제일 ("YYYY-MM-DD")
    pub paid_at: String,
    /// 어느 달 수강료인지 ("YYYY-MM")
    pub period_month: Option<String>,
    pub method: PaymentMethod,
    pub comment: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: String,
}

/// 결제 등록 요청: `POST /api/v1/students/{id}/payments`
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub group_id: Option<i64>,
    pub amount: i64,
    /// 없으면 오늘
    pub paid_at: Option<String>,
    pub period_month: Option<String>,
    pub method: Option<PaymentMethod>,
    pub comment: Option<String>,
}

/// 결제 목록 필터: `GET /api/v1/payments?student_id=1&group_id=2&from=...&to=...`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PaymentListQuery {
    pub student_id: Option<i64>,
    pub group_id: Option<i64>,
    pub from: Option<String>,
    pub to: Option<String>,
}
