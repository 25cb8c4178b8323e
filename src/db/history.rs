//! # 그룹 이력 데이터베이스 쿼리 모듈
//!
//! `group_history` 테이블은 **추가 전용(append-only)** 입니다.
//! 이 모듈에는 INSERT와 SELECT만 있고, UPDATE/DELETE 쿼리는 없습니다.
//! (그룹이 삭제되면 `ON DELETE CASCADE`로 함께 지워지는 것이 유일한 예외)
//!
//! ## GroupAudit: 변경과 이력을 하나의 트랜잭션으로
//! 그룹을 바꾸는 모든 작업은 `GroupAudit`을 통해 실행합니다.
//! ```text
//! let mut audit = GroupAudit::begin(pool, actor).await?;
//! sqlx::query("UPDATE study_groups ...").execute(audit.conn()).await?;
//! audit.record(group_id, history_format::status_changed(old, new)).await?;
//! audit.commit().await?;   // 이력이 0건이면 커밋을 거부하고 롤백
//! ```
//! 변경 쿼리와 이력 INSERT가 같은 트랜잭션 안에 있으므로
//! "변경은 됐는데 이력이 없는" 상태가 생기지 않습니다.

use crate::error::AppError;
use crate::models::{Actor, GroupHistoryEntry, HistoryDraft};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

/// 요약 패널에 보여줄 최근 이력 기본 개수
pub const RECENT_HISTORY_LIMIT: i64 = 4;

/// 이력 항목 하나를 추가하고 새 행의 id를 반환합니다.
///
/// 중복 제거나 빈도 제한은 하지 않습니다. 같은 내용이라도 호출할 때마다 새 행이 생깁니다.
/// `user_name`은 호출 시점의 이름을 그대로 복사해 저장합니다.
pub async fn add_group_history_entry(
    conn: &mut SqliteConnection,
    group_id: i64,
    draft: &HistoryDraft,
    actor: &Actor,
) -> Result<i64, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO group_history
            (group_id, action_type, action_description, old_value, new_value, user_id, user_name)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(group_id)
    .bind(draft.action)
    .bind(&draft.description)
    .bind(&draft.old_value)
    .bind(&draft.new_value)
    .bind(actor.user_id)
    .bind(&actor.user_name)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// 그룹 이력을 최신순으로 조회합니다.
///
/// `limit`이 None이면 전체를 반환합니다.
/// (SQLite에서 `LIMIT -1`은 "제한 없음"을 의미합니다)
pub async fn get_group_history(
    pool: &SqlitePool,
    group_id: i64,
    limit: Option<i64>,
) -> Result<Vec<GroupHistoryEntry>, AppError> {
    let entries = sqlx::query_as::<_, GroupHistoryEntry>(
        r#"
        SELECT id, group_id, action_type, action_description, old_value, new_value,
               user_id, user_name, created_at
        FROM group_history
        WHERE group_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(group_id)
    .bind(limit.filter(|l| *l > 0).unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// 요약 패널용 최근 이력 (기본 4건)
pub async fn get_recent_group_history(
    pool: &SqlitePool,
    group_id: i64,
    limit: Option<i64>,
) -> Result<Vec<GroupHistoryEntry>, AppError> {
    get_group_history(pool, group_id, Some(limit.unwrap_or(RECENT_HISTORY_LIMIT))).await
}

/// 그룹 변경 + 이력 기록을 묶는 트랜잭션 가드
///
/// - `conn()`으로 얻은 연결에서 변경 쿼리를 실행합니다.
/// - `record()`로 이력을 남깁니다.
/// - `commit()`은 이력이 한 건 이상 기록된 경우에만 커밋합니다.
///
/// 커밋하지 않고 drop되면 sqlx의 `Transaction`이 자동으로 롤백합니다.
pub struct GroupAudit<'a> {
    tx: Transaction<'static, Sqlite>,
    actor: &'a Actor,
    recorded: usize,
}

impl<'a> GroupAudit<'a> {
    pub async fn begin(pool: &SqlitePool, actor: &'a Actor) -> Result<Self, AppError> {
        Ok(Self {
            tx: pool.begin().await?,
            actor,
            recorded: 0,
        })
    }

    /// 트랜잭션 안의 연결. 변경 쿼리는 반드시 이 연결에서 실행해야 합니다.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub async fn record(&mut self, group_id: i64, draft: HistoryDraft) -> Result<i64, AppError> {
        let id = add_group_history_entry(&mut self.tx, group_id, &draft, self.actor).await?;
        self.recorded += 1;
        Ok(id)
    }

    /// 커밋하고 기록된 이력 수를 반환합니다.
    pub async fn commit(self) -> Result<usize, AppError> {
        if self.recorded == 0 {
            self.tx.rollback().await?;
            return Err(AppError::Internal(
                "group mutation attempted without a history entry".to_string(),
            ));
        }
        self.tx.commit().await?;
        Ok(self.recorded)
    }
}
