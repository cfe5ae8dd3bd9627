//! # カレンダー
//!
//! 休暇申請の最終承認時に、申請者のカレンダーへ休暇予定を登録する。
//! 承認と同一トランザクション内で実行する。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kessaiflow_domain::employee::EmployeeId;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// カレンダー予定の登録パラメータ
#[derive(Debug, Clone)]
pub struct NewCalendarEvent {
    pub employee_id: EmployeeId,
    pub title: String,
    pub category: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// カレンダー登録のポート
#[async_trait]
pub trait Calendar: Send + Sync {
    /// 予定を 1 件登録する
    async fn create_event(
        &self,
        tx: &mut TxContext,
        event: NewCalendarEvent,
    ) -> Result<(), InfraError>;
}

/// PostgreSQL 実装
pub struct PostgresCalendar;

impl PostgresCalendar {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresCalendar {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Calendar for PostgresCalendar {
    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(employee_id = %event.employee_id, title = %event.title)
    )]
    async fn create_event(
        &self,
        tx: &mut TxContext,
        event: NewCalendarEvent,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO calendar_events (
                id, employee_id, title, category, starts_at, ends_at, note, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(event.employee_id.as_uuid())
        .bind(&event.title)
        .bind(&event.category)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(&event.note)
        .execute(tx.conn())
        .await?;

        Ok(())
    }
}
