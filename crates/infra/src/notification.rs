//! # 通知
//!
//! 社員への業務通知を送信する。現在の実装は notifications テーブルへの
//! 挿入で、画面側がポーリングして表示する方式。
//!
//! 通知はベストエフォートであり、送信失敗が決裁処理を巻き戻すことはない。
//! 失敗の扱い（ログ出力して続行）はユースケース層の責務。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kessaiflow_domain::{employee::EmployeeId, value_objects::OwnerKind};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// 通知メッセージ
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub recipient_id: EmployeeId,
    pub owner_kind: OwnerKind,
    pub url: String,
    pub title: String,
    pub body: String,
}

/// 通知送信ポート
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 通知を 1 件送信する
    async fn notify(&self, message: NotificationMessage, now: DateTime<Utc>)
    -> Result<(), InfraError>;
}

/// PostgreSQL 実装（テーブル挿入方式）
pub struct PostgresNotifier {
    pool: PgPool,
}

impl PostgresNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for PostgresNotifier {
    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(recipient_id = %message.recipient_id, title = %message.title)
    )]
    async fn notify(
        &self,
        message: NotificationMessage,
        now: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        let owner_kind: &str = message.owner_kind.into();
        sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient_id, owner_kind, url, title, body, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(message.recipient_id.as_uuid())
        .bind(owner_kind)
        .bind(&message.url)
        .bind(&message.title)
        .bind(&message.body)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// 何もしない実装（通知ストアなしで配線する場合に使う）
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(
        &self,
        _message: NotificationMessage,
        _now: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        Ok(())
    }
}
