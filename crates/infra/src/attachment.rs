//! # 添付ファイル
//!
//! 決裁文書に紐づく添付ファイルのメタデータを管理する。
//! ファイル本体は外部のオブジェクトストレージが保持し、
//! ここではメタデータ（ファイル名・サイズ）のみを扱う。
//!
//! 添付の登録失敗は文書作成を巻き戻さない（ベストエフォート）。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kessaiflow_domain::value_objects::OwnerKind;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// 添付ファイルのメタデータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: Uuid,
    pub owner_kind: OwnerKind,
    pub owner_id: Uuid,
    pub file_name: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

/// 添付ファイルの登録パラメータ
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub owner_kind: OwnerKind,
    pub owner_id: Uuid,
    pub file_name: String,
    pub size_bytes: i64,
}

/// 添付ファイルストアのポート
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// 添付ファイルのメタデータを登録する
    async fn upload(
        &self,
        attachment: NewAttachment,
        now: DateTime<Utc>,
    ) -> Result<Attachment, InfraError>;

    /// 所有エンティティに紐づく添付ファイル一覧を取得する
    async fn list(
        &self,
        owner_kind: OwnerKind,
        owner_id: &Uuid,
    ) -> Result<Vec<Attachment>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct AttachmentRow {
    id: Uuid,
    owner_kind: String,
    owner_id: Uuid,
    file_name: String,
    size_bytes: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<AttachmentRow> for Attachment {
    type Error = InfraError;

    fn try_from(row: AttachmentRow) -> Result<Self, Self::Error> {
        Ok(Attachment {
            id: row.id,
            owner_kind: row
                .owner_kind
                .parse::<OwnerKind>()
                .map_err(|e| InfraError::invalid_data(e.to_string()))?,
            owner_id: row.owner_id,
            file_name: row.file_name,
            size_bytes: row.size_bytes,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL 実装（メタデータのみ）
pub struct PostgresAttachmentStore {
    pool: PgPool,
}

impl PostgresAttachmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttachmentStore for PostgresAttachmentStore {
    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(owner_id = %attachment.owner_id, file_name = %attachment.file_name)
    )]
    async fn upload(
        &self,
        attachment: NewAttachment,
        now: DateTime<Utc>,
    ) -> Result<Attachment, InfraError> {
        let id = Uuid::now_v7();
        let owner_kind: &str = attachment.owner_kind.into();
        sqlx::query(
            r#"
            INSERT INTO attachments (id, owner_kind, owner_id, file_name, size_bytes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(owner_kind)
        .bind(attachment.owner_id)
        .bind(&attachment.file_name)
        .bind(attachment.size_bytes)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Attachment {
            id,
            owner_kind: attachment.owner_kind,
            owner_id: attachment.owner_id,
            file_name: attachment.file_name,
            size_bytes: attachment.size_bytes,
            created_at: now,
        })
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%owner_kind, %owner_id))]
    async fn list(
        &self,
        owner_kind: OwnerKind,
        owner_id: &Uuid,
    ) -> Result<Vec<Attachment>, InfraError> {
        let owner_kind: &str = owner_kind.into();
        let rows = sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT id, owner_kind, owner_id, file_name, size_bytes, created_at
            FROM attachments
            WHERE owner_kind = $1 AND owner_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(owner_kind)
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Attachment::try_from).collect()
    }
}

// Send + Sync 検証
#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        assert_send_sync::<Box<dyn AttachmentStore>>();
    }
}
