//! ReferenceRepository: 参照者の永続化

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kessaiflow_domain::{
    approval::{
        ApprovalDocumentId,
        ApprovalReference,
        ApprovalReferenceId,
        ApprovalReferenceRecord,
    },
    employee::EmployeeId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// ReferenceRepository トレイト
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    /// 参照者一式をまとめて挿入する（文書作成時）
    async fn insert_batch(
        &self,
        tx: &mut TxContext,
        references: &[ApprovalReference],
    ) -> Result<(), InfraError>;

    /// 初回閲覧日時を更新する
    async fn update_viewed(
        &self,
        tx: &mut TxContext,
        reference: &ApprovalReference,
    ) -> Result<(), InfraError>;

    /// 文書 ID で参照者一覧を取得する
    async fn find_by_document(
        &self,
        document_id: &ApprovalDocumentId,
    ) -> Result<Vec<ApprovalReference>, InfraError>;

    /// 複数文書の参照者をまとめて取得する（回覧ビューのバッチ結合用）
    async fn find_by_documents(
        &self,
        document_ids: &[ApprovalDocumentId],
    ) -> Result<Vec<ApprovalReference>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct ReferenceRow {
    id: Uuid,
    document_id: Uuid,
    employee_id: Uuid,
    viewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ReferenceRow> for ApprovalReference {
    fn from(row: ReferenceRow) -> Self {
        ApprovalReference::from_db(ApprovalReferenceRecord {
            id: ApprovalReferenceId::from_uuid(row.id),
            document_id: ApprovalDocumentId::from_uuid(row.document_id),
            employee_id: EmployeeId::from_uuid(row.employee_id),
            viewed_at: row.viewed_at,
            created_at: row.created_at,
        })
    }
}

const SELECT_REFERENCE: &str = r#"
SELECT id, document_id, employee_id, viewed_at, created_at
FROM approval_references
"#;

/// PostgreSQL 実装
pub struct PostgresReferenceRepository {
    pool: PgPool,
}

impl PostgresReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferenceRepository for PostgresReferenceRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(count = references.len()))]
    async fn insert_batch(
        &self,
        tx: &mut TxContext,
        references: &[ApprovalReference],
    ) -> Result<(), InfraError> {
        for reference in references {
            sqlx::query(
                r#"
                INSERT INTO approval_references (
                    id, document_id, employee_id, viewed_at, created_at
                )
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(reference.id().as_uuid())
            .bind(reference.document_id().as_uuid())
            .bind(reference.employee_id().as_uuid())
            .bind(reference.viewed_at())
            .bind(reference.created_at())
            .execute(tx.conn())
            .await?;
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(reference_id = %reference.id()))]
    async fn update_viewed(
        &self,
        tx: &mut TxContext,
        reference: &ApprovalReference,
    ) -> Result<(), InfraError> {
        sqlx::query("UPDATE approval_references SET viewed_at = $1 WHERE id = $2")
            .bind(reference.viewed_at())
            .bind(reference.id().as_uuid())
            .execute(tx.conn())
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%document_id))]
    async fn find_by_document(
        &self,
        document_id: &ApprovalDocumentId,
    ) -> Result<Vec<ApprovalReference>, InfraError> {
        let sql = format!("{SELECT_REFERENCE} WHERE document_id = $1 ORDER BY created_at");
        let rows = sqlx::query_as::<_, ReferenceRow>(&sql)
            .bind(document_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ApprovalReference::from).collect())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(count = document_ids.len()))]
    async fn find_by_documents(
        &self,
        document_ids: &[ApprovalDocumentId],
    ) -> Result<Vec<ApprovalReference>, InfraError> {
        let ids: Vec<Uuid> = document_ids.iter().map(|id| *id.as_uuid()).collect();
        let sql = format!("{SELECT_REFERENCE} WHERE document_id = ANY($1) ORDER BY created_at");
        let rows = sqlx::query_as::<_, ReferenceRow>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ApprovalReference::from).collect())
    }
}
