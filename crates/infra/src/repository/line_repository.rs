//! LineRepository: 決裁ラインの永続化
//!
//! 文書内の順序付き承認ステップを管理する。一覧ビューのための
//! 複数文書バルク取得もここに置く。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kessaiflow_domain::{
    approval::{
        ApprovalDocumentId,
        ApprovalLine,
        ApprovalLineId,
        ApprovalLineRecord,
        LineStatus,
    },
    employee::EmployeeId,
    value_objects::StepOrder,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// LineRepository トレイト
#[async_trait]
pub trait LineRepository: Send + Sync {
    /// ライン一式をまとめて挿入する（文書作成時）
    async fn insert_batch(
        &self,
        tx: &mut TxContext,
        lines: &[ApprovalLine],
    ) -> Result<(), InfraError>;

    /// ラインの判断結果を更新する
    async fn update(&self, tx: &mut TxContext, line: &ApprovalLine) -> Result<(), InfraError>;

    /// ID でラインを検索する
    async fn find_by_id(&self, id: &ApprovalLineId) -> Result<Option<ApprovalLine>, InfraError>;

    /// 文書 ID でライン一覧を取得する（順序昇順）
    async fn find_by_document(
        &self,
        document_id: &ApprovalDocumentId,
    ) -> Result<Vec<ApprovalLine>, InfraError>;

    /// 複数文書のラインをまとめて取得する（一覧ビューのバッチ結合用）
    async fn find_by_documents(
        &self,
        document_ids: &[ApprovalDocumentId],
    ) -> Result<Vec<ApprovalLine>, InfraError>;

    /// 文書内の指定順序のラインを検索する（次ライン活性化用）
    async fn find_by_document_and_order(
        &self,
        document_id: &ApprovalDocumentId,
        order: StepOrder,
    ) -> Result<Option<ApprovalLine>, InfraError>;

    /// 承認者でラインを検索する（承認待ちビューの自ライン解決用）
    async fn find_by_document_and_approver(
        &self,
        document_id: &ApprovalDocumentId,
        approver_id: &EmployeeId,
    ) -> Result<Option<ApprovalLine>, InfraError>;
}

/// DB の approval_lines テーブルの行を表す中間構造体
#[derive(sqlx::FromRow)]
struct LineRow {
    id: Uuid,
    document_id: Uuid,
    approver_id: Uuid,
    step_order: i32,
    status: String,
    comment: Option<String>,
    decided_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LineRow> for ApprovalLine {
    type Error = InfraError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        ApprovalLine::from_db(ApprovalLineRecord {
            id: ApprovalLineId::from_uuid(row.id),
            document_id: ApprovalDocumentId::from_uuid(row.document_id),
            approver_id: EmployeeId::from_uuid(row.approver_id),
            order: StepOrder::new(row.step_order)
                .map_err(|e| InfraError::invalid_data(e.to_string()))?,
            status: row
                .status
                .parse::<LineStatus>()
                .map_err(|e| InfraError::invalid_data(e.to_string()))?,
            comment: row.comment,
            decided_at: row.decided_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .map_err(|e| InfraError::invalid_data(e.to_string()))
    }
}

const SELECT_LINE: &str = r#"
SELECT id, document_id, approver_id, step_order, status, comment,
       decided_at, created_at, updated_at
FROM approval_lines
"#;

/// PostgreSQL 実装
pub struct PostgresLineRepository {
    pool: PgPool,
}

impl PostgresLineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LineRepository for PostgresLineRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(count = lines.len()))]
    async fn insert_batch(
        &self,
        tx: &mut TxContext,
        lines: &[ApprovalLine],
    ) -> Result<(), InfraError> {
        for line in lines {
            let status: &str = line.status().into();
            sqlx::query(
                r#"
                INSERT INTO approval_lines (
                    id, document_id, approver_id, step_order, status, comment,
                    decided_at, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(line.id().as_uuid())
            .bind(line.document_id().as_uuid())
            .bind(line.approver_id().as_uuid())
            .bind(line.order().as_i32())
            .bind(status)
            .bind(line.comment())
            .bind(line.decided_at())
            .bind(line.created_at())
            .bind(line.updated_at())
            .execute(tx.conn())
            .await?;
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(line_id = %line.id()))]
    async fn update(&self, tx: &mut TxContext, line: &ApprovalLine) -> Result<(), InfraError> {
        let status: &str = line.status().into();
        sqlx::query(
            r#"
            UPDATE approval_lines SET
                status = $1,
                comment = $2,
                decided_at = $3,
                updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(status)
        .bind(line.comment())
        .bind(line.decided_at())
        .bind(line.updated_at())
        .bind(line.id().as_uuid())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &ApprovalLineId) -> Result<Option<ApprovalLine>, InfraError> {
        let sql = format!("{SELECT_LINE} WHERE id = $1");
        let row = sqlx::query_as::<_, LineRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ApprovalLine::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%document_id))]
    async fn find_by_document(
        &self,
        document_id: &ApprovalDocumentId,
    ) -> Result<Vec<ApprovalLine>, InfraError> {
        let sql = format!("{SELECT_LINE} WHERE document_id = $1 ORDER BY step_order ASC");
        let rows = sqlx::query_as::<_, LineRow>(&sql)
            .bind(document_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ApprovalLine::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(count = document_ids.len()))]
    async fn find_by_documents(
        &self,
        document_ids: &[ApprovalDocumentId],
    ) -> Result<Vec<ApprovalLine>, InfraError> {
        let ids: Vec<Uuid> = document_ids.iter().map(|id| *id.as_uuid()).collect();
        let sql =
            format!("{SELECT_LINE} WHERE document_id = ANY($1) ORDER BY document_id, step_order");
        let rows = sqlx::query_as::<_, LineRow>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ApprovalLine::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%document_id, %order))]
    async fn find_by_document_and_order(
        &self,
        document_id: &ApprovalDocumentId,
        order: StepOrder,
    ) -> Result<Option<ApprovalLine>, InfraError> {
        let sql = format!("{SELECT_LINE} WHERE document_id = $1 AND step_order = $2");
        let row = sqlx::query_as::<_, LineRow>(&sql)
            .bind(document_id.as_uuid())
            .bind(order.as_i32())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ApprovalLine::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%document_id, %approver_id))]
    async fn find_by_document_and_approver(
        &self,
        document_id: &ApprovalDocumentId,
        approver_id: &EmployeeId,
    ) -> Result<Option<ApprovalLine>, InfraError> {
        let sql = format!(
            "{SELECT_LINE} WHERE document_id = $1 AND approver_id = $2 ORDER BY step_order LIMIT 1"
        );
        let row = sqlx::query_as::<_, LineRow>(&sql)
            .bind(document_id.as_uuid())
            .bind(approver_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ApprovalLine::try_from).transpose()
    }
}
