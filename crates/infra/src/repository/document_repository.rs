//! DocumentRepository: 決裁文書の永続化
//!
//! 決裁文書本体の CRUD と、4 つの一覧ビュー（承認待ち・起案・参照・完了）の
//! ページ付きクエリを提供する。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kessaiflow_domain::{
    approval::{ApprovalDocument, ApprovalDocumentId, ApprovalDocumentRecord, DocumentStatus},
    code::{CodeId, CodePrefix, CodeRef, TemplateDescriptor, TemplateKind},
    employee::EmployeeId,
    value_objects::DocumentTitle,
};
use kessaiflow_shared::{Page, PageRequest};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::TxContext,
    error::InfraError,
};

/// DocumentRepository トレイト
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// 新規文書を挿入する
    async fn insert(
        &self,
        tx: &mut TxContext,
        document: &ApprovalDocument,
    ) -> Result<(), InfraError>;

    /// 文書のステータス・確定日時・更新者を更新する
    async fn update_status(
        &self,
        tx: &mut TxContext,
        document: &ApprovalDocument,
    ) -> Result<(), InfraError>;

    /// ID で文書を検索する
    async fn find_by_id(
        &self,
        id: &ApprovalDocumentId,
    ) -> Result<Option<ApprovalDocument>, InfraError>;

    /// 起案者で文書一覧を取得する（起案一覧用）
    async fn find_page_by_creator(
        &self,
        creator_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<ApprovalDocument>, InfraError>;

    /// 承認者として関与する進行中の文書一覧を取得する（承認待ち一覧用）
    async fn find_page_in_progress_by_approver(
        &self,
        approver_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<ApprovalDocument>, InfraError>;

    /// 参照者として登録されている文書一覧を取得する（参照一覧用）
    async fn find_page_by_reference(
        &self,
        employee_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<ApprovalDocument>, InfraError>;

    /// 判断者として関与した確定済みの文書一覧を取得する（完了一覧用）
    async fn find_page_terminal_by_decider(
        &self,
        decider_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<ApprovalDocument>, InfraError>;
}

/// DB の approval_documents テーブルの行を表す中間構造体
///
/// テンプレートと休暇種別のコードを JOIN で引き、`TryFrom` で
/// `ApprovalDocument` への変換ロジックを一箇所に集約する。
#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    title: String,
    content: String,
    created_by: Uuid,
    template_id: Uuid,
    template_kind: String,
    template_name: String,
    status: String,
    vacation_type_id: Option<Uuid>,
    vacation_type_value: Option<String>,
    vacation_type_name: Option<String>,
    vacation_days: Option<f64>,
    trip_location: Option<String>,
    trip_transportation: Option<String>,
    trip_purpose: Option<String>,
    trip_remark: Option<String>,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    decided_at: Option<DateTime<Utc>>,
    updated_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for ApprovalDocument {
    type Error = InfraError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let template_kind = row
            .template_kind
            .parse::<TemplateKind>()
            .map_err(|e| InfraError::invalid_data(e.to_string()))?;

        let vacation_type = match (row.vacation_type_id, row.vacation_type_value) {
            (Some(id), Some(value)) => Some(CodeRef::new(
                CodeId::from_uuid(id),
                CodePrefix::VacationType,
                value,
                row.vacation_type_name.unwrap_or_default(),
            )),
            _ => None,
        };

        ApprovalDocument::from_db(ApprovalDocumentRecord {
            id: ApprovalDocumentId::from_uuid(row.id),
            title: DocumentTitle::new(row.title)
                .map_err(|e| InfraError::invalid_data(e.to_string()))?,
            content: row.content,
            created_by: EmployeeId::from_uuid(row.created_by),
            template: TemplateDescriptor::new(
                CodeId::from_uuid(row.template_id),
                template_kind,
                row.template_name,
            ),
            status: row
                .status
                .parse::<DocumentStatus>()
                .map_err(|e| InfraError::invalid_data(e.to_string()))?,
            vacation_type,
            vacation_days: row.vacation_days,
            trip_location: row.trip_location,
            trip_transportation: row.trip_transportation,
            trip_purpose: row.trip_purpose,
            trip_remark: row.trip_remark,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            decided_at: row.decided_at,
            updated_by: EmployeeId::from_uuid(row.updated_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .map_err(|e| InfraError::invalid_data(e.to_string()))
    }
}

/// 一覧クエリ共通の SELECT 句
const SELECT_DOCUMENT: &str = r#"
SELECT
    d.id, d.title, d.content, d.created_by,
    d.template_id, d.template_kind, t.name AS template_name,
    d.status,
    d.vacation_type_id, vt.value AS vacation_type_value, vt.name AS vacation_type_name,
    d.vacation_days,
    d.trip_location, d.trip_transportation, d.trip_purpose, d.trip_remark,
    d.starts_at, d.ends_at, d.decided_at,
    d.updated_by, d.created_at, d.updated_at
FROM approval_documents d
JOIN codes t ON t.id = d.template_id
LEFT JOIN codes vt ON vt.id = d.vacation_type_id
"#;

/// PostgreSQL 実装
pub struct PostgresDocumentRepository {
    pool: PgPool,
}

impl PostgresDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 一覧ビュー共通のページ付き取得
    async fn fetch_page(
        &self,
        condition: &str,
        employee_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<ApprovalDocument>, InfraError> {
        let list_sql = format!(
            "{SELECT_DOCUMENT} WHERE {condition} ORDER BY d.created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&list_sql)
            .bind(employee_id.as_uuid())
            .bind(i64::from(page.limit()))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let count_sql =
            format!("SELECT COUNT(*) FROM approval_documents d WHERE {condition}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(employee_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(ApprovalDocument::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, total as u64))
    }
}

#[async_trait]
impl DocumentRepository for PostgresDocumentRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(document_id = %document.id()))]
    async fn insert(
        &self,
        tx: &mut TxContext,
        document: &ApprovalDocument,
    ) -> Result<(), InfraError> {
        use kessaiflow_domain::approval::TemplateDetail;

        let status: &str = document.status().into();
        let template_kind: &str = document.template().kind().into();

        let (vacation_type_id, vacation_days, starts_at, ends_at) = match document.detail() {
            TemplateDetail::Vacation(v) => (
                v.vacation_type().map(|c| *c.id().as_uuid()),
                Some(v.days().as_f64()),
                Some(v.starts_at()),
                Some(v.ends_at()),
            ),
            TemplateDetail::BusinessTrip(t) => (None, None, Some(t.starts_at()), Some(t.ends_at())),
            TemplateDetail::General => (None, None, None, None),
        };
        let (trip_location, trip_transportation, trip_purpose, trip_remark) =
            match document.detail() {
                TemplateDetail::BusinessTrip(t) => (
                    Some(t.location()),
                    Some(t.transportation()),
                    t.purpose(),
                    t.remark(),
                ),
                _ => (None, None, None, None),
            };

        sqlx::query(
            r#"
            INSERT INTO approval_documents (
                id, title, content, created_by, template_id, template_kind, status,
                vacation_type_id, vacation_days,
                trip_location, trip_transportation, trip_purpose, trip_remark,
                starts_at, ends_at, decided_at,
                updated_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(document.id().as_uuid())
        .bind(document.title().as_str())
        .bind(document.content())
        .bind(document.created_by().as_uuid())
        .bind(document.template().id().as_uuid())
        .bind(template_kind)
        .bind(status)
        .bind(vacation_type_id)
        .bind(vacation_days)
        .bind(trip_location)
        .bind(trip_transportation)
        .bind(trip_purpose)
        .bind(trip_remark)
        .bind(starts_at)
        .bind(ends_at)
        .bind(document.decided_at())
        .bind(document.updated_by().as_uuid())
        .bind(document.created_at())
        .bind(document.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(document_id = %document.id()))]
    async fn update_status(
        &self,
        tx: &mut TxContext,
        document: &ApprovalDocument,
    ) -> Result<(), InfraError> {
        let status: &str = document.status().into();
        sqlx::query(
            r#"
            UPDATE approval_documents SET
                status = $1,
                decided_at = $2,
                updated_by = $3,
                updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(status)
        .bind(document.decided_at())
        .bind(document.updated_by().as_uuid())
        .bind(document.updated_at())
        .bind(document.id().as_uuid())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(
        &self,
        id: &ApprovalDocumentId,
    ) -> Result<Option<ApprovalDocument>, InfraError> {
        let sql = format!("{SELECT_DOCUMENT} WHERE d.id = $1");
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ApprovalDocument::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%creator_id))]
    async fn find_page_by_creator(
        &self,
        creator_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<ApprovalDocument>, InfraError> {
        self.fetch_page("d.created_by = $1", creator_id, page).await
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%approver_id))]
    async fn find_page_in_progress_by_approver(
        &self,
        approver_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<ApprovalDocument>, InfraError> {
        self.fetch_page(
            "d.status = 'in_progress' AND EXISTS (
                SELECT 1 FROM approval_lines l
                WHERE l.document_id = d.id AND l.approver_id = $1
            )",
            approver_id,
            page,
        )
        .await
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%employee_id))]
    async fn find_page_by_reference(
        &self,
        employee_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<ApprovalDocument>, InfraError> {
        self.fetch_page(
            "EXISTS (
                SELECT 1 FROM approval_references r
                WHERE r.document_id = d.id AND r.employee_id = $1
            )",
            employee_id,
            page,
        )
        .await
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%decider_id))]
    async fn find_page_terminal_by_decider(
        &self,
        decider_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<ApprovalDocument>, InfraError> {
        self.fetch_page(
            "d.status IN ('approved', 'rejected') AND EXISTS (
                SELECT 1 FROM approval_lines l
                WHERE l.document_id = d.id
                  AND l.approver_id = $1
                  AND l.status IN ('approved', 'rejected')
            )",
            decider_id,
            page,
        )
        .await
    }
}
