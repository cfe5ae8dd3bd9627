//! # コードカタログ
//!
//! ステータス・テンプレート・休暇種別のコードマスタを解決する。
//! コードマスタの管理（CRUD）は別システムの責務で、ここでは読み取りのみ。

use async_trait::async_trait;
use kessaiflow_domain::code::{CodeId, CodePrefix, CodeRef, TemplateDescriptor, TemplateKind};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// コードカタログの解決ポート
#[async_trait]
pub trait CodeCatalog: Send + Sync {
    /// プレフィックスと値でコードを解決する
    async fn resolve(
        &self,
        prefix: CodePrefix,
        value: &str,
    ) -> Result<Option<CodeRef>, InfraError>;

    /// ID でコードを解決する
    async fn resolve_by_id(&self, id: &CodeId) -> Result<Option<CodeRef>, InfraError>;

    /// ID でテンプレート記述子を解決する
    ///
    /// template プレフィックス以外のコードだった場合は None を返す。
    async fn resolve_template(
        &self,
        id: &CodeId,
    ) -> Result<Option<TemplateDescriptor>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct CodeRow {
    id: Uuid,
    prefix: String,
    value: String,
    name: String,
}

impl TryFrom<CodeRow> for CodeRef {
    type Error = InfraError;

    fn try_from(row: CodeRow) -> Result<Self, Self::Error> {
        let prefix = row
            .prefix
            .parse::<CodePrefix>()
            .map_err(|e| InfraError::invalid_data(e.to_string()))?;

        Ok(CodeRef::new(
            CodeId::from_uuid(row.id),
            prefix,
            row.value,
            row.name,
        ))
    }
}

const SELECT_CODE: &str = "SELECT id, prefix, value, name FROM codes";

/// PostgreSQL 実装
pub struct PostgresCodeCatalog {
    pool: PgPool,
}

impl PostgresCodeCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CodeCatalog for PostgresCodeCatalog {
    #[tracing::instrument(skip_all, level = "debug", fields(%prefix, value))]
    async fn resolve(
        &self,
        prefix: CodePrefix,
        value: &str,
    ) -> Result<Option<CodeRef>, InfraError> {
        let prefix_str: &str = prefix.into();
        let sql = format!("{SELECT_CODE} WHERE prefix = $1 AND value = $2");
        let row = sqlx::query_as::<_, CodeRow>(&sql)
            .bind(prefix_str)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(CodeRef::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn resolve_by_id(&self, id: &CodeId) -> Result<Option<CodeRef>, InfraError> {
        let sql = format!("{SELECT_CODE} WHERE id = $1");
        let row = sqlx::query_as::<_, CodeRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(CodeRef::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn resolve_template(
        &self,
        id: &CodeId,
    ) -> Result<Option<TemplateDescriptor>, InfraError> {
        let Some(code) = self.resolve_by_id(id).await? else {
            return Ok(None);
        };

        if code.prefix() != CodePrefix::Template {
            return Ok(None);
        }

        let kind = code
            .value()
            .parse::<TemplateKind>()
            .map_err(|e| InfraError::invalid_data(e.to_string()))?;

        Ok(Some(TemplateDescriptor::new(
            code.id().clone(),
            kind,
            code.name().to_string(),
        )))
    }
}
