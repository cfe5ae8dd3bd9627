//! EmployeeRepository: 社員ディレクトリの読み取り
//!
//! 社員情報は人事マスタが所有するため、このリポジトリは読み取り専用。

use async_trait::async_trait;
use kessaiflow_domain::employee::{Email, Employee, EmployeeId, EmployeeName};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// EmployeeRepository トレイト
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// ID で社員を検索する
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, InfraError>;

    /// ログイン名で社員を検索する
    async fn find_by_username(&self, username: &str) -> Result<Option<Employee>, InfraError>;

    /// 複数 ID で社員をまとめて取得する（一覧ビューの氏名解決用）
    async fn find_by_ids(&self, ids: &[EmployeeId]) -> Result<Vec<Employee>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct EmployeeRow {
    id: Uuid,
    username: String,
    name: String,
    email: String,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = InfraError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        Ok(Employee::new(
            EmployeeId::from_uuid(row.id),
            row.username,
            EmployeeName::new(row.name).map_err(|e| InfraError::invalid_data(e.to_string()))?,
            Email::new(row.email).map_err(|e| InfraError::invalid_data(e.to_string()))?,
        ))
    }
}

const SELECT_EMPLOYEE: &str = "SELECT id, username, name, email FROM employees";

/// PostgreSQL 実装
pub struct PostgresEmployeeRepository {
    pool: PgPool,
}

impl PostgresEmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeRepository for PostgresEmployeeRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, InfraError> {
        let sql = format!("{SELECT_EMPLOYEE} WHERE id = $1");
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Employee::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(username))]
    async fn find_by_username(&self, username: &str) -> Result<Option<Employee>, InfraError> {
        let sql = format!("{SELECT_EMPLOYEE} WHERE username = $1");
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Employee::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[EmployeeId]) -> Result<Vec<Employee>, InfraError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let sql = format!("{SELECT_EMPLOYEE} WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(&uuids)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Employee::try_from).collect()
    }
}

// Send + Sync 検証
#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        assert_send_sync::<Box<dyn EmployeeRepository>>();
    }
}
