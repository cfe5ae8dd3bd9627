//! # 勤怠
//!
//! 休暇申請の最終承認時に、期間中の各暦日へ休暇マークを記録する。
//! 承認と同一トランザクション内で実行する。

use async_trait::async_trait;
use chrono::NaiveDate;
use kessaiflow_domain::{code::VacationKind, employee::EmployeeId};
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// 勤怠記録のポート
#[async_trait]
pub trait Attendance: Send + Sync {
    /// 指定日を休暇としてマークする
    ///
    /// 同一社員・同一日のレコードが既にある場合は休暇サブタイプを上書きする。
    async fn mark_on_leave(
        &self,
        tx: &mut TxContext,
        employee_id: &EmployeeId,
        date: NaiveDate,
        kind: VacationKind,
    ) -> Result<(), InfraError>;
}

/// PostgreSQL 実装
pub struct PostgresAttendance;

impl PostgresAttendance {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresAttendance {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Attendance for PostgresAttendance {
    #[tracing::instrument(skip_all, level = "debug", fields(%employee_id, %date, %kind))]
    async fn mark_on_leave(
        &self,
        tx: &mut TxContext,
        employee_id: &EmployeeId,
        date: NaiveDate,
        kind: VacationKind,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO attendance_records (id, employee_id, work_date, status, created_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (employee_id, work_date)
            DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(employee_id.as_uuid())
        .bind(date)
        .bind(kind.to_string())
        .execute(tx.conn())
        .await?;

        Ok(())
    }
}
