//! # 休暇残高
//!
//! 社員ごとの休暇残日数を管理する。休暇申請の最終承認時に
//! 申請日数分を控除する。控除は承認と同一トランザクション内で行い、
//! 残高不足時はトランザクションごと巻き戻す。

use async_trait::async_trait;
use kessaiflow_domain::{employee::EmployeeId, value_objects::VacationDays};

use crate::{db::TxContext, error::InfraError};

/// 休暇残高のポート
#[async_trait]
pub trait LeaveBalance: Send + Sync {
    /// 休暇残日数から指定日数を控除する
    ///
    /// # エラー
    ///
    /// 残高レコードが存在しない、または残日数が不足している場合は
    /// `InfraErrorKind::Rejected` を返す。
    async fn deduct(
        &self,
        tx: &mut TxContext,
        employee_id: &EmployeeId,
        days: VacationDays,
    ) -> Result<(), InfraError>;
}

/// PostgreSQL 実装
pub struct PostgresLeaveBalance;

impl PostgresLeaveBalance {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresLeaveBalance {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LeaveBalance for PostgresLeaveBalance {
    #[tracing::instrument(skip_all, level = "debug", fields(%employee_id, %days))]
    async fn deduct(
        &self,
        tx: &mut TxContext,
        employee_id: &EmployeeId,
        days: VacationDays,
    ) -> Result<(), InfraError> {
        // 残高チェックと控除を 1 文で行い、競合時の二重控除を防ぐ
        let result = sqlx::query(
            r#"
            UPDATE leave_balances
            SET remaining_days = remaining_days - $1, updated_at = now()
            WHERE employee_id = $2 AND remaining_days >= $1
            "#,
        )
        .bind(days.as_f64())
        .bind(employee_id.as_uuid())
        .execute(tx.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::rejected(format!(
                "休暇残日数が不足しています: 申請 {} 日",
                days
            )));
        }

        Ok(())
    }
}
