//! # 決裁ライン
//!
//! 決裁文書内の順序付き承認ステップを管理する。
//! 承認者への割り当てと判断結果を保持し、承認・却下の状態遷移を持つ。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::document::ApprovalDocumentId;
use crate::{DomainError, employee::EmployeeId, value_objects::StepOrder};

define_uuid_id! {
    /// 決裁ライン ID
    pub struct ApprovalLineId;
}

/// 決裁ラインステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LineStatus {
    /// 待機中（前のラインが未承認）
    Pending,
    /// 承認待ち（判断可能なのはこの状態のみ）
    Awaiting,
    /// 承認
    Approved,
    /// 却下
    Rejected,
}

impl LineStatus {
    /// 判断済み（承認または却下）かどうか
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::str::FromStr for LineStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "awaiting" => Ok(Self::Awaiting),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::Validation(format!(
                "不正な決裁ラインステータス: {}",
                s
            ))),
        }
    }
}

/// 決裁ラインエンティティ
///
/// 文書内の個々の承認ステップ。一度判断したラインは二度と変更できない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalLine {
    id: ApprovalLineId,
    document_id: ApprovalDocumentId,
    approver_id: EmployeeId,
    order: StepOrder,
    status: LineStatus,
    comment: Option<String>,
    decided_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// 決裁ラインの新規作成パラメータ
pub struct NewApprovalLine {
    pub id: ApprovalLineId,
    pub document_id: ApprovalDocumentId,
    pub approver_id: EmployeeId,
    pub order: StepOrder,
    pub now: DateTime<Utc>,
}

/// 決裁ラインの DB 復元パラメータ
pub struct ApprovalLineRecord {
    pub id: ApprovalLineId,
    pub document_id: ApprovalDocumentId,
    pub approver_id: EmployeeId,
    pub order: StepOrder,
    pub status: LineStatus,
    pub comment: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalLine {
    /// 新しい決裁ラインを作成する（待機中で開始）
    pub fn new(params: NewApprovalLine) -> Self {
        Self {
            id: params.id,
            document_id: params.document_id,
            approver_id: params.approver_id,
            order: params.order,
            status: LineStatus::Pending,
            comment: None,
            decided_at: None,
            created_at: params.now,
            updated_at: params.now,
        }
    }

    /// 既存のデータから復元する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 判断済みなのに decided_at がない、または
    ///   未判断なのに decided_at がある場合
    pub fn from_db(record: ApprovalLineRecord) -> Result<Self, DomainError> {
        if record.status.is_decided() && record.decided_at.is_none() {
            return Err(DomainError::Validation(
                "判断済みラインには decided_at が必要です".to_string(),
            ));
        }
        if !record.status.is_decided() && record.decided_at.is_some() {
            return Err(DomainError::Validation(
                "未判断ラインに decided_at が設定されています".to_string(),
            ));
        }

        Ok(Self {
            id: record.id,
            document_id: record.document_id,
            approver_id: record.approver_id,
            order: record.order,
            status: record.status,
            comment: record.comment,
            decided_at: record.decided_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    // Getter メソッド

    pub fn id(&self) -> &ApprovalLineId {
        &self.id
    }

    pub fn document_id(&self) -> &ApprovalDocumentId {
        &self.document_id
    }

    pub fn approver_id(&self) -> &EmployeeId {
        &self.approver_id
    }

    pub fn order(&self) -> StepOrder {
        self.order
    }

    pub fn status(&self) -> LineStatus {
        self.status
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ビジネスロジックメソッド

    /// ラインを承認待ちにした新しいインスタンスを返す
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidState`: 待機中以外の状態で呼び出した場合
    pub fn activated(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status != LineStatus::Pending {
            return Err(DomainError::InvalidState(format!(
                "承認待ちへの遷移は待機中状態でのみ可能です（現在: {}）",
                self.status
            )));
        }

        Ok(Self {
            status: LineStatus::Awaiting,
            updated_at: now,
            ..self
        })
    }

    /// ラインを承認する
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidState`: 承認待ち以外の状態で呼び出した場合
    pub fn approve(self, comment: Option<String>, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status != LineStatus::Awaiting {
            return Err(DomainError::InvalidState(format!(
                "承認は承認待ち状態でのみ可能です（現在: {}）",
                self.status
            )));
        }

        Ok(Self {
            status: LineStatus::Approved,
            comment,
            decided_at: Some(now),
            updated_at: now,
            ..self
        })
    }

    /// ラインを却下する
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidState`: 承認待ち以外の状態で呼び出した場合
    pub fn reject(self, comment: Option<String>, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status != LineStatus::Awaiting {
            return Err(DomainError::InvalidState(format!(
                "却下は承認待ち状態でのみ可能です（現在: {}）",
                self.status
            )));
        }

        Ok(Self {
            status: LineStatus::Rejected,
            comment,
            decided_at: Some(now),
            updated_at: now,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    /// テスト用の固定タイムスタンプ
    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[fixture]
    fn test_line(now: DateTime<Utc>) -> ApprovalLine {
        ApprovalLine::new(NewApprovalLine {
            id: ApprovalLineId::new(),
            document_id: ApprovalDocumentId::new(),
            approver_id: EmployeeId::new(),
            order: StepOrder::first(),
            now,
        })
    }

    mod approval_line {
        use pretty_assertions::assert_eq;

        use super::*;

        #[rstest]
        fn test_新規作成の初期状態(test_line: ApprovalLine, now: DateTime<Utc>) {
            let expected = ApprovalLine::from_db(ApprovalLineRecord {
                id: test_line.id().clone(),
                document_id: test_line.document_id().clone(),
                approver_id: test_line.approver_id().clone(),
                order: StepOrder::first(),
                status: LineStatus::Pending,
                comment: None,
                decided_at: None,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
            assert_eq!(test_line, expected);
        }

        #[rstest]
        fn test_承認待ち化後の状態(test_line: ApprovalLine, now: DateTime<Utc>) {
            let sut = test_line.activated(now).unwrap();

            assert_eq!(sut.status(), LineStatus::Awaiting);
            assert_eq!(sut.decided_at(), None);
        }

        #[rstest]
        fn test_承認待ち以外の承認待ち化はエラー(
            test_line: ApprovalLine,
            now: DateTime<Utc>,
        ) {
            let awaiting = test_line.activated(now).unwrap();

            let result = awaiting.activated(now);

            assert!(matches!(result, Err(DomainError::InvalidState(_))));
        }

        #[rstest]
        fn test_承認後の状態(test_line: ApprovalLine, now: DateTime<Utc>) {
            let awaiting = test_line.activated(now).unwrap();

            let sut = awaiting.approve(Some("確認しました".to_string()), now).unwrap();

            assert_eq!(sut.status(), LineStatus::Approved);
            assert_eq!(sut.comment(), Some("確認しました"));
            assert_eq!(sut.decided_at(), Some(now));
        }

        #[rstest]
        fn test_却下後の状態(test_line: ApprovalLine, now: DateTime<Utc>) {
            let awaiting = test_line.activated(now).unwrap();

            let sut = awaiting.reject(None, now).unwrap();

            assert_eq!(sut.status(), LineStatus::Rejected);
            assert_eq!(sut.decided_at(), Some(now));
        }

        #[rstest]
        fn test_待機中の判断はエラー(test_line: ApprovalLine, now: DateTime<Utc>) {
            let result = test_line.approve(None, now);

            assert!(matches!(result, Err(DomainError::InvalidState(_))));
        }

        #[rstest]
        fn test_判断済みラインの再判断はエラー(
            test_line: ApprovalLine,
            now: DateTime<Utc>,
        ) {
            let approved = test_line.activated(now).unwrap().approve(None, now).unwrap();

            let result = approved.reject(None, now);

            assert!(matches!(result, Err(DomainError::InvalidState(_))));
        }

        #[rstest]
        fn test_from_db_判断済みなのにdecided_atがないとエラー(now: DateTime<Utc>) {
            let result = ApprovalLine::from_db(ApprovalLineRecord {
                id: ApprovalLineId::new(),
                document_id: ApprovalDocumentId::new(),
                approver_id: EmployeeId::new(),
                order: StepOrder::first(),
                status: LineStatus::Approved,
                comment: None,
                decided_at: None,
                created_at: now,
                updated_at: now,
            });

            assert!(matches!(result, Err(DomainError::Validation(_))));
        }
    }
}
