//! # 参照者
//!
//! 決裁文書の回覧先（参照者）を管理する。参照者は文書を閲覧できるが
//! 判断はしない。初回閲覧日時を一度だけ記録する。

use chrono::{DateTime, Utc};

use super::document::ApprovalDocumentId;
use crate::employee::EmployeeId;

define_uuid_id! {
    /// 参照者 ID
    pub struct ApprovalReferenceId;
}

/// 参照者エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalReference {
    id: ApprovalReferenceId,
    document_id: ApprovalDocumentId,
    employee_id: EmployeeId,
    viewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// 参照者の DB 復元パラメータ
pub struct ApprovalReferenceRecord {
    pub id: ApprovalReferenceId,
    pub document_id: ApprovalDocumentId,
    pub employee_id: EmployeeId,
    pub viewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApprovalReference {
    /// 新しい参照者を作成する（未閲覧で開始）
    pub fn new(
        id: ApprovalReferenceId,
        document_id: ApprovalDocumentId,
        employee_id: EmployeeId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            document_id,
            employee_id,
            viewed_at: None,
            created_at: now,
        }
    }

    /// 既存のデータから復元する
    pub fn from_db(record: ApprovalReferenceRecord) -> Self {
        Self {
            id: record.id,
            document_id: record.document_id,
            employee_id: record.employee_id,
            viewed_at: record.viewed_at,
            created_at: record.created_at,
        }
    }

    pub fn id(&self) -> &ApprovalReferenceId {
        &self.id
    }

    pub fn document_id(&self) -> &ApprovalDocumentId {
        &self.document_id
    }

    pub fn employee_id(&self) -> &EmployeeId {
        &self.employee_id
    }

    pub fn viewed_at(&self) -> Option<DateTime<Utc>> {
        self.viewed_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 初回閲覧を記録した新しいインスタンスを返す
    ///
    /// すでに閲覧済みの場合は何もしない（冪等）。最初の閲覧日時を保持する。
    pub fn viewed(self, now: DateTime<Utc>) -> Self {
        if self.viewed_at.is_some() {
            return self;
        }

        Self {
            viewed_at: Some(now),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[rstest]
    fn test_初回閲覧で閲覧日時が記録される(now: DateTime<Utc>) {
        let reference = ApprovalReference::new(
            ApprovalReferenceId::new(),
            ApprovalDocumentId::new(),
            EmployeeId::new(),
            now,
        );

        let sut = reference.viewed(now);

        assert_eq!(sut.viewed_at(), Some(now));
    }

    #[rstest]
    fn test_再閲覧しても最初の閲覧日時が保持される(now: DateTime<Utc>) {
        let later = now + chrono::Duration::hours(1);
        let reference = ApprovalReference::new(
            ApprovalReferenceId::new(),
            ApprovalDocumentId::new(),
            EmployeeId::new(),
            now,
        );

        let sut = reference.viewed(now).viewed(later);

        assert_eq!(sut.viewed_at(), Some(now));
    }
}
