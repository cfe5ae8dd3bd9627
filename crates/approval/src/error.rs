//! # ユースケース層エラー定義
//!
//! 操作単位のエラー分類。呼び出し側（API 層や CLI）はこの分類を
//! そのままステータスコードやメッセージに対応付けられる。

use kessaiflow_domain::DomainError;
use kessaiflow_infra::{InfraError, error::InfraErrorKind};
use thiserror::Error;

/// 決裁ユースケースのエラー
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// 対象が見つからない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        entity_type: &'static str,
        id:          String,
    },

    /// 操作者に権限がない
    #[error("権限がありません: {0}")]
    AccessDenied(String),

    /// 現在の状態では実行できない操作
    #[error("不正な状態遷移です: {0}")]
    InvalidState(String),

    /// 入力値の検証エラー
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 外部コラボレータによる拒否
    ///
    /// 休暇残高不足など、連携先が業務上の理由で処理を拒否した場合。
    #[error("連携処理が拒否されました: {0}")]
    Dependency(String),

    /// 予期しない内部エラー
    #[error("内部エラーが発生しました")]
    Internal(#[source] InfraError),
}

impl ApprovalError {
    /// NotFound エラーを生成する
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }
}

impl From<DomainError> for ApprovalError {
    fn from(source: DomainError) -> Self {
        match source {
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::NotFound { entity_type, id } => Self::NotFound { entity_type, id },
            DomainError::InvalidState(msg) => Self::InvalidState(msg),
            DomainError::Forbidden(msg) => Self::AccessDenied(msg),
        }
    }
}

impl From<InfraError> for ApprovalError {
    fn from(source: InfraError) -> Self {
        match source.kind() {
            InfraErrorKind::Rejected(msg) => Self::Dependency(msg.clone()),
            _ => Self::Internal(source),
        }
    }
}

/// `Option<T>` を NotFound エラーに変換するヘルパー
pub(crate) trait OrNotFound<T> {
    fn or_not_found(self, entity_type: &'static str, id: impl Into<String>)
    -> Result<T, ApprovalError>;
}

impl<T> OrNotFound<T> for Option<T> {
    fn or_not_found(
        self,
        entity_type: &'static str,
        id: impl Into<String>,
    ) -> Result<T, ApprovalError> {
        self.ok_or_else(|| ApprovalError::not_found(entity_type, id))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_domain_errorの変換() {
        let err: ApprovalError = DomainError::Validation("件名は必須です".to_string()).into();
        assert!(matches!(err, ApprovalError::Validation(_)));

        let err: ApprovalError = DomainError::InvalidState("確定済み".to_string()).into();
        assert!(matches!(err, ApprovalError::InvalidState(_)));

        let err: ApprovalError = DomainError::Forbidden("承認者ではありません".to_string()).into();
        assert!(matches!(err, ApprovalError::AccessDenied(_)));
    }

    #[test]
    fn test_infra_errorの拒否はdependencyになる() {
        let err: ApprovalError = InfraError::rejected("残高不足").into();

        assert!(matches!(err, ApprovalError::Dependency(_)));
    }

    #[test]
    fn test_infra_errorのその他はinternalになる() {
        let err: ApprovalError = InfraError::unexpected("接続断").into();

        assert!(matches!(err, ApprovalError::Internal(_)));
    }

    #[test]
    fn test_or_not_foundはnoneをnot_foundにする() {
        let result: Result<i32, ApprovalError> = None.or_not_found("決裁文書", "doc-1");

        let Err(ApprovalError::NotFound { entity_type, id }) = result else {
            panic!("NotFound であること");
        };
        assert_eq!(entity_type, "決裁文書");
        assert_eq!(id, "doc-1");
    }
}
