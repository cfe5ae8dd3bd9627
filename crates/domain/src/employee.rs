//! # 社員
//!
//! 社員ディレクトリのエンティティを定義する。
//!
//! 社員情報は外部の人事マスタが所有する読み取り専用データであり、
//! 決裁エンジンからは参照のみ行う。
//!
//! ## 設計方針
//!
//! - **Newtype パターン**: EmployeeId は UUID をラップし、型安全性を確保
//! - **PII 保護**: 氏名・メールアドレスは Debug 出力でマスクされる

use crate::DomainError;

define_uuid_id! {
    /// 社員 ID（一意識別子）
    ///
    /// UUID v7 を使用し、生成順にソート可能。
    pub struct EmployeeId;
}

define_validated_string! {
    /// 社員の表示名（値オブジェクト）
    pub struct EmployeeName {
        label: "社員名",
        max_length: 100,
        pii: true,
    }
}

/// メールアドレス（値オブジェクト）
///
/// PII のため Debug 出力はマスクされる。
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Email(String);

impl Email {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスは必須です".to_string(),
            ));
        }

        if !value.contains('@') || value.chars().count() > 255 {
            return Err(DomainError::Validation(format!(
                "不正なメールアドレス形式です: {}文字",
                value.chars().count()
            )));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Email").field(&"[REDACTED]").finish()
    }
}

/// 社員エンティティ（ディレクトリエントリ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    id: EmployeeId,
    username: String,
    name: EmployeeName,
    email: Email,
}

impl Employee {
    pub fn new(id: EmployeeId, username: String, name: EmployeeName, email: Email) -> Self {
        Self {
            id,
            username,
            name,
            email,
        }
    }

    pub fn id(&self) -> &EmployeeId {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn name(&self) -> &EmployeeName {
        &self.name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }
}
