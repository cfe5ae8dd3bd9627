//! # コードカタログ
//!
//! ステータス・テンプレート・休暇種別などの参照レコード（コード）を
//! 型付きで扱うための値オブジェクトを定義する。
//!
//! コードマスタ自体の管理（CRUD）は対象外で、決裁エンジンは解決のみ行う。

use strum::IntoStaticStr;

use crate::DomainError;

define_uuid_id! {
    /// コード ID（カタログレコードの一意識別子）
    pub struct CodeId;
}

/// コードのプレフィックス（カタログ内の名前空間）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, IntoStaticStr,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CodePrefix {
    /// 決裁文書ステータス
    DocumentStatus,
    /// 決裁ラインステータス
    LineStatus,
    /// 文書テンプレート
    Template,
    /// 休暇種別
    VacationType,
}

impl std::str::FromStr for CodePrefix {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document_status" => Ok(Self::DocumentStatus),
            "line_status" => Ok(Self::LineStatus),
            "template" => Ok(Self::Template),
            "vacation_type" => Ok(Self::VacationType),
            _ => Err(DomainError::Validation(format!(
                "不正なコードプレフィックス: {}",
                s
            ))),
        }
    }
}

/// 解決済みのコード参照
///
/// カタログから引いたレコードをドメイン内で持ち回るための型。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRef {
    id: CodeId,
    prefix: CodePrefix,
    value: String,
    name: String,
}

impl CodeRef {
    pub fn new(id: CodeId, prefix: CodePrefix, value: String, name: String) -> Self {
        Self {
            id,
            prefix,
            value,
            name,
        }
    }

    pub fn id(&self) -> &CodeId {
        &self.id
    }

    pub fn prefix(&self) -> CodePrefix {
        self.prefix
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// 文書テンプレートの種別
///
/// テンプレートごとに必須項目と最終承認時の後続処理が異なる。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, IntoStaticStr,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TemplateKind {
    /// 汎用申請
    Generic,
    /// 休暇申請
    Vacation,
    /// 出張申請
    BusinessTrip,
}

impl std::str::FromStr for TemplateKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generic" => Ok(Self::Generic),
            "vacation" => Ok(Self::Vacation),
            "business_trip" => Ok(Self::BusinessTrip),
            _ => Err(DomainError::Validation(format!(
                "不正なテンプレート種別: {}",
                s
            ))),
        }
    }
}

/// 解決済みのテンプレート記述子
///
/// カタログの template プレフィックスのコードを種別付きで表現する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDescriptor {
    id: CodeId,
    kind: TemplateKind,
    name: String,
}

impl TemplateDescriptor {
    pub fn new(id: CodeId, kind: TemplateKind, name: String) -> Self {
        Self { id, kind, name }
    }

    pub fn id(&self) -> &CodeId {
        &self.id
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// 休暇のサブタイプ
///
/// 休暇種別コードの値から導出する。未設定・未知の値は全休として扱う
/// （移行元データにはコード未設定の休暇申請が存在するため）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VacationKind {
    /// 全休
    FullDay,
    /// 午前半休
    MorningHalf,
    /// 午後半休
    AfternoonHalf,
}

impl VacationKind {
    /// 休暇種別コードの値から導出する
    pub fn from_code_value(value: Option<&str>) -> Self {
        match value {
            Some("morning_half") => Self::MorningHalf,
            Some("afternoon_half") => Self::AfternoonHalf,
            _ => Self::FullDay,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_template_kindのパース() {
        assert_eq!(
            TemplateKind::from_str("generic").unwrap(),
            TemplateKind::Generic
        );
        assert_eq!(
            TemplateKind::from_str("vacation").unwrap(),
            TemplateKind::Vacation
        );
        assert_eq!(
            TemplateKind::from_str("business_trip").unwrap(),
            TemplateKind::BusinessTrip
        );
        assert!(TemplateKind::from_str("unknown").is_err());
    }

    #[test]
    fn test_vacation_kindは未知の値で全休にフォールバックする() {
        assert_eq!(VacationKind::from_code_value(None), VacationKind::FullDay);
        assert_eq!(
            VacationKind::from_code_value(Some("???")),
            VacationKind::FullDay
        );
        assert_eq!(
            VacationKind::from_code_value(Some("morning_half")),
            VacationKind::MorningHalf
        );
        assert_eq!(
            VacationKind::from_code_value(Some("afternoon_half")),
            VacationKind::AfternoonHalf
        );
    }

    #[test]
    fn test_code_prefixの表示はsnake_case() {
        assert_eq!(CodePrefix::VacationType.to_string(), "vacation_type");
        assert_eq!(
            CodePrefix::from_str("vacation_type").unwrap(),
            CodePrefix::VacationType
        );
    }
}
