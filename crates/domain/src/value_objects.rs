//! # 共通値オブジェクト
//!
//! 複数のエンティティで共有される値オブジェクトを定義する。
//!
//! ## 設計方針
//!
//! - **Newtype パターン**: プリミティブ型をラップし、型安全性を確保
//! - **バリデーション**: 生成時に検証し、不正な値の存在を型レベルで排除
//! - **不変性**: 一度作成したら変更不可
//!
//! ## 含まれる型
//!
//! | 型 | ラップ対象 | 用途 |
//! |---|-----------|------|
//! | [`StepOrder`] | `i32` | 決裁ラインの順序（文書内で 1 始まりの連番） |
//! | [`VacationDays`] | `f64` | 休暇日数（半休を含むため小数を許容） |
//! | [`DocumentTitle`] | `String` | 決裁文書の件名 |
//! | [`OwnerKind`] | - | 通知・添付の所有エンティティ種別 |

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::DomainError;

// =========================================================================
// StepOrder（決裁ラインの順序）
// =========================================================================

/// 決裁ラインの順序（値オブジェクト）
///
/// 1 から始まり、文書内で連番になる。順序 1 のラインが最初の承認者。
///
/// # 不変条件
///
/// - 順序は 1 以上
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepOrder(i32);

impl StepOrder {
    /// 先頭の順序（1）を作成する
    pub fn first() -> Self {
        Self(1)
    }

    /// 指定した値から順序を作成する
    ///
    /// # エラー
    ///
    /// 1 未満の場合は `DomainError::Validation` を返す。
    pub fn new(value: i32) -> Result<Self, DomainError> {
        if value < 1 {
            return Err(DomainError::Validation(
                "決裁ラインの順序は 1 以上である必要があります".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// 次の順序を返す
    ///
    /// # パニック
    ///
    /// i32 の最大値を超える場合はパニックする。
    /// 実運用では到達しない想定。
    pub fn next(&self) -> Self {
        Self(
            self.0
                .checked_add(1)
                .expect("決裁ラインの順序がオーバーフローしました"),
        )
    }

    /// 内部の i32 値を取得する
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for StepOrder {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::fmt::Display for StepOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =========================================================================
// VacationDays（休暇日数）
// =========================================================================

/// 休暇日数（値オブジェクト）
///
/// 半休（0.5 日）を表現するため小数を許容する。
///
/// # 不変条件
///
/// - 0 より大きい有限値
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct VacationDays(f64);

impl VacationDays {
    /// 指定した値から休暇日数を作成する
    ///
    /// # エラー
    ///
    /// 0 以下または非有限値の場合は `DomainError::Validation` を返す。
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(DomainError::Validation(
                "休暇日数は 0 より大きい必要があります".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// 内部の f64 値を取得する
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for VacationDays {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =========================================================================
// DocumentTitle（決裁文書の件名）
// =========================================================================

define_validated_string! {
    /// 決裁文書の件名（値オブジェクト）
    ///
    /// trim 後に空でないこと、200 文字以内であることを保証する。
    pub struct DocumentTitle {
        label: "件名",
        max_length: 200,
    }
}

// =========================================================================
// OwnerKind（通知・添付の所有エンティティ種別）
// =========================================================================

/// 通知・添付ファイルの所有エンティティ種別
///
/// 通知と添付は所有エンティティの種別と ID の組で帰属先を指す。
/// 現状は決裁文書のみだが、将来の帰属先追加に備えて enum にしている。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OwnerKind {
    /// 決裁文書
    ApprovalDocument,
}

impl std::str::FromStr for OwnerKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approval_document" => Ok(Self::ApprovalDocument),
            _ => Err(DomainError::Validation(format!(
                "不正な所有エンティティ種別: {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    // ===== StepOrder テスト =====

    #[test]
    fn test_step_order_firstは1() {
        assert_eq!(StepOrder::first().as_i32(), 1);
    }

    #[test]
    fn test_step_order_nextで加算される() {
        let order = StepOrder::first();

        assert_eq!(order.next().as_i32(), 2);
        assert_eq!(order.next().next().as_i32(), 3);
    }

    #[test]
    fn test_step_order_0以下はエラー() {
        assert!(StepOrder::new(0).is_err());
        assert!(StepOrder::new(-1).is_err());
    }

    // ===== VacationDays テスト =====

    #[test]
    fn test_vacation_days_正常値() {
        let days = VacationDays::new(0.5).unwrap();

        assert_eq!(days.as_f64(), 0.5);
    }

    #[test]
    fn test_vacation_days_0以下はエラー() {
        assert!(VacationDays::new(0.0).is_err());
        assert!(VacationDays::new(-1.0).is_err());
    }

    #[test]
    fn test_vacation_days_非有限値はエラー() {
        assert!(VacationDays::new(f64::NAN).is_err());
        assert!(VacationDays::new(f64::INFINITY).is_err());
    }

    // ===== DocumentTitle テスト =====

    #[test]
    fn test_document_title_正常値() {
        let title = DocumentTitle::new("  出張申請  ").unwrap();

        assert_eq!(title.as_str(), "出張申請");
    }

    #[test]
    fn test_document_title_空文字はエラー() {
        assert!(DocumentTitle::new("").is_err());
        assert!(DocumentTitle::new("   ").is_err());
    }

    #[test]
    fn test_document_title_最大長超過はエラー() {
        assert!(DocumentTitle::new("あ".repeat(201)).is_err());
        assert!(DocumentTitle::new("あ".repeat(200)).is_ok());
    }

    // ===== OwnerKind テスト =====

    #[test]
    fn test_owner_kindの表示はsnake_case() {
        use std::str::FromStr;

        assert_eq!(
            OwnerKind::ApprovalDocument.to_string(),
            "approval_document"
        );
        assert_eq!(
            OwnerKind::from_str("approval_document").unwrap(),
            OwnerKind::ApprovalDocument
        );
        assert!(OwnerKind::from_str("unknown").is_err());
    }
}
