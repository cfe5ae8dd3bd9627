//! # ドメイン層エラー定義
//!
//! ビジネスルール違反やドメイン固有の例外状態を表現するエラー型。
//!
//! ## 設計方針
//!
//! - **型による分類**: エラーの種類を列挙型で明示し、パターンマッチで処理可能に
//! - **thiserror 活用**: `#[error(...)]` マクロでエラーメッセージを自動生成
//!
//! ## 使用例
//!
//! ```rust
//! use kessaiflow_domain::DomainError;
//!
//! fn validate_title(title: &str) -> Result<(), DomainError> {
//!     if title.is_empty() {
//!         return Err(DomainError::Validation("件名は必須です".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// ビジネスロジックの実行中に発生する例外状態を表現する。
/// ユースケース層でこのエラーを受け取り、操作単位のエラー型に変換する。
///
/// # 設計判断
///
/// - `thiserror` を使用し、`std::error::Error` トレイトを自動実装
/// - 各バリアントに `#[error(...)]` で人間可読なメッセージを定義
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 入力値がビジネスルールに違反している場合に使用する。
    ///
    /// # 例
    ///
    /// - 必須フィールドが未入力
    /// - 文字数制限の超過
    /// - 決裁ラインの順序が 1..N の連番でない
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    ///
    /// 指定された ID のエンティティがデータベースに存在しない場合に使用する。
    /// `entity_type` にはエンティティの種類（"決裁文書", "社員" など）を指定し、
    /// エラーメッセージを具体的にする。
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"決裁文書", "決裁ライン" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },

    /// 状態遷移エラー
    ///
    /// エンティティの現在の状態では要求された操作が実行できない場合に使用する。
    ///
    /// # 例
    ///
    /// - 確定済み（承認/却下）の文書への操作
    /// - 承認待ちでないラインへの判断
    #[error("不正な状態遷移です: {0}")]
    InvalidState(String),

    /// 権限エラー
    ///
    /// 操作者に実行権限がない場合に使用する。
    /// 認証（Authentication）ではなく認可（Authorization）の失敗を表す。
    #[error("権限がありません: {0}")]
    Forbidden(String),
}
