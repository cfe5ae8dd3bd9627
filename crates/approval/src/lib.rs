//! # KessaiFlow 決裁エンジン
//!
//! 順次承認（稟議）ワークフローのユースケース層。
//!
//! - 決裁文書の起案（テンプレート別詳細・決裁ライン・参照者・添付）
//! - 承認/却下の判断と承認連鎖の進行
//! - 休暇申請の最終承認時カスケード（休暇残控除・勤怠マーク・カレンダー登録）
//! - 文書詳細と 4 つの一覧ビュー（承認待ち・起案・参照・完了）
//! - 関係者への通知（ベストエフォート）

pub mod error;
pub mod usecase;

pub use error::ApprovalError;
pub use usecase::ApprovalUseCase;
