//! # 決裁
//!
//! 決裁文書、決裁ライン、参照者を管理する。
//!
//! ## 概念モデル
//!
//! - **ApprovalDocument**: 申請者が起案する決裁文書（テンプレート別の詳細を保持）
//! - **ApprovalLine**: 文書内の順序付き承認ステップ（順次承認）
//! - **ApprovalReference**: 回覧先の社員（閲覧のみ、判断はしない）
//!
//! ## 承認の流れ
//!
//! 順序 1 のラインだけが承認待ちで開始し、承認されるたびに次の順序の
//! ラインが承認待ちになる。いずれかのラインが却下されるとそこで連鎖は
//! 停止し、文書は却下で確定する。最後のラインが承認されると文書は承認で
//! 確定する。

mod document;
mod line;
mod reference;

pub use document::*;
pub use line::*;
pub use reference::*;
