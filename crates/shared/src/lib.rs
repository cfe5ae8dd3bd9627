//! # KessaiFlow 共有ユーティリティ
//!
//! このクレートは、KessaiFlow
//! プロジェクト全体で使用される共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - 他のすべてのクレート（domain, infra, approval）から依存される
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - 外部クレートへの依存は最小限に抑える

pub mod event_log;
pub mod observability;
pub mod pagination;

pub use pagination::{Page, PageRequest};
