//! # KessaiFlow ドメイン層
//!
//! 決裁（順次承認）エンジンのドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! このクレートは DDD（ドメイン駆動設計）の原則に従い、以下を提供する:
//!
//! - **エンティティ**: 一意の識別子を持つオブジェクト（例: ApprovalDocument,
//!   ApprovalLine）
//! - **値オブジェクト**: 識別子を持たない不変オブジェクト（例: StepOrder,
//!   VacationDays）
//! - **ドメインエラー**: ビジネスルール違反を表現するエラー型
//!
//! ## 依存関係の方向
//!
//! ```text
//! approval → infra → domain → shared
//! ```
//!
//! ドメイン層はインフラ層（DB、外部サービス）には一切依存しない。
//! これにより、ビジネスロジックの純粋性が保たれる。

#[macro_use]
mod macros;

pub mod approval;
pub mod clock;
pub mod code;
pub mod employee;
pub mod error;
pub mod value_objects;

pub use error::DomainError;
