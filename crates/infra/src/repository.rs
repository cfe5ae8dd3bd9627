//! # リポジトリ実装
//!
//! 決裁エンジンが使用する永続化トレイトとその PostgreSQL 実装を提供する。
//!
//! ## 設計方針
//!
//! - **依存性逆転**: ユースケース層はトレイトにのみ依存する
//! - **構造的トランザクション強制**: 書き込みメソッドは `&mut TxContext` を要求する
//! - **Row 構造体 + TryFrom**: SQL 結果からエンティティへの変換を一箇所に集約
//!
//! クエリは実行時検証の `sqlx::query_as` を使用する（ビルド環境に DB を
//! 要求しないため）。

pub mod document_repository;
pub mod employee_repository;
pub mod line_repository;
pub mod reference_repository;

pub use document_repository::{DocumentRepository, PostgresDocumentRepository};
pub use employee_repository::{EmployeeRepository, PostgresEmployeeRepository};
pub use line_repository::{LineRepository, PostgresLineRepository};
pub use reference_repository::{PostgresReferenceRepository, ReferenceRepository};
