//! # KessaiFlow インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! このクレートはリポジトリトレイトと外部コラボレータのポートを定義し、
//! その PostgreSQL 実装を提供する。外部システムの詳細をカプセル化し、
//! ユースケース層をインフラの変更から保護する。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への接続プール管理とトランザクション
//! - **リポジトリ実装**: 決裁文書・ライン・参照者・社員の永続化
//! - **外部コラボレータ**: コードカタログ、通知、添付、休暇残・勤怠・カレンダー
//!
//! ## 依存関係
//!
//! ```text
//! approval → infra → domain → shared
//! ```
//!
//! ドメイン層はインフラ層に依存しない（依存性逆転の原則）。
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL 接続管理と [`db::TxContext`]
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - リポジトリ実装
//! - [`catalog`] - コードカタログポート
//! - [`notification`] - 通知ポート
//! - [`attachment`] - 添付ファイルポート
//! - [`leave`] / [`attendance`] / [`calendar`] - 休暇カスケードのコラボレータ

pub mod attachment;
pub mod attendance;
pub mod calendar;
pub mod catalog;
pub mod db;
pub mod error;
pub mod leave;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod repository;

pub use error::InfraError;
