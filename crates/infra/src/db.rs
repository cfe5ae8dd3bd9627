//! # PostgreSQL データベース接続管理
//!
//! データベース接続プールの作成とトランザクション管理を行う。
//!
//! ## 設計方針
//!
//! - **接続プール**: 毎回接続を張り直すオーバーヘッドを避け、接続を再利用
//! - **sqlx 採用**: 非同期サポート、型安全なクエリ
//! - **構造的トランザクション強制**: 書き込みは [`TxContext`] を必須引数にする
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use kessaiflow_infra::db;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::create_pool(&db::database_url_from_env()?).await?;
//!     db::run_migrations(&pool).await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction, postgres::PgPoolOptions};

use crate::error::InfraError;

/// 環境変数 `DATABASE_URL` から接続 URL を読み取る
///
/// `.env` ファイルがあれば dotenvy 経由で読み込む（開発環境向け）。
pub fn database_url_from_env() -> Result<String, InfraError> {
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL")
        .map_err(|_| InfraError::unexpected("環境変数 DATABASE_URL が設定されていません"))
}

/// PostgreSQL 接続プールを作成する
///
/// アプリケーション起動時に一度だけ呼び出し、作成したプールを
/// アプリケーション全体で共有する。
///
/// # 設定値
///
/// - `max_connections(10)`: 最大接続数。本番環境では負荷に応じて調整
/// - `acquire_timeout(5秒)`: 接続取得のタイムアウト。超過時はエラー
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// データベースマイグレーションを実行する
///
/// `sqlx::migrate!()` マクロで埋め込まれたマイグレーションファイルを
/// 順番に適用する。適用済みのマイグレーションはスキップされる。
///
/// sqlx が PostgreSQL の advisory lock を使用するため、
/// 複数プロセスから同時に呼び出しても安全。
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

// =============================================================================
// TxContext
// =============================================================================

/// トランザクションコンテキスト
///
/// 書き込みリポジトリメソッドの必須引数。
/// トランザクションなしの書き込みをコンパイルエラーにする（構造的強制）。
///
/// # ライフサイクル
///
/// 1. `TransactionManager::begin()` で作成
/// 2. 書き込みメソッドに `&mut TxContext` として渡す
/// 3. `commit()` でコミット、またはドロップでロールバック
pub struct TxContext(TxContextInner);

enum TxContextInner {
    Pg(Transaction<'static, Postgres>),
    #[cfg(any(test, feature = "test-utils"))]
    Mock(MockJournal),
}

/// Mock TxContext の書き込みジャーナル
///
/// Mock リポジトリは書き込みを即時反映せず、クロージャとしてここに積む。
/// `commit()` で順番に適用し、コミットせずにドロップされた場合は破棄する。
/// これによりロールバック（エラー時に書き込みが残らないこと）を
/// テストで検証できる。
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct MockJournal {
    writes: Vec<Box<dyn FnOnce() + Send>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockJournal {
    /// コミット時に適用する書き込みを積む
    pub fn record(&mut self, write: impl FnOnce() + Send + 'static) {
        self.writes.push(Box::new(write));
    }

    fn apply(self) {
        for write in self.writes {
            write();
        }
    }
}

impl TxContext {
    /// Postgres トランザクションを開始する
    ///
    /// `PgTransactionManager` のみが使用する。
    /// ユースケース層は `TransactionManager` trait 経由で TxContext を取得する。
    pub(crate) async fn begin_pg(pool: &PgPool) -> Result<Self, InfraError> {
        Ok(Self(TxContextInner::Pg(pool.begin().await?)))
    }

    /// テスト用のモック TxContext を作成する
    ///
    /// Mock リポジトリは書き込みをジャーナルに積み、`commit()` で反映する。
    /// `conn()` を呼ぶと panic するが、Mock リポジトリは `conn()` を使用しない。
    #[cfg(any(test, feature = "test-utils"))]
    pub fn mock() -> Self {
        Self(TxContextInner::Mock(MockJournal::default()))
    }

    /// トランザクションをコミットする
    ///
    /// 呼ばずにドロップすると、sqlx が自動的にロールバックする
    /// （Mock の場合はジャーナルが破棄される）。
    pub async fn commit(self) -> Result<(), InfraError> {
        match self.0 {
            TxContextInner::Pg(tx) => {
                tx.commit().await?;
                Ok(())
            }
            #[cfg(any(test, feature = "test-utils"))]
            TxContextInner::Mock(journal) => {
                journal.apply();
                Ok(())
            }
        }
    }

    /// トランザクション内の DB コネクションを取得する
    ///
    /// Postgres リポジトリ実装が `sqlx::query().execute(tx.conn())` として使用する。
    pub(crate) fn conn(&mut self) -> &mut PgConnection {
        match &mut self.0 {
            TxContextInner::Pg(tx) => tx,
            #[cfg(any(test, feature = "test-utils"))]
            TxContextInner::Mock(_) => {
                panic!("BUG: conn() called on Mock TxContext. Mock repos should not call conn().")
            }
        }
    }

    /// Mock TxContext のジャーナルを取得する
    ///
    /// Mock リポジトリのみが使用する。
    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn journal(&mut self) -> &mut MockJournal {
        match &mut self.0 {
            TxContextInner::Mock(journal) => journal,
            TxContextInner::Pg(_) => {
                panic!("BUG: journal() called on Pg TxContext.")
            }
        }
    }
}

// =============================================================================
// TransactionManager
// =============================================================================

/// トランザクション管理 trait
///
/// ユースケース層が TxContext を作成するための抽象化。
/// ユースケース層は PgPool に直接依存せず、この trait 経由で
/// トランザクションを開始する。
#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// トランザクションを開始し、TxContext を返す
    async fn begin(&self) -> Result<TxContext, InfraError>;
}

/// Postgres 用 TransactionManager 実装
pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        TxContext::begin_pg(&self.pool).await
    }
}
