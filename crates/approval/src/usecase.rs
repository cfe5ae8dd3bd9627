//! # 決裁ユースケース
//!
//! 決裁エンジンの操作を提供する。永続化・外部連携はすべてトレイト経由で
//! 注入し、テストでは Mock 実装に差し替える。
//!
//! | 操作 | モジュール |
//! |------|-----------|
//! | 起案 | [`create`] |
//! | 承認・却下 | [`decide`] |
//! | 詳細取得 | [`detail`] |
//! | 一覧（承認待ち・起案・参照・完了） | [`list`] |

pub mod view;

mod create;
mod decide;
mod detail;
mod list;
mod notification;
mod vacation;

use std::sync::Arc;

use kessaiflow_domain::clock::Clock;
use kessaiflow_infra::{
    attachment::AttachmentStore,
    attendance::Attendance,
    calendar::Calendar,
    catalog::CodeCatalog,
    db::TransactionManager,
    leave::LeaveBalance,
    notification::Notifier,
    repository::{DocumentRepository, EmployeeRepository, LineRepository, ReferenceRepository},
};

pub use create::{ApproverInput, AttachmentInput, CreateDetailInput, CreateDocumentInput};
pub use decide::DecideLineInput;

use crate::usecase::notification::NotificationService;

/// ユースケースの依存一式
///
/// 本番では Postgres 実装、テストでは Mock 実装を渡す。
pub struct ApprovalUseCaseDeps {
    pub tx_manager:  Arc<dyn TransactionManager>,
    pub documents:   Arc<dyn DocumentRepository>,
    pub lines:       Arc<dyn LineRepository>,
    pub references:  Arc<dyn ReferenceRepository>,
    pub employees:   Arc<dyn EmployeeRepository>,
    pub catalog:     Arc<dyn CodeCatalog>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub notifier:    Arc<dyn Notifier>,
    pub leave:       Arc<dyn LeaveBalance>,
    pub attendance:  Arc<dyn Attendance>,
    pub calendar:    Arc<dyn Calendar>,
    pub clock:       Arc<dyn Clock>,
}

/// 決裁ユースケース
pub struct ApprovalUseCase {
    tx_manager:    Arc<dyn TransactionManager>,
    documents:     Arc<dyn DocumentRepository>,
    lines:         Arc<dyn LineRepository>,
    references:    Arc<dyn ReferenceRepository>,
    employees:     Arc<dyn EmployeeRepository>,
    catalog:       Arc<dyn CodeCatalog>,
    attachments:   Arc<dyn AttachmentStore>,
    notifications: NotificationService,
    leave:         Arc<dyn LeaveBalance>,
    attendance:    Arc<dyn Attendance>,
    calendar:      Arc<dyn Calendar>,
    clock:         Arc<dyn Clock>,
}

impl ApprovalUseCase {
    pub fn new(deps: ApprovalUseCaseDeps) -> Self {
        Self {
            tx_manager:    deps.tx_manager,
            documents:     deps.documents,
            lines:         deps.lines,
            references:    deps.references,
            employees:     deps.employees,
            catalog:       deps.catalog,
            attachments:   deps.attachments,
            notifications: NotificationService::new(deps.notifier),
            leave:         deps.leave,
            attendance:    deps.attendance,
            calendar:      deps.calendar,
            clock:         deps.clock,
        }
    }
}
