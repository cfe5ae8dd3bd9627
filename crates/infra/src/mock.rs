//! # テスト用 Mock 実装
//!
//! ユースケース層のテストで使用するインメモリ実装。
//! `Arc<Mutex<Vec<T>>>` に状態を保持し、呼び出し記録の検証を可能にする。
//!
//! 文書・ライン・参照者は [`MockStore`] を共有し、一覧ビューの
//! 結合条件（承認者・参照者での絞り込み）をインメモリで再現する。
//!
//! `&mut TxContext` を取る書き込みは即時反映せず、TxContext の
//! ジャーナルに積んで `commit()` で反映する。コミットされなかった
//! 書き込みは破棄されるため、ロールバック（エラー時に書き込みが
//! 残らないこと）をテストで検証できる。
//!
//! Mock 内の lock は毒化しない前提で `unwrap()` する（テスト専用のため）。

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use kessaiflow_domain::{
    approval::{ApprovalDocument, ApprovalDocumentId, ApprovalLine, ApprovalLineId,
               ApprovalReference},
    code::{CodeId, CodePrefix, CodeRef, TemplateDescriptor, TemplateKind, VacationKind},
    employee::{Employee, EmployeeId},
    value_objects::{OwnerKind, StepOrder, VacationDays},
};
use kessaiflow_shared::{Page, PageRequest};
use uuid::Uuid;

use crate::{
    attachment::{Attachment, AttachmentStore, NewAttachment},
    attendance::Attendance,
    calendar::{Calendar, NewCalendarEvent},
    catalog::CodeCatalog,
    db::{TransactionManager, TxContext},
    error::InfraError,
    leave::LeaveBalance,
    notification::{NotificationMessage, Notifier},
    repository::{DocumentRepository, EmployeeRepository, LineRepository, ReferenceRepository},
};

// =============================================================================
// MockStore（文書・ライン・参照者の共有ストア）
// =============================================================================

/// 文書・ライン・参照者のインメモリストア
///
/// 3 つの Mock リポジトリで共有し、一覧ビューの結合条件を再現する。
#[derive(Clone, Default)]
pub struct MockStore {
    documents: Arc<Mutex<Vec<ApprovalDocument>>>,
    lines: Arc<Mutex<Vec<ApprovalLine>>>,
    references: Arc<Mutex<Vec<ApprovalReference>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存データを直接投入する（テストのセットアップ用）
    pub fn seed_document(&self, document: ApprovalDocument) {
        self.documents.lock().unwrap().push(document);
    }

    pub fn seed_lines(&self, lines: Vec<ApprovalLine>) {
        self.lines.lock().unwrap().extend(lines);
    }

    pub fn seed_references(&self, references: Vec<ApprovalReference>) {
        self.references.lock().unwrap().extend(references);
    }

    pub fn documents(&self) -> Vec<ApprovalDocument> {
        self.documents.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<ApprovalLine> {
        self.lines.lock().unwrap().clone()
    }

    pub fn references(&self) -> Vec<ApprovalReference> {
        self.references.lock().unwrap().clone()
    }

    fn page_of(
        &self,
        mut matched: Vec<ApprovalDocument>,
        page: PageRequest,
    ) -> Page<ApprovalDocument> {
        matched.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();

        Page::new(items, total)
    }
}

// =============================================================================
// MockDocumentRepository
// =============================================================================

pub struct MockDocumentRepository {
    store: MockStore,
}

impl MockDocumentRepository {
    pub fn new(store: MockStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DocumentRepository for MockDocumentRepository {
    async fn insert(
        &self,
        tx: &mut TxContext,
        document: &ApprovalDocument,
    ) -> Result<(), InfraError> {
        let documents = Arc::clone(&self.store.documents);
        let document = document.clone();
        tx.journal().record(move || {
            documents.lock().unwrap().push(document);
        });
        Ok(())
    }

    async fn update_status(
        &self,
        tx: &mut TxContext,
        document: &ApprovalDocument,
    ) -> Result<(), InfraError> {
        let exists = {
            let documents = self.store.documents.lock().unwrap();
            documents.iter().any(|d| d.id() == document.id())
        };
        if !exists {
            return Err(InfraError::unexpected(format!(
                "更新対象の文書が存在しません: {}",
                document.id()
            )));
        }

        let documents = Arc::clone(&self.store.documents);
        let document = document.clone();
        tx.journal().record(move || {
            let mut documents = documents.lock().unwrap();
            if let Some(slot) = documents.iter_mut().find(|d| d.id() == document.id()) {
                *slot = document;
            }
        });
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ApprovalDocumentId,
    ) -> Result<Option<ApprovalDocument>, InfraError> {
        let documents = self.store.documents.lock().unwrap();
        Ok(documents.iter().find(|d| d.id() == id).cloned())
    }

    async fn find_page_by_creator(
        &self,
        creator_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<ApprovalDocument>, InfraError> {
        let matched = self
            .store
            .documents()
            .into_iter()
            .filter(|d| d.created_by() == creator_id)
            .collect();

        Ok(self.store.page_of(matched, page))
    }

    async fn find_page_in_progress_by_approver(
        &self,
        approver_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<ApprovalDocument>, InfraError> {
        let lines = self.store.lines();
        let matched = self
            .store
            .documents()
            .into_iter()
            .filter(|d| !d.status().is_terminal())
            .filter(|d| {
                lines
                    .iter()
                    .any(|l| l.document_id() == d.id() && l.approver_id() == approver_id)
            })
            .collect();

        Ok(self.store.page_of(matched, page))
    }

    async fn find_page_by_reference(
        &self,
        employee_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<ApprovalDocument>, InfraError> {
        let references = self.store.references();
        let matched = self
            .store
            .documents()
            .into_iter()
            .filter(|d| {
                references
                    .iter()
                    .any(|r| r.document_id() == d.id() && r.employee_id() == employee_id)
            })
            .collect();

        Ok(self.store.page_of(matched, page))
    }

    async fn find_page_terminal_by_decider(
        &self,
        decider_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<ApprovalDocument>, InfraError> {
        let lines = self.store.lines();
        let matched = self
            .store
            .documents()
            .into_iter()
            .filter(|d| d.status().is_terminal())
            .filter(|d| {
                lines.iter().any(|l| {
                    l.document_id() == d.id()
                        && l.approver_id() == decider_id
                        && l.status().is_decided()
                })
            })
            .collect();

        Ok(self.store.page_of(matched, page))
    }
}

// =============================================================================
// MockLineRepository
// =============================================================================

pub struct MockLineRepository {
    store: MockStore,
}

impl MockLineRepository {
    pub fn new(store: MockStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LineRepository for MockLineRepository {
    async fn insert_batch(
        &self,
        tx: &mut TxContext,
        lines: &[ApprovalLine],
    ) -> Result<(), InfraError> {
        let store = Arc::clone(&self.store.lines);
        let lines = lines.to_vec();
        tx.journal().record(move || {
            store.lock().unwrap().extend(lines);
        });
        Ok(())
    }

    async fn update(&self, tx: &mut TxContext, line: &ApprovalLine) -> Result<(), InfraError> {
        let exists = {
            let lines = self.store.lines.lock().unwrap();
            lines.iter().any(|l| l.id() == line.id())
        };
        if !exists {
            return Err(InfraError::unexpected(format!(
                "更新対象のラインが存在しません: {}",
                line.id()
            )));
        }

        let store = Arc::clone(&self.store.lines);
        let line = line.clone();
        tx.journal().record(move || {
            let mut lines = store.lock().unwrap();
            if let Some(slot) = lines.iter_mut().find(|l| l.id() == line.id()) {
                *slot = line;
            }
        });
        Ok(())
    }

    async fn find_by_id(&self, id: &ApprovalLineId) -> Result<Option<ApprovalLine>, InfraError> {
        let lines = self.store.lines.lock().unwrap();
        Ok(lines.iter().find(|l| l.id() == id).cloned())
    }

    async fn find_by_document(
        &self,
        document_id: &ApprovalDocumentId,
    ) -> Result<Vec<ApprovalLine>, InfraError> {
        let mut matched: Vec<ApprovalLine> = self
            .store
            .lines()
            .into_iter()
            .filter(|l| l.document_id() == document_id)
            .collect();
        matched.sort_by_key(|l| l.order());

        Ok(matched)
    }

    async fn find_by_documents(
        &self,
        document_ids: &[ApprovalDocumentId],
    ) -> Result<Vec<ApprovalLine>, InfraError> {
        let mut matched: Vec<ApprovalLine> = self
            .store
            .lines()
            .into_iter()
            .filter(|l| document_ids.contains(l.document_id()))
            .collect();
        matched.sort_by_key(|l| l.order());

        Ok(matched)
    }

    async fn find_by_document_and_order(
        &self,
        document_id: &ApprovalDocumentId,
        order: StepOrder,
    ) -> Result<Option<ApprovalLine>, InfraError> {
        let lines = self.store.lines.lock().unwrap();
        Ok(lines
            .iter()
            .find(|l| l.document_id() == document_id && l.order() == order)
            .cloned())
    }

    async fn find_by_document_and_approver(
        &self,
        document_id: &ApprovalDocumentId,
        approver_id: &EmployeeId,
    ) -> Result<Option<ApprovalLine>, InfraError> {
        let mut matched: Vec<ApprovalLine> = self
            .store
            .lines()
            .into_iter()
            .filter(|l| l.document_id() == document_id && l.approver_id() == approver_id)
            .collect();
        matched.sort_by_key(|l| l.order());

        Ok(matched.into_iter().next())
    }
}

// =============================================================================
// MockReferenceRepository
// =============================================================================

pub struct MockReferenceRepository {
    store: MockStore,
}

impl MockReferenceRepository {
    pub fn new(store: MockStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReferenceRepository for MockReferenceRepository {
    async fn insert_batch(
        &self,
        tx: &mut TxContext,
        references: &[ApprovalReference],
    ) -> Result<(), InfraError> {
        let store = Arc::clone(&self.store.references);
        let references = references.to_vec();
        tx.journal().record(move || {
            store.lock().unwrap().extend(references);
        });
        Ok(())
    }

    async fn update_viewed(
        &self,
        tx: &mut TxContext,
        reference: &ApprovalReference,
    ) -> Result<(), InfraError> {
        let exists = {
            let references = self.store.references.lock().unwrap();
            references.iter().any(|r| r.id() == reference.id())
        };
        if !exists {
            return Err(InfraError::unexpected(format!(
                "更新対象の参照者が存在しません: {}",
                reference.id()
            )));
        }

        let store = Arc::clone(&self.store.references);
        let reference = reference.clone();
        tx.journal().record(move || {
            let mut references = store.lock().unwrap();
            if let Some(slot) = references.iter_mut().find(|r| r.id() == reference.id()) {
                *slot = reference;
            }
        });
        Ok(())
    }

    async fn find_by_document(
        &self,
        document_id: &ApprovalDocumentId,
    ) -> Result<Vec<ApprovalReference>, InfraError> {
        Ok(self
            .store
            .references()
            .into_iter()
            .filter(|r| r.document_id() == document_id)
            .collect())
    }

    async fn find_by_documents(
        &self,
        document_ids: &[ApprovalDocumentId],
    ) -> Result<Vec<ApprovalReference>, InfraError> {
        Ok(self
            .store
            .references()
            .into_iter()
            .filter(|r| document_ids.contains(r.document_id()))
            .collect())
    }
}

// =============================================================================
// MockEmployeeRepository
// =============================================================================

#[derive(Default)]
pub struct MockEmployeeRepository {
    employees: Arc<Mutex<Vec<Employee>>>,
}

impl MockEmployeeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, employee: Employee) {
        self.employees.lock().unwrap().push(employee);
    }
}

#[async_trait]
impl EmployeeRepository for MockEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, InfraError> {
        let employees = self.employees.lock().unwrap();
        Ok(employees.iter().find(|e| e.id() == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Employee>, InfraError> {
        let employees = self.employees.lock().unwrap();
        Ok(employees.iter().find(|e| e.username() == username).cloned())
    }

    async fn find_by_ids(&self, ids: &[EmployeeId]) -> Result<Vec<Employee>, InfraError> {
        let employees = self.employees.lock().unwrap();
        Ok(employees
            .iter()
            .filter(|e| ids.contains(e.id()))
            .cloned()
            .collect())
    }
}

// =============================================================================
// MockCodeCatalog
// =============================================================================

#[derive(Default)]
pub struct MockCodeCatalog {
    codes: Arc<Mutex<Vec<CodeRef>>>,
}

impl MockCodeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, code: CodeRef) {
        self.codes.lock().unwrap().push(code);
    }
}

#[async_trait]
impl CodeCatalog for MockCodeCatalog {
    async fn resolve(
        &self,
        prefix: CodePrefix,
        value: &str,
    ) -> Result<Option<CodeRef>, InfraError> {
        let codes = self.codes.lock().unwrap();
        Ok(codes
            .iter()
            .find(|c| c.prefix() == prefix && c.value() == value)
            .cloned())
    }

    async fn resolve_by_id(&self, id: &CodeId) -> Result<Option<CodeRef>, InfraError> {
        let codes = self.codes.lock().unwrap();
        Ok(codes.iter().find(|c| c.id() == id).cloned())
    }

    async fn resolve_template(
        &self,
        id: &CodeId,
    ) -> Result<Option<TemplateDescriptor>, InfraError> {
        let Some(code) = self.resolve_by_id(id).await? else {
            return Ok(None);
        };
        if code.prefix() != CodePrefix::Template {
            return Ok(None);
        }

        let kind = code
            .value()
            .parse::<TemplateKind>()
            .map_err(|e| InfraError::invalid_data(e.to_string()))?;

        Ok(Some(TemplateDescriptor::new(
            code.id().clone(),
            kind,
            code.name().to_string(),
        )))
    }
}

// =============================================================================
// MockNotifier
// =============================================================================

/// 送信された通知を記録する Mock
///
/// `fail()` を呼ぶと以後の送信がすべて失敗する。
/// 通知失敗が決裁処理を巻き戻さないことの検証に使用する。
#[derive(Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<NotificationMessage>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以後の送信をすべて失敗させる
    pub fn fail(&self) {
        *self.should_fail.lock().unwrap() = true;
    }

    /// 送信された通知の記録を取得する
    pub fn sent(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(
        &self,
        message: NotificationMessage,
        _now: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        if *self.should_fail.lock().unwrap() {
            return Err(InfraError::unexpected("通知送信に失敗しました（テスト）"));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

// =============================================================================
// MockAttachmentStore
// =============================================================================

#[derive(Default)]
pub struct MockAttachmentStore {
    attachments: Arc<Mutex<Vec<Attachment>>>,
}

impl MockAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> Vec<Attachment> {
        self.attachments.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttachmentStore for MockAttachmentStore {
    async fn upload(
        &self,
        attachment: NewAttachment,
        now: DateTime<Utc>,
    ) -> Result<Attachment, InfraError> {
        let stored = Attachment {
            id: Uuid::now_v7(),
            owner_kind: attachment.owner_kind,
            owner_id: attachment.owner_id,
            file_name: attachment.file_name,
            size_bytes: attachment.size_bytes,
            created_at: now,
        };
        self.attachments.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn list(
        &self,
        owner_kind: OwnerKind,
        owner_id: &Uuid,
    ) -> Result<Vec<Attachment>, InfraError> {
        let attachments = self.attachments.lock().unwrap();
        Ok(attachments
            .iter()
            .filter(|a| a.owner_kind == owner_kind && a.owner_id == *owner_id)
            .cloned()
            .collect())
    }
}

// =============================================================================
// MockLeaveBalance
// =============================================================================

/// 社員ごとの残日数を保持する Mock
///
/// `set_balance()` で初期残高を設定する。残高未設定の社員への控除は
/// 残高不足として扱う。
#[derive(Default)]
pub struct MockLeaveBalance {
    balances: Arc<Mutex<HashMap<EmployeeId, f64>>>,
}

impl MockLeaveBalance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, employee_id: EmployeeId, days: f64) {
        self.balances.lock().unwrap().insert(employee_id, days);
    }

    pub fn remaining(&self, employee_id: &EmployeeId) -> Option<f64> {
        self.balances.lock().unwrap().get(employee_id).copied()
    }
}

#[async_trait]
impl LeaveBalance for MockLeaveBalance {
    async fn deduct(
        &self,
        tx: &mut TxContext,
        employee_id: &EmployeeId,
        days: VacationDays,
    ) -> Result<(), InfraError> {
        {
            let balances = self.balances.lock().unwrap();
            let Some(remaining) = balances.get(employee_id) else {
                return Err(InfraError::rejected("休暇残高が存在しません"));
            };
            if *remaining < days.as_f64() {
                return Err(InfraError::rejected(format!(
                    "休暇残日数が不足しています: 残 {} 日 / 申請 {} 日",
                    remaining, days
                )));
            }
        }

        let balances = Arc::clone(&self.balances);
        let employee_id = employee_id.clone();
        tx.journal().record(move || {
            if let Some(remaining) = balances.lock().unwrap().get_mut(&employee_id) {
                *remaining -= days.as_f64();
            }
        });
        Ok(())
    }
}

// =============================================================================
// MockAttendance
// =============================================================================

/// 休暇マークの記録を保持する Mock
#[derive(Default)]
pub struct MockAttendance {
    marks: Arc<Mutex<Vec<(EmployeeId, NaiveDate, VacationKind)>>>,
}

impl MockAttendance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marks(&self) -> Vec<(EmployeeId, NaiveDate, VacationKind)> {
        self.marks.lock().unwrap().clone()
    }
}

#[async_trait]
impl Attendance for MockAttendance {
    async fn mark_on_leave(
        &self,
        tx: &mut TxContext,
        employee_id: &EmployeeId,
        date: NaiveDate,
        kind: VacationKind,
    ) -> Result<(), InfraError> {
        let marks = Arc::clone(&self.marks);
        let employee_id = employee_id.clone();
        tx.journal().record(move || {
            marks.lock().unwrap().push((employee_id, date, kind));
        });
        Ok(())
    }
}

// =============================================================================
// MockCalendar
// =============================================================================

/// 登録された予定を保持する Mock
#[derive(Default)]
pub struct MockCalendar {
    events: Arc<Mutex<Vec<NewCalendarEvent>>>,
}

impl MockCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NewCalendarEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Calendar for MockCalendar {
    async fn create_event(
        &self,
        tx: &mut TxContext,
        event: NewCalendarEvent,
    ) -> Result<(), InfraError> {
        let events = Arc::clone(&self.events);
        tx.journal().record(move || {
            events.lock().unwrap().push(event);
        });
        Ok(())
    }
}

// =============================================================================
// MockTransactionManager
// =============================================================================

/// Mock TxContext を返す TransactionManager
pub struct MockTransactionManager;

#[async_trait]
impl TransactionManager for MockTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        Ok(TxContext::mock())
    }
}
