//! # 一覧取得
//!
//! 4 つの一覧ビューを提供する。各ビューは文書 1 件につき代表ラインを
//! 1 本に折りたたんで返す。
//!
//! | ビュー | 対象 | 代表ライン |
//! |--------|------|-----------|
//! | 承認待ち | 自分が承認者の進行中文書 | 自ライン（承認待ちなら）。それ以外は現在承認待ちのラインを自ラインのステータスで表示 |
//! | 起案 | 自分が起案した文書 | 確定済みは最終判断ライン、進行中は承認待ちライン |
//! | 参照 | 自分が参照者の文書 | 起案一覧と同じ（参照者情報付き） |
//! | 完了 | 自分が判断した確定済み文書 | 最終判断ライン |

use std::collections::HashMap;

use itertools::Itertools as _;
use kessaiflow_domain::{
    approval::{ApprovalDocument, ApprovalDocumentId, ApprovalLine, ApprovalReference, LineStatus},
    employee::EmployeeId,
};
use kessaiflow_shared::{Page, PageRequest};

use super::{
    ApprovalUseCase,
    detail::summary_of,
    view::{DocumentListItem, LineView, ReferenceView},
};
use crate::error::ApprovalError;

/// 一覧ビューの種類（代表ラインの選び方を決める）
#[derive(Clone, Copy)]
enum ListMode {
    Pending,
    Drafted,
    Referenced,
    Completed,
}

impl ApprovalUseCase {
    /// 承認待ち一覧: 自分が承認者として関与する進行中の文書
    #[tracing::instrument(skip_all, fields(employee_id = %employee_id))]
    pub async fn list_pending(
        &self,
        employee_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<DocumentListItem>, ApprovalError> {
        let documents = self
            .documents
            .find_page_in_progress_by_approver(employee_id, page)
            .await?;

        self.build_items(documents, employee_id, ListMode::Pending)
            .await
    }

    /// 起案一覧: 自分が起案した文書
    #[tracing::instrument(skip_all, fields(employee_id = %employee_id))]
    pub async fn list_drafted(
        &self,
        employee_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<DocumentListItem>, ApprovalError> {
        let documents = self
            .documents
            .find_page_by_creator(employee_id, page)
            .await?;

        self.build_items(documents, employee_id, ListMode::Drafted)
            .await
    }

    /// 参照一覧: 自分が参照者として登録されている文書
    #[tracing::instrument(skip_all, fields(employee_id = %employee_id))]
    pub async fn list_referenced(
        &self,
        employee_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<DocumentListItem>, ApprovalError> {
        let documents = self
            .documents
            .find_page_by_reference(employee_id, page)
            .await?;

        self.build_items(documents, employee_id, ListMode::Referenced)
            .await
    }

    /// 完了一覧: 自分が判断者として関与した確定済みの文書
    #[tracing::instrument(skip_all, fields(employee_id = %employee_id))]
    pub async fn list_completed(
        &self,
        employee_id: &EmployeeId,
        page: PageRequest,
    ) -> Result<Page<DocumentListItem>, ApprovalError> {
        let documents = self
            .documents
            .find_page_terminal_by_decider(employee_id, page)
            .await?;

        self.build_items(documents, employee_id, ListMode::Completed)
            .await
    }

    /// ページ内の文書をバッチで装飾して一覧項目にする
    async fn build_items(
        &self,
        documents: Page<ApprovalDocument>,
        viewer_id: &EmployeeId,
        mode: ListMode,
    ) -> Result<Page<DocumentListItem>, ApprovalError> {
        let document_ids: Vec<ApprovalDocumentId> =
            documents.items.iter().map(|d| d.id().clone()).collect();

        let mut lines_by_document: HashMap<ApprovalDocumentId, Vec<ApprovalLine>> = self
            .lines
            .find_by_documents(&document_ids)
            .await?
            .into_iter()
            .map(|l| (l.document_id().clone(), l))
            .into_group_map();

        let references_by_document: HashMap<ApprovalDocumentId, Vec<ApprovalReference>> =
            if matches!(mode, ListMode::Referenced) {
                self.references
                    .find_by_documents(&document_ids)
                    .await?
                    .into_iter()
                    .map(|r| (r.document_id().clone(), r))
                    .into_group_map()
            } else {
                HashMap::new()
            };

        let mut employee_ids: Vec<EmployeeId> = Vec::new();
        employee_ids.extend(documents.items.iter().map(|d| d.created_by().clone()));
        employee_ids.extend(
            lines_by_document
                .values()
                .flatten()
                .map(|l| l.approver_id().clone()),
        );
        employee_ids.extend(
            references_by_document
                .values()
                .flatten()
                .map(|r| r.employee_id().clone()),
        );
        let names = self.employee_names(&employee_ids).await?;

        let items = documents
            .items
            .into_iter()
            .map(|document| {
                let lines = lines_by_document
                    .remove(document.id())
                    .unwrap_or_default();
                let line = representative_line(mode, &lines, viewer_id, &document).map(
                    |(line, status)| LineView {
                        id:         line.id().clone(),
                        approver:   summary_of(line.approver_id(), &names),
                        order:      line.order().as_i32(),
                        status,
                        comment:    line.comment().map(str::to_string),
                        decided_at: line.decided_at(),
                    },
                );
                let references = references_by_document
                    .get(document.id())
                    .into_iter()
                    .flatten()
                    .map(|reference| ReferenceView {
                        id:        reference.id().clone(),
                        employee:  summary_of(reference.employee_id(), &names),
                        viewed_at: reference.viewed_at(),
                    })
                    .collect();

                DocumentListItem {
                    id:            document.id().clone(),
                    title:         document.title().as_str().to_string(),
                    status:        document.status(),
                    template_name: document.template().name().to_string(),
                    created_by:    summary_of(document.created_by(), &names),
                    created_at:    document.created_at(),
                    decided_at:    document.decided_at(),
                    line,
                    references,
                }
            })
            .collect();

        Ok(Page::new(items, documents.total))
    }
}

/// 一覧に表示する代表ラインと表示用ステータスを選ぶ
fn representative_line<'a>(
    mode: ListMode,
    lines: &'a [ApprovalLine],
    viewer_id: &EmployeeId,
    document: &ApprovalDocument,
) -> Option<(&'a ApprovalLine, LineStatus)> {
    match mode {
        ListMode::Pending => {
            let mine = lines.iter().find(|l| l.approver_id() == viewer_id)?;
            if mine.status() == LineStatus::Awaiting {
                return Some((mine, LineStatus::Awaiting));
            }
            // 自ラインの番でないときは、現在承認待ちのラインを
            // 自ラインのステータスで表示する
            lines
                .iter()
                .find(|l| l.status() == LineStatus::Awaiting)
                .map(|current| (current, mine.status()))
                .or_else(|| Some((mine, mine.status())))
        }
        ListMode::Drafted | ListMode::Referenced => {
            if document.status().is_terminal() {
                last_decided(lines)
            } else {
                lines
                    .iter()
                    .find(|l| l.status() == LineStatus::Awaiting)
                    .map(|l| (l, l.status()))
            }
        }
        ListMode::Completed => last_decided(lines),
    }
}

/// 最終判断ライン（判断済みのうち最も順序が大きいもの）
fn last_decided(lines: &[ApprovalLine]) -> Option<(&ApprovalLine, LineStatus)> {
    lines
        .iter()
        .filter(|l| l.status().is_decided())
        .max_by_key(|l| l.order())
        .map(|l| (l, l.status()))
}

#[cfg(test)]
mod tests {
    use kessaiflow_domain::approval::DocumentStatus;
    use kessaiflow_domain::employee::Employee;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::usecase::{
        ApproverInput, CreateDetailInput, CreateDocumentInput, DecideLineInput,
        support::{Harness, harness},
        view::DocumentDetailView,
    };

    struct Cast {
        requester: Employee,
        approver1: Employee,
        approver2: Employee,
        viewer:    Employee,
    }

    fn cast(h: &Harness) -> Cast {
        Cast {
            requester: h.seed_employee("tanaka", "田中太郎"),
            approver1: h.seed_employee("sato", "佐藤花子"),
            approver2: h.seed_employee("suzuki", "鈴木一郎"),
            viewer:    h.seed_employee("yamada", "山田次郎"),
        }
    }

    async fn create_document(h: &Harness, cast: &Cast) -> DocumentDetailView {
        let template_id = h.seed_template("generic", "汎用申請");

        h.usecase
            .create_document(CreateDocumentInput {
                requester_username: cast.requester.username().to_string(),
                title: "備品購入申請".to_string(),
                content: "".to_string(),
                template_id,
                detail: CreateDetailInput::General,
                approvers: vec![
                    ApproverInput {
                        employee_id: cast.approver1.id().clone(),
                        order:       1,
                    },
                    ApproverInput {
                        employee_id: cast.approver2.id().clone(),
                        order:       2,
                    },
                ],
                references: vec![cast.viewer.id().clone()],
                attachments: vec![],
            })
            .await
            .unwrap()
    }

    async fn decide(h: &Harness, detail: &DocumentDetailView, index: usize, approve: bool) {
        let (approved_code, rejected_code) = h.seed_decision_codes();
        h.usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[index].id.clone(),
                actor_id:         detail.lines[index].approver.id.clone(),
                decision_code_id: if approve { approved_code } else { rejected_code },
                comment:          None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_承認待ち一覧は自分の承認待ちラインを表示する() {
        let h = harness();
        let cast = cast(&h);
        create_document(&h, &cast).await;

        let page = h
            .usecase
            .list_pending(cast.approver1.id(), PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        let line = page.items[0].line.as_ref().unwrap();
        assert_eq!(line.approver.id, *cast.approver1.id());
        assert_eq!(line.status, LineStatus::Awaiting);
    }

    #[tokio::test]
    async fn test_承認待ち一覧は自分の番でないと現行ラインを自ステータスで表示する() {
        let h = harness();
        let cast = cast(&h);
        create_document(&h, &cast).await;

        let page = h
            .usecase
            .list_pending(cast.approver2.id(), PageRequest::default())
            .await
            .unwrap();

        // 現在承認待ちなのは 1 人目のラインだが、ステータスは自分（待機中）のもの
        let line = page.items[0].line.as_ref().unwrap();
        assert_eq!(line.approver.id, *cast.approver1.id());
        assert_eq!(line.status, LineStatus::Pending);
    }

    #[tokio::test]
    async fn test_承認待ち一覧に確定済み文書は含まれない() {
        let h = harness();
        let cast = cast(&h);
        let detail = create_document(&h, &cast).await;
        decide(&h, &detail, 0, false).await;

        let page = h
            .usecase
            .list_pending(cast.approver2.id(), PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_起案一覧は進行中文書の承認待ちラインを表示する() {
        let h = harness();
        let cast = cast(&h);
        create_document(&h, &cast).await;

        let page = h
            .usecase
            .list_drafted(cast.requester.id(), PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].status, DocumentStatus::InProgress);
        let line = page.items[0].line.as_ref().unwrap();
        assert_eq!(line.status, LineStatus::Awaiting);
        assert_eq!(line.approver.id, *cast.approver1.id());
        // 起案一覧には参照者は含まれない
        assert!(page.items[0].references.is_empty());
    }

    #[tokio::test]
    async fn test_起案一覧は確定済み文書の最終判断ラインを表示する() {
        let h = harness();
        let cast = cast(&h);
        let detail = create_document(&h, &cast).await;
        decide(&h, &detail, 0, true).await;
        decide(&h, &detail, 1, false).await;

        let page = h
            .usecase
            .list_drafted(cast.requester.id(), PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.items[0].status, DocumentStatus::Rejected);
        let line = page.items[0].line.as_ref().unwrap();
        // 最終判断は 2 段目の却下
        assert_eq!(line.approver.id, *cast.approver2.id());
        assert_eq!(line.status, LineStatus::Rejected);
    }

    #[tokio::test]
    async fn test_参照一覧には参照者情報が含まれる() {
        let h = harness();
        let cast = cast(&h);
        create_document(&h, &cast).await;

        let page = h
            .usecase
            .list_referenced(cast.viewer.id(), PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].references.len(), 1);
        assert_eq!(
            page.items[0].references[0].employee.id,
            *cast.viewer.id()
        );
        let line = page.items[0].line.as_ref().unwrap();
        assert_eq!(line.status, LineStatus::Awaiting);
    }

    #[tokio::test]
    async fn test_完了一覧は確定済み文書だけを返す() {
        let h = harness();
        let cast = cast(&h);
        create_document(&h, &cast).await;
        let finished = create_document(&h, &cast).await;
        decide(&h, &finished, 0, true).await;
        decide(&h, &finished, 1, true).await;

        let page = h
            .usecase
            .list_completed(cast.approver1.id(), PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, finished.id);
        let line = page.items[0].line.as_ref().unwrap();
        // 最終判断ライン（2 段目）が表示される
        assert_eq!(line.approver.id, *cast.approver2.id());
        assert_eq!(line.status, LineStatus::Approved);
    }

    #[tokio::test]
    async fn test_完了一覧に判断していない文書は含まれない() {
        let h = harness();
        let cast = cast(&h);
        let detail = create_document(&h, &cast).await;
        // 1 段目の却下で確定。2 人目は判断していない
        decide(&h, &detail, 0, false).await;

        let page = h
            .usecase
            .list_completed(cast.approver2.id(), PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_ページ指定で件数が絞られる() {
        let h = harness();
        let cast = cast(&h);
        for _ in 0..3 {
            create_document(&h, &cast).await;
        }

        let page = h
            .usecase
            .list_drafted(cast.requester.id(), PageRequest::new(0, 2))
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
    }
}
