//! # 詳細取得
//!
//! 決裁文書の詳細（本体・ライン・参照者・添付）をまとめて返す。
//! 閲覧者が参照者として登録されている場合、初回のみ閲覧日時を記録する。

use std::collections::HashMap;

use kessaiflow_domain::{
    approval::{ApprovalDocument, ApprovalDocumentId, ApprovalLine, ApprovalReference},
    employee::EmployeeId,
    value_objects::OwnerKind,
};

use super::{
    ApprovalUseCase,
    view::{
        AttachmentView, DocumentDetailView, EmployeeSummary, LineView, ReferenceView,
    },
};
use crate::error::{ApprovalError, OrNotFound as _};

/// 社員ディレクトリに存在しない ID の表示名
const UNKNOWN_NAME: &str = "(不明)";

impl ApprovalUseCase {
    /// 決裁文書の詳細を取得する
    ///
    /// 閲覧者が未閲覧の参照者であれば閲覧日時を記録する（再閲覧では
    /// 最初の日時を保持する）。
    ///
    /// # Errors
    ///
    /// - `NotFound`: 文書が存在しない
    #[tracing::instrument(skip_all, fields(document_id = %document_id, viewer_id = %viewer_id))]
    pub async fn get_document_detail(
        &self,
        document_id: &ApprovalDocumentId,
        viewer_id: &EmployeeId,
    ) -> Result<DocumentDetailView, ApprovalError> {
        let document = self
            .documents
            .find_by_id(document_id)
            .await?
            .or_not_found("決裁文書", document_id.to_string())?;
        let lines = self.lines.find_by_document(document_id).await?;
        let mut references = self.references.find_by_document(document_id).await?;

        self.stamp_first_view(&mut references, viewer_id).await?;

        self.assemble_detail(document, lines, references).await
    }

    /// 閲覧者の未閲覧参照レコードに閲覧日時を記録する
    async fn stamp_first_view(
        &self,
        references: &mut [ApprovalReference],
        viewer_id: &EmployeeId,
    ) -> Result<(), ApprovalError> {
        let Some(unviewed) = references
            .iter_mut()
            .find(|r| r.employee_id() == viewer_id && r.viewed_at().is_none())
        else {
            return Ok(());
        };

        let now = self.clock.now();
        let viewed = unviewed.clone().viewed(now);

        let mut tx = self.tx_manager.begin().await?;
        self.references.update_viewed(&mut tx, &viewed).await?;
        tx.commit().await?;

        *unviewed = viewed;
        Ok(())
    }

    /// 文書・ライン・参照者から詳細ビューを組み立てる
    ///
    /// 添付メタデータの取得と社員名の解決もここで行う。
    pub(crate) async fn assemble_detail(
        &self,
        document: ApprovalDocument,
        lines: Vec<ApprovalLine>,
        references: Vec<ApprovalReference>,
    ) -> Result<DocumentDetailView, ApprovalError> {
        let attachments = self
            .attachments
            .list(OwnerKind::ApprovalDocument, document.id().as_uuid())
            .await?;

        let mut employee_ids: Vec<EmployeeId> = vec![document.created_by().clone()];
        employee_ids.extend(lines.iter().map(|l| l.approver_id().clone()));
        employee_ids.extend(references.iter().map(|r| r.employee_id().clone()));
        let names = self.employee_names(&employee_ids).await?;

        let line_views = lines
            .iter()
            .map(|line| LineView {
                id:         line.id().clone(),
                approver:   summary_of(line.approver_id(), &names),
                order:      line.order().as_i32(),
                status:     line.status(),
                comment:    line.comment().map(str::to_string),
                decided_at: line.decided_at(),
            })
            .collect();

        let reference_views = references
            .iter()
            .map(|reference| ReferenceView {
                id:        reference.id().clone(),
                employee:  summary_of(reference.employee_id(), &names),
                viewed_at: reference.viewed_at(),
            })
            .collect();

        let attachment_views = attachments
            .into_iter()
            .map(|attachment| AttachmentView {
                id:         attachment.id,
                file_name:  attachment.file_name,
                size_bytes: attachment.size_bytes,
            })
            .collect();

        Ok(DocumentDetailView {
            id:            document.id().clone(),
            title:         document.title().as_str().to_string(),
            content:       document.content().to_string(),
            status:        document.status(),
            template_kind: document.template().kind(),
            template_name: document.template().name().to_string(),
            created_by:    summary_of(document.created_by(), &names),
            detail:        document.detail().clone(),
            decided_at:    document.decided_at(),
            created_at:    document.created_at(),
            updated_at:    document.updated_at(),
            lines:         line_views,
            references:    reference_views,
            attachments:   attachment_views,
        })
    }

    /// 社員名をまとめて解決する
    pub(crate) async fn employee_names(
        &self,
        ids: &[EmployeeId],
    ) -> Result<HashMap<EmployeeId, String>, ApprovalError> {
        let employees = self.employees.find_by_ids(ids).await?;

        Ok(employees
            .into_iter()
            .map(|e| (e.id().clone(), e.name().as_str().to_string()))
            .collect())
    }
}

/// 名前解決済みの社員サマリを作る
pub(crate) fn summary_of(
    id: &EmployeeId,
    names: &HashMap<EmployeeId, String>,
) -> EmployeeSummary {
    EmployeeSummary {
        id:   id.clone(),
        name: names
            .get(id)
            .map_or_else(|| UNKNOWN_NAME.to_string(), Clone::clone),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::usecase::{
        ApproverInput, CreateDetailInput, CreateDocumentInput,
        support::{Harness, harness},
        view::DocumentDetailView,
    };

    async fn create_with_reference(h: &Harness) -> (DocumentDetailView, EmployeeId) {
        let requester = h.seed_employee("tanaka", "田中太郎");
        let approver = h.seed_employee("sato", "佐藤花子");
        let viewer = h.seed_employee("yamada", "山田次郎");
        let template_id = h.seed_template("generic", "汎用申請");

        let detail = h
            .usecase
            .create_document(CreateDocumentInput {
                requester_username: requester.username().to_string(),
                title: "備品購入申請".to_string(),
                content: "".to_string(),
                template_id,
                detail: CreateDetailInput::General,
                approvers: vec![ApproverInput {
                    employee_id: approver.id().clone(),
                    order:       1,
                }],
                references: vec![viewer.id().clone()],
                attachments: vec![],
            })
            .await
            .unwrap();

        (detail, viewer.id().clone())
    }

    #[tokio::test]
    async fn test_詳細にラインと参照者と社員名が含まれる() {
        let h = harness();
        let (created, viewer_id) = create_with_reference(&h).await;

        let detail = h
            .usecase
            .get_document_detail(&created.id, &created.created_by.id)
            .await
            .unwrap();

        assert_eq!(detail.lines.len(), 1);
        assert_eq!(detail.lines[0].approver.name, "佐藤花子");
        assert_eq!(detail.references.len(), 1);
        assert_eq!(detail.references[0].employee.id, viewer_id);
        assert_eq!(detail.created_by.name, "田中太郎");
    }

    #[tokio::test]
    async fn test_参照者の初回閲覧で閲覧日時が記録される() {
        let h = harness();
        let (created, viewer_id) = create_with_reference(&h).await;

        let detail = h
            .usecase
            .get_document_detail(&created.id, &viewer_id)
            .await
            .unwrap();

        assert_eq!(detail.references[0].viewed_at, Some(h.now));
        assert_eq!(h.store.references()[0].viewed_at(), Some(h.now));
    }

    #[tokio::test]
    async fn test_参照者以外の閲覧では閲覧日時は変わらない() {
        let h = harness();
        let (created, _) = create_with_reference(&h).await;

        h.usecase
            .get_document_detail(&created.id, &created.created_by.id)
            .await
            .unwrap();

        assert_eq!(h.store.references()[0].viewed_at(), None);
    }

    #[tokio::test]
    async fn test_再閲覧では最初の閲覧日時が保持される() {
        let h = harness();
        let (created, viewer_id) = create_with_reference(&h).await;

        h.usecase
            .get_document_detail(&created.id, &viewer_id)
            .await
            .unwrap();
        let second = h
            .usecase
            .get_document_detail(&created.id, &viewer_id)
            .await
            .unwrap();

        assert_eq!(second.references[0].viewed_at, Some(h.now));
    }

    #[tokio::test]
    async fn test_存在しない文書はnot_found() {
        let h = harness();

        let result = h
            .usecase
            .get_document_detail(&ApprovalDocumentId::new(), &EmployeeId::new())
            .await;

        assert!(matches!(result, Err(ApprovalError::NotFound { .. })));
    }
}
