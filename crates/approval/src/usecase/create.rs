//! # 起案
//!
//! 決裁文書の新規作成。文書本体・決裁ライン・参照者を同一トランザクションで
//! 保存し、コミット後に添付登録と関係者通知を行う。

use chrono::{DateTime, Utc};
use itertools::Itertools as _;
use kessaiflow_domain::{
    approval::{
        ApprovalDocument, ApprovalDocumentId, ApprovalLine, ApprovalLineId, ApprovalReference,
        ApprovalReferenceId, NewApprovalDocument, NewApprovalLine, TemplateDetail, TripFields,
        VacationFields,
    },
    code::{CodeId, CodePrefix, TemplateKind},
    employee::EmployeeId,
    value_objects::{DocumentTitle, OwnerKind, StepOrder, VacationDays},
};
use kessaiflow_infra::attachment::NewAttachment;
use kessaiflow_shared::{event_log::event, log_business_event};

use super::{ApprovalUseCase, notification, view::DocumentDetailView};
use crate::error::{ApprovalError, OrNotFound as _};

/// 起案の入力
pub struct CreateDocumentInput {
    /// 起案者のログイン名
    pub requester_username: String,
    pub title:              String,
    pub content:            String,
    pub template_id:        CodeId,
    pub detail:             CreateDetailInput,
    pub approvers:          Vec<ApproverInput>,
    pub references:         Vec<EmployeeId>,
    pub attachments:        Vec<AttachmentInput>,
}

/// 承認者の指定（順序付き）
pub struct ApproverInput {
    pub employee_id: EmployeeId,
    pub order:       i32,
}

/// テンプレート別の詳細入力
pub enum CreateDetailInput {
    General,
    Vacation {
        /// 休暇種別コードの値（未指定は全休扱い）
        vacation_type: Option<String>,
        days:          f64,
        starts_at:     DateTime<Utc>,
        ends_at:       DateTime<Utc>,
    },
    BusinessTrip {
        location:       String,
        transportation: String,
        purpose:        Option<String>,
        remark:         Option<String>,
        starts_at:      DateTime<Utc>,
        ends_at:        DateTime<Utc>,
    },
}

/// 添付ファイルの指定（メタデータのみ）
pub struct AttachmentInput {
    pub file_name:  String,
    pub size_bytes: i64,
}

impl ApprovalUseCase {
    /// 決裁文書を起案する
    ///
    /// # Errors
    ///
    /// - `NotFound`: 起案者・承認者・参照者・テンプレート・休暇種別が存在しない
    /// - `Validation`: 順序が 1..N の連番でない、詳細がテンプレートと不一致、など
    #[tracing::instrument(skip_all, fields(requester = %input.requester_username))]
    pub async fn create_document(
        &self,
        input: CreateDocumentInput,
    ) -> Result<DocumentDetailView, ApprovalError> {
        let now = self.clock.now();

        let requester = self
            .employees
            .find_by_username(&input.requester_username)
            .await?
            .or_not_found("社員", &input.requester_username)?;
        let template = self
            .catalog
            .resolve_template(&input.template_id)
            .await?
            .or_not_found("テンプレート", input.template_id.to_string())?;

        validate_orders(&input.approvers)?;
        for approver in &input.approvers {
            self.employees
                .find_by_id(&approver.employee_id)
                .await?
                .or_not_found("社員", approver.employee_id.to_string())?;
        }
        for employee_id in &input.references {
            self.employees
                .find_by_id(employee_id)
                .await?
                .or_not_found("社員", employee_id.to_string())?;
        }

        let detail = self.build_detail(template.kind(), input.detail).await?;
        let document = ApprovalDocument::new(NewApprovalDocument {
            id: ApprovalDocumentId::new(),
            title: DocumentTitle::new(input.title)?,
            content: input.content,
            created_by: requester.id().clone(),
            template,
            detail,
            now,
        })?;

        let mut lines = Vec::with_capacity(input.approvers.len());
        for approver in input
            .approvers
            .into_iter()
            .sorted_by_key(|a| a.order)
        {
            let order = StepOrder::new(approver.order)?;
            let mut line = ApprovalLine::new(NewApprovalLine {
                id: ApprovalLineId::new(),
                document_id: document.id().clone(),
                approver_id: approver.employee_id,
                order,
                now,
            });
            // 順序 1 のラインだけが承認待ちで開始する
            if order == StepOrder::first() {
                line = line.activated(now)?;
            }
            lines.push(line);
        }

        let references: Vec<ApprovalReference> = input
            .references
            .into_iter()
            .map(|employee_id| {
                ApprovalReference::new(
                    ApprovalReferenceId::new(),
                    document.id().clone(),
                    employee_id,
                    now,
                )
            })
            .collect();

        let mut tx = self.tx_manager.begin().await?;
        self.documents.insert(&mut tx, &document).await?;
        self.lines.insert_batch(&mut tx, &lines).await?;
        self.references.insert_batch(&mut tx, &references).await?;
        tx.commit().await?;

        // 添付はベストエフォート（失敗しても起案は成立する）
        for attachment in input.attachments {
            let upload = self
                .attachments
                .upload(
                    NewAttachment {
                        owner_kind: OwnerKind::ApprovalDocument,
                        owner_id:   *document.id().as_uuid(),
                        file_name:  attachment.file_name,
                        size_bytes: attachment.size_bytes,
                    },
                    now,
                )
                .await;
            if let Err(e) = upload {
                tracing::warn!(error = %e, document_id = %document.id(), "添付の登録に失敗");
            }
        }

        let title = document.title().as_str();
        for line in &lines {
            self.notifications
                .send(
                    notification::line_registered(line.approver_id().clone(), document.id(), title),
                    now,
                )
                .await;
        }
        if let Some(first) = lines.first() {
            self.notifications
                .send(
                    notification::approval_requested(
                        first.approver_id().clone(),
                        document.id(),
                        title,
                    ),
                    now,
                )
                .await;
        }
        for reference in &references {
            self.notifications
                .send(
                    notification::reference_registered(
                        reference.employee_id().clone(),
                        document.id(),
                        title,
                    ),
                    now,
                )
                .await;
        }

        log_business_event!(
            event.category = event::category::APPROVAL,
            event.action = event::action::DOCUMENT_CREATED,
            event.entity_type = event::entity_type::APPROVAL_DOCUMENT,
            event.entity_id = %document.id(),
            event.actor_id = %requester.id(),
            event.result = event::result::SUCCESS,
        );

        self.assemble_detail(document, lines, references).await
    }

    /// テンプレート種別に応じた詳細を構築する
    async fn build_detail(
        &self,
        kind: TemplateKind,
        input: CreateDetailInput,
    ) -> Result<TemplateDetail, ApprovalError> {
        match (kind, input) {
            (TemplateKind::Generic, CreateDetailInput::General) => Ok(TemplateDetail::General),
            (
                TemplateKind::Vacation,
                CreateDetailInput::Vacation {
                    vacation_type,
                    days,
                    starts_at,
                    ends_at,
                },
            ) => {
                let vacation_type = match vacation_type {
                    Some(value) => Some(
                        self.catalog
                            .resolve(CodePrefix::VacationType, &value)
                            .await?
                            .or_not_found("休暇種別", value)?,
                    ),
                    None => None,
                };
                Ok(TemplateDetail::Vacation(VacationFields::new(
                    vacation_type,
                    VacationDays::new(days)?,
                    starts_at,
                    ends_at,
                )?))
            }
            (
                TemplateKind::BusinessTrip,
                CreateDetailInput::BusinessTrip {
                    location,
                    transportation,
                    purpose,
                    remark,
                    starts_at,
                    ends_at,
                },
            ) => Ok(TemplateDetail::BusinessTrip(TripFields::new(
                location,
                transportation,
                purpose,
                remark,
                starts_at,
                ends_at,
            )?)),
            (kind, _) => Err(ApprovalError::Validation(format!(
                "テンプレート {kind} に対して別種別の詳細が指定されました"
            ))),
        }
    }
}

/// 決裁ラインの順序が 1..N の連番であることを検証する
fn validate_orders(approvers: &[ApproverInput]) -> Result<(), ApprovalError> {
    if approvers.is_empty() {
        return Err(ApprovalError::Validation(
            "承認者は 1 名以上指定する必要があります".to_string(),
        ));
    }

    let orders: Vec<i32> = approvers.iter().map(|a| a.order).sorted().collect();
    for (expected, actual) in (1..).zip(&orders) {
        if *actual != expected {
            return Err(ApprovalError::Validation(format!(
                "決裁ラインの順序は 1 から始まる連番である必要があります: {orders:?}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use kessaiflow_domain::approval::{DocumentStatus, LineStatus};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::usecase::support::{Harness, harness};

    fn generic_input(h: &Harness) -> CreateDocumentInput {
        let requester = h.seed_employee("tanaka", "田中太郎");
        let approver1 = h.seed_employee("sato", "佐藤花子");
        let approver2 = h.seed_employee("suzuki", "鈴木一郎");
        let template_id = h.seed_template("generic", "汎用申請");

        CreateDocumentInput {
            requester_username: requester.username().to_string(),
            title: "備品購入申請".to_string(),
            content: "モニターを購入したい".to_string(),
            template_id,
            detail: CreateDetailInput::General,
            approvers: vec![
                ApproverInput {
                    employee_id: approver1.id().clone(),
                    order:       1,
                },
                ApproverInput {
                    employee_id: approver2.id().clone(),
                    order:       2,
                },
            ],
            references: vec![],
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn test_起案で文書とラインが保存される() {
        let h = harness();
        let input = generic_input(&h);

        let detail = h.usecase.create_document(input).await.unwrap();

        assert_eq!(detail.status, DocumentStatus::InProgress);
        assert_eq!(detail.lines.len(), 2);
        assert_eq!(detail.lines[0].status, LineStatus::Awaiting);
        assert_eq!(detail.lines[1].status, LineStatus::Pending);
        assert_eq!(h.store.documents().len(), 1);
        assert_eq!(h.store.lines().len(), 2);
    }

    #[tokio::test]
    async fn test_起案時の通知は承認者全員と先頭承認者宛() {
        let h = harness();
        let input = generic_input(&h);
        let first_approver = input.approvers[0].employee_id.clone();

        h.usecase.create_document(input).await.unwrap();

        // 登録通知 2 件 + 先頭承認者への承認依頼 1 件
        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 3);
        let requested: Vec<_> = sent.iter().filter(|m| m.title == "承認依頼").collect();
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0].recipient_id, first_approver);
    }

    #[tokio::test]
    async fn test_参照者がいる場合は参照通知も送られる() {
        let h = harness();
        let mut input = generic_input(&h);
        let viewer = h.seed_employee("yamada", "山田次郎");
        input.references = vec![viewer.id().clone()];

        h.usecase.create_document(input).await.unwrap();

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 4);
        assert!(
            sent.iter()
                .any(|m| m.recipient_id == *viewer.id() && m.body.contains("参照者"))
        );
    }

    #[tokio::test]
    async fn test_添付メタデータが登録される() {
        let h = harness();
        let mut input = generic_input(&h);
        input.attachments = vec![AttachmentInput {
            file_name:  "見積書.pdf".to_string(),
            size_bytes: 12_345,
        }];

        let detail = h.usecase.create_document(input).await.unwrap();

        assert_eq!(detail.attachments.len(), 1);
        assert_eq!(detail.attachments[0].file_name, "見積書.pdf");
        assert_eq!(h.attachments.stored().len(), 1);
    }

    #[tokio::test]
    async fn test_順序が連番でないとバリデーションエラー() {
        let h = harness();
        let mut input = generic_input(&h);
        input.approvers[1].order = 3;

        let result = h.usecase.create_document(input).await;

        assert!(matches!(result, Err(ApprovalError::Validation(_))));
        assert!(h.store.documents().is_empty());
    }

    #[tokio::test]
    async fn test_承認者なしはバリデーションエラー() {
        let h = harness();
        let mut input = generic_input(&h);
        input.approvers = vec![];

        let result = h.usecase.create_document(input).await;

        assert!(matches!(result, Err(ApprovalError::Validation(_))));
    }

    #[tokio::test]
    async fn test_存在しない起案者はnot_found() {
        let h = harness();
        let mut input = generic_input(&h);
        input.requester_username = "ghost".to_string();

        let result = h.usecase.create_document(input).await;

        assert!(matches!(result, Err(ApprovalError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_存在しないテンプレートはnot_found() {
        let h = harness();
        let mut input = generic_input(&h);
        input.template_id = CodeId::new();

        let result = h.usecase.create_document(input).await;

        assert!(matches!(result, Err(ApprovalError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_テンプレートと詳細の不一致はバリデーションエラー() {
        let h = harness();
        let mut input = generic_input(&h);
        input.detail = CreateDetailInput::Vacation {
            vacation_type: None,
            days:          1.0,
            starts_at:     h.now,
            ends_at:       h.now,
        };

        let result = h.usecase.create_document(input).await;

        assert!(matches!(result, Err(ApprovalError::Validation(_))));
    }

    #[tokio::test]
    async fn test_通知が失敗しても起案は成立する() {
        let h = harness();
        let input = generic_input(&h);
        h.notifier.fail();

        let result = h.usecase.create_document(input).await;

        assert!(result.is_ok());
        assert_eq!(h.store.documents().len(), 1);
    }
}
