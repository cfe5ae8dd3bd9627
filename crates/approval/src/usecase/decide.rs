//! # 承認・却下
//!
//! 決裁ラインへの判断と承認連鎖の進行。
//!
//! 前提条件は次の順で検証する:
//! 1. ラインが存在する（NotFound）
//! 2. 操作者がそのラインの承認者である（AccessDenied）
//! 3. ラインが承認待ちである（InvalidState）
//! 4. 判断コードが解決でき、承認または却下である（NotFound / Validation）
//!
//! 判断の永続化はすべて同一トランザクションで行い、通知はコミット後に
//! ちょうど 1 件だけ送信する。

use kessaiflow_domain::{
    approval::{ApprovalLine, ApprovalLineId, LineStatus, TemplateDetail},
    code::{CodeId, CodePrefix},
    employee::EmployeeId,
};
use kessaiflow_shared::{event_log::event, log_business_event};

use super::{ApprovalUseCase, notification};
use crate::error::{ApprovalError, OrNotFound as _};

/// 判断の入力
pub struct DecideLineInput {
    pub line_id:  ApprovalLineId,
    /// 操作者（ラインの承認者と一致する必要がある）
    pub actor_id: EmployeeId,
    /// 判断を表すラインステータスコードの ID（承認または却下）
    pub decision_code_id: CodeId,
    pub comment:  Option<String>,
}

impl ApprovalUseCase {
    /// 決裁ラインに判断を記録する
    ///
    /// 承認の場合は次のラインを承認待ちにし、最後のラインなら文書を承認で
    /// 確定する。休暇申請の最終承認では同一トランザクション内で休暇
    /// カスケード（残控除・勤怠・カレンダー）を適用する。
    /// 却下の場合は文書を即座に却下で確定する。
    ///
    /// # Errors
    ///
    /// - `NotFound`: ラインまたは判断コードが存在しない
    /// - `AccessDenied`: 操作者がラインの承認者でない
    /// - `InvalidState`: ラインが承認待ちでない
    /// - `Validation`: 判断コードが承認・却下以外
    /// - `Dependency`: 休暇カスケードが連携先に拒否された（承認ごと巻き戻し）
    #[tracing::instrument(skip_all, fields(line_id = %input.line_id, actor_id = %input.actor_id))]
    pub async fn decide_line(&self, input: DecideLineInput) -> Result<(), ApprovalError> {
        let now = self.clock.now();

        let line = self
            .lines
            .find_by_id(&input.line_id)
            .await?
            .or_not_found("決裁ライン", input.line_id.to_string())?;

        if line.approver_id() != &input.actor_id {
            return Err(ApprovalError::AccessDenied(
                "このラインの承認者ではありません".to_string(),
            ));
        }

        if line.status() != LineStatus::Awaiting {
            return Err(ApprovalError::InvalidState(format!(
                "承認待ちのラインにのみ判断できます（現在: {}）",
                line.status()
            )));
        }

        let decision = self.resolve_decision(&input.decision_code_id).await?;

        let document = self
            .documents
            .find_by_id(line.document_id())
            .await?
            .or_not_found("決裁文書", line.document_id().to_string())?;
        let title = document.title().as_str().to_string();
        let creator_id = document.created_by().clone();
        let document_id = document.id().clone();

        let mut tx = self.tx_manager.begin().await?;

        match decision {
            LineStatus::Rejected => {
                let decided = line.reject(input.comment, now)?;
                self.lines.update(&mut tx, &decided).await?;

                let rejected = document.rejected(input.actor_id.clone(), now)?;
                self.documents.update_status(&mut tx, &rejected).await?;
                tx.commit().await?;

                log_business_event!(
                    event.category = event::category::APPROVAL,
                    event.action = event::action::LINE_REJECTED,
                    event.entity_type = event::entity_type::APPROVAL_LINE,
                    event.entity_id = %decided.id(),
                    event.actor_id = %input.actor_id,
                    event.result = event::result::SUCCESS,
                );
                log_business_event!(
                    event.category = event::category::APPROVAL,
                    event.action = event::action::DOCUMENT_REJECTED,
                    event.entity_type = event::entity_type::APPROVAL_DOCUMENT,
                    event.entity_id = %document_id,
                    event.actor_id = %input.actor_id,
                    event.result = event::result::SUCCESS,
                );

                self.notifications
                    .send(
                        notification::document_rejected(creator_id, &document_id, &title),
                        now,
                    )
                    .await;
            }
            LineStatus::Approved => {
                let decided = line.approve(input.comment, now)?;
                self.lines.update(&mut tx, &decided).await?;

                let next = self
                    .lines
                    .find_by_document_and_order(&document_id, decided.order().next())
                    .await?;

                match next {
                    Some(next_line) => {
                        let activated = next_line.activated(now)?;
                        self.lines.update(&mut tx, &activated).await?;

                        // 中間承認でも判断者を文書の最終更新者として残す
                        let touched = document.touched(input.actor_id.clone(), now)?;
                        self.documents.update_status(&mut tx, &touched).await?;
                        tx.commit().await?;

                        self.log_line_approved(&decided, &input.actor_id);

                        self.notifications
                            .send(
                                notification::approval_requested(
                                    activated.approver_id().clone(),
                                    &document_id,
                                    &title,
                                ),
                                now,
                            )
                            .await;
                    }
                    None => {
                        let approved = document.approved(input.actor_id.clone(), now)?;
                        self.documents.update_status(&mut tx, &approved).await?;

                        // 休暇申請は承認と同一トランザクションで後続処理を適用する
                        if let TemplateDetail::Vacation(fields) = approved.detail() {
                            let fields = fields.clone();
                            self.apply_vacation_cascade(&mut tx, &approved, &fields)
                                .await?;
                        }
                        tx.commit().await?;

                        self.log_line_approved(&decided, &input.actor_id);
                        log_business_event!(
                            event.category = event::category::APPROVAL,
                            event.action = event::action::DOCUMENT_APPROVED,
                            event.entity_type = event::entity_type::APPROVAL_DOCUMENT,
                            event.entity_id = %document_id,
                            event.actor_id = %input.actor_id,
                            event.result = event::result::SUCCESS,
                        );

                        self.notifications
                            .send(
                                notification::document_approved(creator_id, &document_id, &title),
                                now,
                            )
                            .await;
                    }
                }
            }
            other => {
                return Err(ApprovalError::Validation(format!(
                    "判断は承認または却下のみ指定できます: {other}"
                )));
            }
        }

        Ok(())
    }

    /// 判断コードを解決してラインステータスに変換する
    async fn resolve_decision(&self, code_id: &CodeId) -> Result<LineStatus, ApprovalError> {
        let code = self
            .catalog
            .resolve_by_id(code_id)
            .await?
            .or_not_found("判断コード", code_id.to_string())?;

        if code.prefix() != CodePrefix::LineStatus {
            return Err(ApprovalError::Validation(format!(
                "判断コードのプレフィックスが不正です: {}",
                code.prefix()
            )));
        }

        Ok(code.value().parse::<LineStatus>()?)
    }

    fn log_line_approved(&self, line: &ApprovalLine, actor_id: &EmployeeId) {
        log_business_event!(
            event.category = event::category::APPROVAL,
            event.action = event::action::LINE_APPROVED,
            event.entity_type = event::entity_type::APPROVAL_LINE,
            event.entity_id = %line.id(),
            event.actor_id = %actor_id,
            event.result = event::result::SUCCESS,
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use kessaiflow_domain::{
        approval::DocumentStatus,
        code::{CodePrefix, VacationKind},
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::usecase::{
        CreateDetailInput, CreateDocumentInput,
        create::ApproverInput,
        support::{Harness, harness},
        view::DocumentDetailView,
    };

    /// 2 段の決裁ラインを持つ汎用文書を起案し、詳細ビューを返す
    async fn create_generic(h: &Harness) -> DocumentDetailView {
        let requester = h.seed_employee("tanaka", "田中太郎");
        let approver1 = h.seed_employee("sato", "佐藤花子");
        let approver2 = h.seed_employee("suzuki", "鈴木一郎");
        let template_id = h.seed_template("generic", "汎用申請");

        h.usecase
            .create_document(CreateDocumentInput {
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
            })
            .await
            .unwrap()
    }

    /// 月〜水の 3 日間の全休申請（承認者 1 名）を起案する
    async fn create_vacation(h: &Harness) -> DocumentDetailView {
        let requester = h.seed_employee("tanaka", "田中太郎");
        let approver = h.seed_employee("sato", "佐藤花子");
        let template_id = h.seed_template("vacation", "休暇申請");
        h.leave.set_balance(requester.id().clone(), 10.0);

        h.usecase
            .create_document(CreateDocumentInput {
                requester_username: requester.username().to_string(),
                title: "夏季休暇".to_string(),
                content: "家族旅行のため".to_string(),
                template_id,
                detail: CreateDetailInput::Vacation {
                    vacation_type: None,
                    days:          3.0,
                    starts_at:     chrono::Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap(),
                    ends_at:       chrono::Utc.with_ymd_and_hms(2024, 6, 5, 0, 0, 0).unwrap(),
                },
                approvers: vec![ApproverInput {
                    employee_id: approver.id().clone(),
                    order:       1,
                }],
                references: vec![],
                attachments: vec![],
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_中間承認で次のラインが承認待ちになる() {
        let h = harness();
        let detail = create_generic(&h).await;
        let (approved_code, _) = h.seed_decision_codes();

        h.usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[0].id.clone(),
                actor_id:         detail.lines[0].approver.id.clone(),
                decision_code_id: approved_code,
                comment:          Some("確認しました".to_string()),
            })
            .await
            .unwrap();

        let lines = h.store.lines();
        let first = lines.iter().find(|l| l.id() == &detail.lines[0].id).unwrap();
        let second = lines.iter().find(|l| l.id() == &detail.lines[1].id).unwrap();
        assert_eq!(first.status(), LineStatus::Approved);
        assert_eq!(second.status(), LineStatus::Awaiting);
        assert_eq!(h.store.documents()[0].status(), DocumentStatus::InProgress);
    }

    #[tokio::test]
    async fn test_中間承認で判断者が文書の最終更新者になる() {
        let h = harness();
        let detail = create_generic(&h).await;
        let (approved_code, _) = h.seed_decision_codes();
        let actor_id = detail.lines[0].approver.id.clone();

        h.usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[0].id.clone(),
                actor_id:         actor_id.clone(),
                decision_code_id: approved_code,
                comment:          None,
            })
            .await
            .unwrap();

        let document = &h.store.documents()[0];
        assert_eq!(document.status(), DocumentStatus::InProgress);
        assert_eq!(document.updated_by(), &actor_id);
    }

    #[tokio::test]
    async fn test_中間承認の通知は次の承認者宛に1件だけ() {
        let h = harness();
        let detail = create_generic(&h).await;
        let (approved_code, _) = h.seed_decision_codes();
        let created_count = h.notifier.sent().len();

        h.usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[0].id.clone(),
                actor_id:         detail.lines[0].approver.id.clone(),
                decision_code_id: approved_code,
                comment:          None,
            })
            .await
            .unwrap();

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), created_count + 1);
        assert_eq!(
            sent.last().unwrap().recipient_id,
            detail.lines[1].approver.id
        );
    }

    #[tokio::test]
    async fn test_最終承認で文書が承認確定し起案者に通知される() {
        let h = harness();
        let detail = create_generic(&h).await;
        let (approved_code, _) = h.seed_decision_codes();

        for line in &detail.lines {
            h.usecase
                .decide_line(DecideLineInput {
                    line_id:          line.id.clone(),
                    actor_id:         line.approver.id.clone(),
                    decision_code_id: approved_code.clone(),
                    comment:          None,
                })
                .await
                .unwrap();
        }

        let document = &h.store.documents()[0];
        assert_eq!(document.status(), DocumentStatus::Approved);
        assert_eq!(document.decided_at(), Some(h.now));
        let last = h.notifier.sent().pop().unwrap();
        assert_eq!(last.recipient_id, detail.created_by.id);
        assert_eq!(last.title, "決裁承認");
    }

    #[tokio::test]
    async fn test_却下で文書が即座に却下確定する() {
        let h = harness();
        let detail = create_generic(&h).await;
        let (_, rejected_code) = h.seed_decision_codes();

        h.usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[0].id.clone(),
                actor_id:         detail.lines[0].approver.id.clone(),
                decision_code_id: rejected_code,
                comment:          Some("差し戻し".to_string()),
            })
            .await
            .unwrap();

        let document = &h.store.documents()[0];
        assert_eq!(document.status(), DocumentStatus::Rejected);
        // 2 段目のラインは待機中のまま
        let lines = h.store.lines();
        let second = lines.iter().find(|l| l.id() == &detail.lines[1].id).unwrap();
        assert_eq!(second.status(), LineStatus::Pending);
        let last = h.notifier.sent().pop().unwrap();
        assert_eq!(last.title, "決裁却下");
    }

    #[tokio::test]
    async fn test_2人目の却下で1人目の承認は変わらない() {
        let h = harness();
        let detail = create_generic(&h).await;
        let (approved_code, rejected_code) = h.seed_decision_codes();

        h.usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[0].id.clone(),
                actor_id:         detail.lines[0].approver.id.clone(),
                decision_code_id: approved_code,
                comment:          None,
            })
            .await
            .unwrap();
        h.usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[1].id.clone(),
                actor_id:         detail.lines[1].approver.id.clone(),
                decision_code_id: rejected_code,
                comment:          None,
            })
            .await
            .unwrap();

        let lines = h.store.lines();
        let first = lines.iter().find(|l| l.id() == &detail.lines[0].id).unwrap();
        assert_eq!(first.status(), LineStatus::Approved);
        assert_eq!(h.store.documents()[0].status(), DocumentStatus::Rejected);
    }

    #[tokio::test]
    async fn test_承認者以外の判断はaccess_denied() {
        let h = harness();
        let detail = create_generic(&h).await;
        let (approved_code, _) = h.seed_decision_codes();
        let outsider = h.seed_employee("yamada", "山田次郎");

        let result = h
            .usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[0].id.clone(),
                actor_id:         outsider.id().clone(),
                decision_code_id: approved_code,
                comment:          None,
            })
            .await;

        assert!(matches!(result, Err(ApprovalError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_待機中ラインへの判断はinvalid_state() {
        let h = harness();
        let detail = create_generic(&h).await;
        let (approved_code, _) = h.seed_decision_codes();

        // 2 段目はまだ待機中
        let result = h
            .usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[1].id.clone(),
                actor_id:         detail.lines[1].approver.id.clone(),
                decision_code_id: approved_code,
                comment:          None,
            })
            .await;

        assert!(matches!(result, Err(ApprovalError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_判断済みラインへの再判断はinvalid_state() {
        let h = harness();
        let detail = create_generic(&h).await;
        let (approved_code, rejected_code) = h.seed_decision_codes();

        h.usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[0].id.clone(),
                actor_id:         detail.lines[0].approver.id.clone(),
                decision_code_id: approved_code,
                comment:          None,
            })
            .await
            .unwrap();

        let result = h
            .usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[0].id.clone(),
                actor_id:         detail.lines[0].approver.id.clone(),
                decision_code_id: rejected_code,
                comment:          None,
            })
            .await;

        assert!(matches!(result, Err(ApprovalError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_存在しないラインはnot_found() {
        let h = harness();
        create_generic(&h).await;
        let (approved_code, _) = h.seed_decision_codes();

        let result = h
            .usecase
            .decide_line(DecideLineInput {
                line_id:          ApprovalLineId::new(),
                actor_id:         EmployeeId::new(),
                decision_code_id: approved_code,
                comment:          None,
            })
            .await;

        assert!(matches!(result, Err(ApprovalError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_存在しない判断コードはnot_found() {
        let h = harness();
        let detail = create_generic(&h).await;

        let result = h
            .usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[0].id.clone(),
                actor_id:         detail.lines[0].approver.id.clone(),
                decision_code_id: CodeId::new(),
                comment:          None,
            })
            .await;

        assert!(matches!(result, Err(ApprovalError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_承認却下以外の判断コードはバリデーションエラー() {
        let h = harness();
        let detail = create_generic(&h).await;
        let awaiting_code = h.seed_code(CodePrefix::LineStatus, "awaiting", "承認待ち");

        let result = h
            .usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[0].id.clone(),
                actor_id:         detail.lines[0].approver.id.clone(),
                decision_code_id: awaiting_code,
                comment:          None,
            })
            .await;

        assert!(matches!(result, Err(ApprovalError::Validation(_))));
    }

    #[tokio::test]
    async fn test_休暇申請の最終承認でカスケードが適用される() {
        let h = harness();
        let detail = create_vacation(&h).await;
        let (approved_code, _) = h.seed_decision_codes();
        let applicant_id = detail.created_by.id.clone();

        h.usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[0].id.clone(),
                actor_id:         detail.lines[0].approver.id.clone(),
                decision_code_id: approved_code,
                comment:          None,
            })
            .await
            .unwrap();

        // 残 10.0 - 3.0 日
        assert_eq!(h.leave.remaining(&applicant_id), Some(7.0));
        // 月・火・水の 3 日分の勤怠マーク
        let marks = h.attendance.marks();
        assert_eq!(marks.len(), 3);
        assert!(marks.iter().all(|(id, _, kind)| {
            *id == applicant_id && *kind == VacationKind::FullDay
        }));
        // カレンダー予定は 1 件（月曜 9 時〜水曜 18 時）
        let events = h.calendar.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "休暇");
        assert_eq!(
            events[0].starts_at,
            chrono::Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
        );
        assert_eq!(
            events[0].ends_at,
            chrono::Utc.with_ymd_and_hms(2024, 6, 5, 18, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_休暇残不足の最終承認はdependencyエラー() {
        let h = harness();
        let detail = create_vacation(&h).await;
        let (approved_code, _) = h.seed_decision_codes();
        let applicant_id = detail.created_by.id.clone();
        h.leave.set_balance(applicant_id.clone(), 1.0);

        let result = h
            .usecase
            .decide_line(DecideLineInput {
                line_id:          detail.lines[0].id.clone(),
                actor_id:         detail.lines[0].approver.id.clone(),
                decision_code_id: approved_code,
                comment:          None,
            })
            .await;

        assert!(matches!(result, Err(ApprovalError::Dependency(_))));
        assert_eq!(h.leave.remaining(&applicant_id), Some(1.0));
        assert!(h.attendance.marks().is_empty());
        assert!(h.calendar.events().is_empty());
        // カスケード失敗時はライン確定・文書承認も巻き戻る
        assert_eq!(h.store.documents()[0].status(), DocumentStatus::InProgress);
        assert_eq!(h.store.lines()[0].status(), LineStatus::Awaiting);
    }
}
