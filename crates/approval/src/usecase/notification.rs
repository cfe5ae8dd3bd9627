//! # 通知サービス
//!
//! 決裁イベントの関係者通知。通知はベストエフォートで、送信失敗は
//! ログに記録するだけで決裁処理には影響させない。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kessaiflow_domain::{
    approval::ApprovalDocumentId, employee::EmployeeId, value_objects::OwnerKind,
};
use kessaiflow_infra::notification::{NotificationMessage, Notifier};
use kessaiflow_shared::{event_log::event, log_business_event};

/// 通知送信のラッパー
///
/// 送信結果をビジネスイベントとして記録し、失敗を握りつぶす。
pub(crate) struct NotificationService {
    notifier: Arc<dyn Notifier>,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// 通知を送信する（失敗してもエラーを返さない）
    pub async fn send(&self, message: NotificationMessage, now: DateTime<Utc>) {
        let recipient_id = message.recipient_id.clone();
        match self.notifier.notify(message, now).await {
            Ok(()) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_SENT,
                    event.entity_type = event::entity_type::EMPLOYEE,
                    event.entity_id = %recipient_id,
                    event.result = event::result::SUCCESS,
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, recipient_id = %recipient_id, "通知の送信に失敗");
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_FAILED,
                    event.entity_type = event::entity_type::EMPLOYEE,
                    event.entity_id = %recipient_id,
                    event.result = event::result::FAILURE,
                );
            }
        }
    }
}

/// 文書詳細画面への遷移 URL
pub(crate) fn document_url(document_id: &ApprovalDocumentId) -> String {
    format!("/approvals/{document_id}")
}

/// 決裁ラインへの登録通知（起案時、全承認者宛）
pub(crate) fn line_registered(
    recipient_id: EmployeeId,
    document_id: &ApprovalDocumentId,
    title: &str,
) -> NotificationMessage {
    NotificationMessage {
        recipient_id,
        owner_kind: OwnerKind::ApprovalDocument,
        url: document_url(document_id),
        title: "決裁文書が起案されました".to_string(),
        body: format!("「{title}」の決裁ラインに登録されました"),
    }
}

/// 参照者への登録通知（起案時）
pub(crate) fn reference_registered(
    recipient_id: EmployeeId,
    document_id: &ApprovalDocumentId,
    title: &str,
) -> NotificationMessage {
    NotificationMessage {
        recipient_id,
        owner_kind: OwnerKind::ApprovalDocument,
        url: document_url(document_id),
        title: "決裁文書が起案されました".to_string(),
        body: format!("「{title}」の参照者に登録されました"),
    }
}

/// 承認依頼通知（承認待ちになった承認者宛）
pub(crate) fn approval_requested(
    recipient_id: EmployeeId,
    document_id: &ApprovalDocumentId,
    title: &str,
) -> NotificationMessage {
    NotificationMessage {
        recipient_id,
        owner_kind: OwnerKind::ApprovalDocument,
        url: document_url(document_id),
        title: "承認依頼".to_string(),
        body: format!("「{title}」があなたの承認待ちです"),
    }
}

/// 承認確定の通知（起案者宛）
pub(crate) fn document_approved(
    recipient_id: EmployeeId,
    document_id: &ApprovalDocumentId,
    title: &str,
) -> NotificationMessage {
    NotificationMessage {
        recipient_id,
        owner_kind: OwnerKind::ApprovalDocument,
        url: document_url(document_id),
        title: "決裁承認".to_string(),
        body: format!("「{title}」が承認されました"),
    }
}

/// 却下確定の通知（起案者宛）
pub(crate) fn document_rejected(
    recipient_id: EmployeeId,
    document_id: &ApprovalDocumentId,
    title: &str,
) -> NotificationMessage {
    NotificationMessage {
        recipient_id,
        owner_kind: OwnerKind::ApprovalDocument,
        url: document_url(document_id),
        title: "決裁却下".to_string(),
        body: format!("「{title}」が却下されました"),
    }
}
