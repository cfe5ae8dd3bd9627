//! # 読み取りビュー
//!
//! 詳細・一覧の各操作が返す読み取り専用の型。API 層がそのまま
//! シリアライズして返せるよう、ドメインの内部構造から切り離している。

use chrono::{DateTime, Utc};
use kessaiflow_domain::{
    approval::{
        ApprovalDocumentId, ApprovalLineId, ApprovalReferenceId, DocumentStatus, LineStatus,
        TemplateDetail,
    },
    code::TemplateKind,
    employee::EmployeeId,
};
use serde::Serialize;
use uuid::Uuid;

/// 社員の表示用サマリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeSummary {
    pub id:   EmployeeId,
    pub name: String,
}

/// 決裁ラインの表示用ビュー
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineView {
    pub id:         ApprovalLineId,
    pub approver:   EmployeeSummary,
    pub order:      i32,
    pub status:     LineStatus,
    pub comment:    Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// 参照者の表示用ビュー
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceView {
    pub id:        ApprovalReferenceId,
    pub employee:  EmployeeSummary,
    pub viewed_at: Option<DateTime<Utc>>,
}

/// 添付ファイルの表示用ビュー
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentView {
    pub id:         Uuid,
    pub file_name:  String,
    pub size_bytes: i64,
}

/// 決裁文書の詳細ビュー
///
/// 文書本体とライン・参照者・添付をまとめて返す。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentDetailView {
    pub id:            ApprovalDocumentId,
    pub title:         String,
    pub content:       String,
    pub status:        DocumentStatus,
    pub template_kind: TemplateKind,
    pub template_name: String,
    pub created_by:    EmployeeSummary,
    #[serde(skip)]
    pub detail:        TemplateDetail,
    pub decided_at:    Option<DateTime<Utc>>,
    pub created_at:    DateTime<Utc>,
    pub updated_at:    DateTime<Utc>,
    pub lines:         Vec<LineView>,
    pub references:    Vec<ReferenceView>,
    pub attachments:   Vec<AttachmentView>,
}

/// 一覧の 1 行
///
/// `line` は一覧ごとの折りたたみ規則で選ばれた代表ライン。
/// `references` は参照一覧でのみ設定される。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentListItem {
    pub id:            ApprovalDocumentId,
    pub title:         String,
    pub status:        DocumentStatus,
    pub template_name: String,
    pub created_by:    EmployeeSummary,
    pub created_at:    DateTime<Utc>,
    pub decided_at:    Option<DateTime<Utc>>,
    pub line:          Option<LineView>,
    pub references:    Vec<ReferenceView>,
}
