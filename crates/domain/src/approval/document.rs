//! # 決裁文書
//!
//! 申請者が起案する決裁文書を管理する。テンプレート別の詳細項目と
//! 進行中・承認・却下のライフサイクルを持つ。
//!
//! テンプレート別の詳細は ADT（代数的データ型）で表現し、
//! 「休暇申請なのに日数がない」といった不正な状態を型レベルで防止する。
//! テンプレートの振り分けは作成時に一度だけ行い、以降は variant への
//! パターンマッチで分岐する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    DomainError,
    code::{CodePrefix, CodeRef, TemplateDescriptor, TemplateKind, VacationKind},
    employee::EmployeeId,
    value_objects::{DocumentTitle, VacationDays},
};

define_uuid_id! {
    /// 決裁文書 ID
    pub struct ApprovalDocumentId;
}

/// 決裁文書ステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentStatus {
    /// 進行中
    InProgress,
    /// 承認（確定）
    Approved,
    /// 却下（確定）
    Rejected,
}

impl DocumentStatus {
    /// 確定済み（承認または却下）かどうか
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::Validation(format!(
                "不正な決裁文書ステータス: {}",
                s
            ))),
        }
    }
}

/// 決裁文書の状態（ADT ベースステートマシン）
///
/// 確定済み状態でのみ確定日時を持たせ、不正な状態を型レベルで防止する。
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentState {
    /// 進行中
    InProgress,
    /// 承認で確定
    Approved(DecidedState),
    /// 却下で確定
    Rejected(DecidedState),
}

/// 確定済み状態の固有フィールド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecidedState {
    /// 確定日時（最終判断が行われた時刻）
    pub decided_at: DateTime<Utc>,
}

/// 休暇申請の詳細項目
///
/// 生成時に検証するため、存在する限り不変条件（日数 > 0、開始 ≤ 終了）が
/// 成立する。
#[derive(Debug, Clone, PartialEq)]
pub struct VacationFields {
    vacation_type: Option<CodeRef>,
    days: VacationDays,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl VacationFields {
    /// 休暇詳細を検証して作成する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 開始が終了より後、または休暇種別コードの
    ///   プレフィックスが `vacation_type` でない場合
    pub fn new(
        vacation_type: Option<CodeRef>,
        days: VacationDays,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if starts_at > ends_at {
            return Err(DomainError::Validation(
                "休暇の開始日時は終了日時以前である必要があります".to_string(),
            ));
        }

        if let Some(code) = &vacation_type
            && code.prefix() != CodePrefix::VacationType
        {
            return Err(DomainError::Validation(format!(
                "休暇種別コードのプレフィックスが不正です: {}",
                code.prefix()
            )));
        }

        Ok(Self {
            vacation_type,
            days,
            starts_at,
            ends_at,
        })
    }

    pub fn vacation_type(&self) -> Option<&CodeRef> {
        self.vacation_type.as_ref()
    }

    pub fn days(&self) -> VacationDays {
        self.days
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    /// 休暇のサブタイプ（全休・午前半休・午後半休）を導出する
    pub fn kind(&self) -> VacationKind {
        VacationKind::from_code_value(self.vacation_type.as_ref().map(CodeRef::value))
    }
}

/// 出張申請の詳細項目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripFields {
    location: String,
    transportation: String,
    purpose: Option<String>,
    remark: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl TripFields {
    /// 出張詳細を検証して作成する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 出張先・交通手段が空、または開始が終了より後の場合
    pub fn new(
        location: String,
        transportation: String,
        purpose: Option<String>,
        remark: Option<String>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if location.trim().is_empty() {
            return Err(DomainError::Validation("出張先は必須です".to_string()));
        }

        if transportation.trim().is_empty() {
            return Err(DomainError::Validation("交通手段は必須です".to_string()));
        }

        if starts_at > ends_at {
            return Err(DomainError::Validation(
                "出張の開始日時は終了日時以前である必要があります".to_string(),
            ));
        }

        Ok(Self {
            location,
            transportation,
            purpose,
            remark,
            starts_at,
            ends_at,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn transportation(&self) -> &str {
        &self.transportation
    }

    pub fn purpose(&self) -> Option<&str> {
        self.purpose.as_deref()
    }

    pub fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }
}

/// テンプレート別の詳細項目（ADT）
///
/// 作成時にテンプレート種別に応じた variant を一度だけ構築し、
/// 以降の分岐はパターンマッチで行う。
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateDetail {
    /// 汎用申請（追加項目なし）
    General,
    /// 休暇申請
    Vacation(VacationFields),
    /// 出張申請
    BusinessTrip(TripFields),
}

impl TemplateDetail {
    /// 詳細が対応するテンプレート種別
    pub fn kind(&self) -> TemplateKind {
        match self {
            Self::General => TemplateKind::Generic,
            Self::Vacation(_) => TemplateKind::Vacation,
            Self::BusinessTrip(_) => TemplateKind::BusinessTrip,
        }
    }
}

/// 決裁文書エンティティ
///
/// テンプレート別の詳細と承認のライフサイクルを保持する。
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalDocument {
    id: ApprovalDocumentId,
    title: DocumentTitle,
    content: String,
    created_by: EmployeeId,
    template: TemplateDescriptor,
    detail: TemplateDetail,
    updated_by: EmployeeId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    state: DocumentState,
}

/// 決裁文書の新規作成パラメータ
pub struct NewApprovalDocument {
    pub id: ApprovalDocumentId,
    pub title: DocumentTitle,
    pub content: String,
    pub created_by: EmployeeId,
    pub template: TemplateDescriptor,
    pub detail: TemplateDetail,
    pub now: DateTime<Utc>,
}

/// 決裁文書の DB 復元パラメータ
///
/// DB スキーマのフラット構造を表現する。`from_db()` で不変条件を検証して
/// ADT に変換する。
pub struct ApprovalDocumentRecord {
    pub id: ApprovalDocumentId,
    pub title: DocumentTitle,
    pub content: String,
    pub created_by: EmployeeId,
    pub template: TemplateDescriptor,
    pub status: DocumentStatus,
    pub vacation_type: Option<CodeRef>,
    pub vacation_days: Option<f64>,
    pub trip_location: Option<String>,
    pub trip_transportation: Option<String>,
    pub trip_purpose: Option<String>,
    pub trip_remark: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    pub updated_by: EmployeeId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalDocument {
    /// 新しい決裁文書を作成する（進行中で開始）
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 詳細の variant がテンプレート種別と一致しない場合
    pub fn new(params: NewApprovalDocument) -> Result<Self, DomainError> {
        if params.detail.kind() != params.template.kind() {
            return Err(DomainError::Validation(format!(
                "テンプレート {} に対して {} の詳細が指定されました",
                params.template.kind(),
                params.detail.kind()
            )));
        }

        Ok(Self {
            id: params.id,
            title: params.title,
            content: params.content,
            created_by: params.created_by.clone(),
            template: params.template,
            detail: params.detail,
            updated_by: params.created_by,
            created_at: params.now,
            updated_at: params.now,
            state: DocumentState::InProgress,
        })
    }

    /// 既存のデータから復元する
    ///
    /// DB のフラット構造から詳細 ADT を再構築し、テンプレートの不変条件を
    /// 再検証する。
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 不変条件違反（例: 休暇申請なのに日数が
    ///   NULL、確定済みなのに decided_at が NULL）
    pub fn from_db(record: ApprovalDocumentRecord) -> Result<Self, DomainError> {
        let detail = match record.template.kind() {
            TemplateKind::Generic => TemplateDetail::General,
            TemplateKind::Vacation => {
                let days = record.vacation_days.ok_or_else(|| {
                    DomainError::Validation("休暇申請には日数が必要です".to_string())
                })?;
                let starts_at = record.starts_at.ok_or_else(|| {
                    DomainError::Validation("休暇申請には開始日時が必要です".to_string())
                })?;
                let ends_at = record.ends_at.ok_or_else(|| {
                    DomainError::Validation("休暇申請には終了日時が必要です".to_string())
                })?;
                TemplateDetail::Vacation(VacationFields::new(
                    record.vacation_type,
                    VacationDays::new(days)?,
                    starts_at,
                    ends_at,
                )?)
            }
            TemplateKind::BusinessTrip => {
                let location = record.trip_location.ok_or_else(|| {
                    DomainError::Validation("出張申請には出張先が必要です".to_string())
                })?;
                let transportation = record.trip_transportation.ok_or_else(|| {
                    DomainError::Validation("出張申請には交通手段が必要です".to_string())
                })?;
                let starts_at = record.starts_at.ok_or_else(|| {
                    DomainError::Validation("出張申請には開始日時が必要です".to_string())
                })?;
                let ends_at = record.ends_at.ok_or_else(|| {
                    DomainError::Validation("出張申請には終了日時が必要です".to_string())
                })?;
                TemplateDetail::BusinessTrip(TripFields::new(
                    location,
                    transportation,
                    record.trip_purpose,
                    record.trip_remark,
                    starts_at,
                    ends_at,
                )?)
            }
        };

        let state = match record.status {
            DocumentStatus::InProgress => DocumentState::InProgress,
            DocumentStatus::Approved => {
                let decided_at = record.decided_at.ok_or_else(|| {
                    DomainError::Validation(
                        "承認済み文書には decided_at が必要です".to_string(),
                    )
                })?;
                DocumentState::Approved(DecidedState { decided_at })
            }
            DocumentStatus::Rejected => {
                let decided_at = record.decided_at.ok_or_else(|| {
                    DomainError::Validation(
                        "却下済み文書には decided_at が必要です".to_string(),
                    )
                })?;
                DocumentState::Rejected(DecidedState { decided_at })
            }
        };

        Ok(Self {
            id: record.id,
            title: record.title,
            content: record.content,
            created_by: record.created_by,
            template: record.template,
            detail,
            updated_by: record.updated_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
            state,
        })
    }

    // Getter メソッド

    pub fn id(&self) -> &ApprovalDocumentId {
        &self.id
    }

    pub fn title(&self) -> &DocumentTitle {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_by(&self) -> &EmployeeId {
        &self.created_by
    }

    pub fn template(&self) -> &TemplateDescriptor {
        &self.template
    }

    pub fn detail(&self) -> &TemplateDetail {
        &self.detail
    }

    pub fn updated_by(&self) -> &EmployeeId {
        &self.updated_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 状態への直接アクセス（パターンマッチ用）
    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    pub fn status(&self) -> DocumentStatus {
        match &self.state {
            DocumentState::InProgress => DocumentStatus::InProgress,
            DocumentState::Approved(_) => DocumentStatus::Approved,
            DocumentState::Rejected(_) => DocumentStatus::Rejected,
        }
    }

    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            DocumentState::InProgress => None,
            DocumentState::Approved(s) | DocumentState::Rejected(s) => Some(s.decided_at),
        }
    }

    // ビジネスロジックメソッド

    /// 文書を承認で確定した新しいインスタンスを返す
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidState`: すでに確定済みの場合
    pub fn approved(self, actor: EmployeeId, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status().is_terminal() {
            return Err(DomainError::InvalidState(format!(
                "確定済みの文書は承認できません（現在: {}）",
                self.status()
            )));
        }

        Ok(Self {
            state: DocumentState::Approved(DecidedState { decided_at: now }),
            updated_by: actor,
            updated_at: now,
            ..self
        })
    }

    /// 文書を却下で確定した新しいインスタンスを返す
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidState`: すでに確定済みの場合
    pub fn rejected(self, actor: EmployeeId, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status().is_terminal() {
            return Err(DomainError::InvalidState(format!(
                "確定済みの文書は却下できません（現在: {}）",
                self.status()
            )));
        }

        Ok(Self {
            state: DocumentState::Rejected(DecidedState { decided_at: now }),
            updated_by: actor,
            updated_at: now,
            ..self
        })
    }

    /// 最終更新者と更新日時だけを記録した新しいインスタンスを返す
    ///
    /// 中間承認のように文書の状態は変わらないが、判断した社員を
    /// 最終更新者として残す場合に使用する。
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidState`: すでに確定済みの場合
    pub fn touched(self, actor: EmployeeId, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status().is_terminal() {
            return Err(DomainError::InvalidState(format!(
                "確定済みの文書は更新できません（現在: {}）",
                self.status()
            )));
        }

        Ok(Self {
            updated_by: actor,
            updated_at: now,
            ..self
        })
    }
}
