//! # 休暇カスケード
//!
//! 休暇申請が最終承認されたときの後続処理。承認と同一トランザクション内で
//! 実行し、いずれかが失敗した場合は承認ごと巻き戻す。
//!
//! 1. 休暇残日数の控除（残高不足は `Dependency` エラー）
//! 2. 期間中の各暦日への勤怠休暇マーク
//! 3. カレンダーへの休暇予定 1 件の登録

use chrono::{DateTime, NaiveDate, Utc};
use kessaiflow_domain::{
    approval::{ApprovalDocument, VacationFields},
    code::VacationKind,
};
use kessaiflow_infra::{calendar::NewCalendarEvent, db::TxContext};
use kessaiflow_shared::{event_log::event, log_business_event};

use super::ApprovalUseCase;
use crate::error::ApprovalError;

/// カレンダー予定のカテゴリ
const EVENT_CATEGORY: &str = "vacation";

impl ApprovalUseCase {
    /// 休暇カスケードを適用する
    pub(crate) async fn apply_vacation_cascade(
        &self,
        tx: &mut TxContext,
        document: &ApprovalDocument,
        fields: &VacationFields,
    ) -> Result<(), ApprovalError> {
        let applicant = document.created_by();
        let kind = fields.kind();

        self.leave.deduct(tx, applicant, fields.days()).await?;

        for date in calendar_days(fields.starts_at(), fields.ends_at()) {
            self.attendance
                .mark_on_leave(tx, applicant, date, kind)
                .await?;
        }

        let (starts_at, ends_at) = event_window(kind, fields.starts_at(), fields.ends_at());
        self.calendar
            .create_event(tx, NewCalendarEvent {
                employee_id: applicant.clone(),
                title: event_title(kind).to_string(),
                category: EVENT_CATEGORY.to_string(),
                starts_at,
                ends_at,
                note: Some(document.title().as_str().to_string()),
            })
            .await?;

        log_business_event!(
            event.category = event::category::VACATION,
            event.action = event::action::VACATION_APPLIED,
            event.entity_type = event::entity_type::APPROVAL_DOCUMENT,
            event.entity_id = %document.id(),
            event.actor_id = %applicant,
            event.result = event::result::SUCCESS,
            days = fields.days().as_f64(),
        );

        Ok(())
    }
}

/// 期間に含まれる暦日を列挙する（両端を含む）
fn calendar_days(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut date = starts_at.date_naive();
    let end = ends_at.date_naive();
    while date <= end {
        days.push(date);
        // NaiveDate の上限に達しない限り None にならない
        date = date.succ_opt().expect("暦日がオーバーフローしました");
    }

    days
}

/// カレンダー予定のタイトル
fn event_title(kind: VacationKind) -> &'static str {
    match kind {
        VacationKind::FullDay => "休暇",
        VacationKind::MorningHalf => "午前半休",
        VacationKind::AfternoonHalf => "午後半休",
    }
}

/// カレンダー予定の時間帯
///
/// - 全休: 開始日の 09:00 から終了日の 18:00
/// - 午前半休: 開始日の 09:00〜14:00
/// - 午後半休: 開始日の 14:00〜18:00
fn event_window(
    kind: VacationKind,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_date = starts_at.date_naive();
    match kind {
        VacationKind::FullDay => (at(start_date, 9), at(ends_at.date_naive(), 18)),
        VacationKind::MorningHalf => (at(start_date, 9), at(start_date, 14)),
        VacationKind::AfternoonHalf => (at(start_date, 14), at(start_date, 18)),
    }
}

fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    // 0..=23 の定数でのみ呼ぶため失敗しない
    date.and_hms_opt(hour, 0, 0)
        .expect("不正な時刻指定です")
        .and_utc()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn datetime(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_期間中の暦日が両端を含んで列挙される() {
        let days = calendar_days(datetime(2024, 6, 3, 0), datetime(2024, 6, 5, 23));

        assert_eq!(
            days,
            vec![date(2024, 6, 3), date(2024, 6, 4), date(2024, 6, 5)]
        );
    }

    #[test]
    fn test_単日の期間は1日だけになる() {
        let days = calendar_days(datetime(2024, 6, 3, 9), datetime(2024, 6, 3, 18));

        assert_eq!(days, vec![date(2024, 6, 3)]);
    }

    #[test]
    fn test_全休の予定は開始日9時から終了日18時() {
        let (start, end) = event_window(
            VacationKind::FullDay,
            datetime(2024, 6, 3, 0),
            datetime(2024, 6, 5, 0),
        );

        assert_eq!(start, datetime(2024, 6, 3, 9));
        assert_eq!(end, datetime(2024, 6, 5, 18));
    }

    #[test]
    fn test_午前半休の予定は開始日の9時から14時() {
        let (start, end) = event_window(
            VacationKind::MorningHalf,
            datetime(2024, 6, 3, 0),
            datetime(2024, 6, 3, 0),
        );

        assert_eq!(start, datetime(2024, 6, 3, 9));
        assert_eq!(end, datetime(2024, 6, 3, 14));
    }

    #[test]
    fn test_午後半休の予定は開始日の14時から18時() {
        let (start, end) = event_window(
            VacationKind::AfternoonHalf,
            datetime(2024, 6, 3, 0),
            datetime(2024, 6, 3, 0),
        );

        assert_eq!(start, datetime(2024, 6, 3, 14));
        assert_eq!(end, datetime(2024, 6, 3, 18));
    }

    #[test]
    fn test_予定タイトルはサブタイプごとに固定() {
        assert_eq!(event_title(VacationKind::FullDay), "休暇");
        assert_eq!(event_title(VacationKind::MorningHalf), "午前半休");
        assert_eq!(event_title(VacationKind::AfternoonHalf), "午後半休");
    }
}
