/// サブスクリプション台帳エンジン
///
/// サブスクリプション一覧に対する純粋関数の集まり。I/Oは行わず、
/// 日付パターンと「今日」は毎回引数で受け取る（グローバルな設定は読まない）。
/// 不正な日付は例外にせず、ロールオーバーでは素通し、集計・フィルタでは除外として扱う。
use super::models::{
    Countdown, DatePattern, DueStatus, FilteredEntry, RolloverOutcome, SeverityBand,
    SubscriptionRecord, Totals,
};
use crate::features::settings::Language;
use crate::shared::errors::AppError;
use chrono::{Datelike, Months, NaiveDate};
use thiserror::Error;

/// 緊急度「Safe」となる残り日数の下限（この値より大きい）
pub const SAFE_THRESHOLD_DAYS: i64 = 20;
/// 緊急度「Critical」となる残り日数の上限（この値以下）
pub const CRITICAL_THRESHOLD_DAYS: i64 = 5;

/// 日付テキストがパターンに一致しない
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("日付 \"{text}\" はパターン {pattern} に一致しません")]
pub struct InvalidDate {
    pub text: String,
    pub pattern: DatePattern,
}

/// 入力内容のバリデーションエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DraftError {
    /// サービス名が空
    #[error("サービス名を入力してください")]
    EmptyName,
    /// 金額が0以下、または数値でない
    #[error("金額は正の数値である必要があります")]
    NonPositiveAmount,
}

impl DraftError {
    /// ユーザー向けメッセージ（「すべての項目を入力してください」相当）
    pub fn user_message(&self, language: Language) -> &'static str {
        language.pick("Complete todos los campos", "Fill all fields")
    }
}

impl From<DraftError> for AppError {
    fn from(error: DraftError) -> Self {
        AppError::validation(error.to_string())
    }
}

impl From<InvalidDate> for AppError {
    fn from(error: InvalidDate) -> Self {
        AppError::validation(error.to_string())
    }
}

/// 入力内容を検証する
///
/// 名前が空白のみ、または金額が0以下（NaN・無限大を含む）の場合はエラー。
pub fn validate_draft(name: &str, amount: f64) -> Result<(), DraftError> {
    if name.trim().is_empty() {
        return Err(DraftError::EmptyName);
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DraftError::NonPositiveAmount);
    }
    Ok(())
}

/// 最終支払日から次回支払日を導出する（1暦月後）
///
/// 月末は短い月に合わせて丸める（1/31 → 2/28 または 2/29）。
/// Noneになるのは暦の上限を超える場合のみ。
pub fn derive_next_payment(last_payment: NaiveDate) -> Option<NaiveDate> {
    last_payment.checked_add_months(Months::new(1))
}

/// 日付テキストをパターンに従って解析する
pub fn parse_record_date(text: &str, pattern: DatePattern) -> Result<NaiveDate, InvalidDate> {
    NaiveDate::parse_from_str(text.trim(), pattern.chrono_format()).map_err(|_| InvalidDate {
        text: text.to_string(),
        pattern,
    })
}

/// 日付をパターンに従ってテキスト化する
pub fn format_record_date(date: NaiveDate, pattern: DatePattern) -> String {
    date.format(pattern.chrono_format()).to_string()
}

/// `to - from` の日数（符号付き）
pub fn days_between(to: NaiveDate, from: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// 次回支払日までの残り日数
///
/// 正は残り日数、負は超過日数。次回支払日が解析できない場合は0。
pub fn days_remaining(next_payment: &str, pattern: DatePattern, today: NaiveDate) -> i64 {
    match parse_record_date(next_payment, pattern) {
        Ok(next) => days_between(next, today),
        Err(_) => 0,
    }
}

/// 日付が今日と同じ年月かどうか
pub fn is_in_current_month(date: NaiveDate, today: NaiveDate) -> bool {
    date.year() == today.year() && date.month() == today.month()
}

/// 次回支払日が過ぎていれば支払日を進める
///
/// 次回支払日が今日より前（当日は対象外）の場合、過ぎた支払日を新しい最終支払日とし、
/// その1か月後を次回支払日とする。1か月以上放置されていた場合は、支払日の連鎖
/// （各支払日の1か月後）を今日より前で最後の支払日までたどるため、結果の次回支払日は
/// 必ず今日以降になり、毎日適用した場合と同じ日付になる。
/// よって同じ`today`で2回適用しても結果は変わらない。
///
/// 次回支払日が解析できないレコードはそのまま返す。
pub fn rollover_if_due(
    record: &SubscriptionRecord,
    today: NaiveDate,
    pattern: DatePattern,
) -> SubscriptionRecord {
    let next = match parse_record_date(&record.next_payment, pattern) {
        Ok(next) => next,
        Err(e) => {
            log::debug!("ロールオーバー対象外（日付不正）: name={}, {e}", record.name);
            return record.clone();
        }
    };

    if days_between(next, today) >= 0 {
        return record.clone();
    }

    match advance_past_due(next, today) {
        Some((new_last, new_next)) => {
            log::debug!(
                "ロールオーバー: name={}, {} -> last={}, next={}",
                record.name,
                record.next_payment,
                new_last,
                new_next
            );
            SubscriptionRecord {
                last_payment: format_record_date(new_last, pattern),
                next_payment: format_record_date(new_next, pattern),
                ..record.clone()
            }
        }
        None => {
            log::warn!(
                "ロールオーバーできませんでした（暦の範囲外）: name={}",
                record.name
            );
            record.clone()
        }
    }
}

/// 過ぎた支払日 `due` から、今日より前で最後の支払日とその次の支払日を求める
///
/// `derive_next_payment` を1か月ずつ適用して連鎖をたどる。月末の丸めは連鎖の中で
/// 累積する（1/31 → 2/29 → 3/29）。繰り返しは年月の差で上限が決まる。
fn advance_past_due(due: NaiveDate, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let mut last = due;
    let mut next = derive_next_payment(last)?;
    while next < today {
        last = next;
        next = derive_next_payment(last)?;
    }
    Some((last, next))
}

/// 全レコードにロールオーバーを適用する（順序と位置は保持）
pub fn rollover_all(
    records: &[SubscriptionRecord],
    today: NaiveDate,
    pattern: DatePattern,
) -> Vec<SubscriptionRecord> {
    records
        .iter()
        .map(|record| rollover_if_due(record, today, pattern))
        .collect()
}

/// 全レコードにロールオーバーを適用し、変更されたインデックスも返す
pub fn rollover_report(
    records: &[SubscriptionRecord],
    today: NaiveDate,
    pattern: DatePattern,
) -> RolloverOutcome {
    let mut rolled_over = Vec::new();
    let updated = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let next = rollover_if_due(record, today, pattern);
            if next != *record {
                rolled_over.push(index);
            }
            next
        })
        .collect();

    RolloverOutcome {
        records: updated,
        rolled_over,
    }
}

/// 今月分と全体の合計金額を計算する
///
/// 次回支払日が解析できないレコードは今月分から除外し、全体には含める。
pub fn aggregate_totals(
    records: &[SubscriptionRecord],
    today: NaiveDate,
    pattern: DatePattern,
) -> Totals {
    records.iter().fold(Totals::default(), |mut acc, record| {
        if is_due_this_month(record, today, pattern) {
            acc.current_month_total += record.amount;
        }
        acc.total += record.amount;
        acc
    })
}

fn is_due_this_month(record: &SubscriptionRecord, today: NaiveDate, pattern: DatePattern) -> bool {
    parse_record_date(&record.next_payment, pattern)
        .map(|next| is_in_current_month(next, today))
        .unwrap_or(false)
}

/// 名前の部分一致（大文字小文字を区別しない）と今月分の条件でフィルタする
///
/// 空の検索語はすべてに一致する。元の一覧は変更せず、元のインデックス付きのビューを返す。
pub fn filter_records<'a>(
    records: &'a [SubscriptionRecord],
    query: &str,
    restrict_to_current_month: bool,
    today: NaiveDate,
    pattern: DatePattern,
) -> Vec<FilteredEntry<'a>> {
    let needle = query.to_lowercase();

    records
        .iter()
        .enumerate()
        .filter(|(_, record)| needle.is_empty() || record.name.to_lowercase().contains(&needle))
        .filter(|(_, record)| {
            !restrict_to_current_month || is_due_this_month(record, today, pattern)
        })
        .map(|(index, record)| FilteredEntry { index, record })
        .collect()
}

/// 残り日数から緊急度を分類する
///
/// 今月の支払いでない場合は常にNeutral。
pub fn severity_band(days_remaining: i64, is_current_month: bool) -> SeverityBand {
    if !is_current_month {
        SeverityBand::Neutral
    } else if days_remaining > SAFE_THRESHOLD_DAYS {
        SeverityBand::Safe
    } else if days_remaining > CRITICAL_THRESHOLD_DAYS {
        SeverityBand::Warning
    } else {
        SeverityBand::Critical
    }
}

/// 1件のカウントダウン状態を計算する
pub fn countdown(record: &SubscriptionRecord, today: NaiveDate, pattern: DatePattern) -> Countdown {
    match parse_record_date(&record.next_payment, pattern) {
        Ok(next) => {
            let days = days_between(next, today);
            let is_current_month = is_in_current_month(next, today);
            let status = match days {
                d if d > 0 => DueStatus::DaysLeft,
                0 => DueStatus::DueToday,
                _ => DueStatus::Overdue,
            };
            Countdown {
                days_remaining: days,
                is_current_month,
                band: severity_band(days, is_current_month),
                status,
            }
        }
        Err(_) => Countdown {
            days_remaining: 0,
            is_current_month: false,
            band: SeverityBand::Neutral,
            status: DueStatus::Unknown,
        },
    }
}
