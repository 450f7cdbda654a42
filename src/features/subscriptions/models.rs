use serde::{Deserialize, Serialize};

/// サブスクリプションデータモデル
///
/// 保存・交換時の形は `{name, lastPayment, nextPayment, amount}`。
/// 日付は現在の地域の日付パターンで書かれたテキストのまま保持する。
/// 識別子は持たず、並び順の位置（インデックス）で識別する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub name: String,         // 表示名（空でないこと）
    pub last_payment: String, // 最終支払日
    pub next_payment: String, // 次回支払日（= 最終支払日 + 1か月）
    pub amount: f64,          // 月額（単一通貨、0以上）
}

impl SubscriptionRecord {
    pub fn new<S: Into<String>>(name: S, last_payment: S, next_payment: S, amount: f64) -> Self {
        Self {
            name: name.into(),
            last_payment: last_payment.into(),
            next_payment: next_payment.into(),
            amount,
        }
    }
}

/// サブスクリプション作成・更新用の入力
///
/// 次回支払日は最終支払日から導出するため入力には含めない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDraft {
    pub name: String,
    pub last_payment: chrono::NaiveDate,
    pub amount: f64,
}

/// 日付テキストのパターン
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DatePattern {
    /// `dd/MM/yyyy`
    #[default]
    #[serde(rename = "dd/MM/yyyy")]
    DayFirst,
    /// `MM/dd/yyyy`
    #[serde(rename = "MM/dd/yyyy")]
    MonthFirst,
}

impl DatePattern {
    /// パターンの表記（`dd/MM/yyyy` など）
    pub fn literal(&self) -> &'static str {
        match self {
            DatePattern::DayFirst => "dd/MM/yyyy",
            DatePattern::MonthFirst => "MM/dd/yyyy",
        }
    }

    /// chronoのフォーマット文字列
    pub fn chrono_format(&self) -> &'static str {
        match self {
            DatePattern::DayFirst => "%d/%m/%Y",
            DatePattern::MonthFirst => "%m/%d/%Y",
        }
    }
}

impl std::fmt::Display for DatePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.literal())
    }
}

/// 合計金額
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// 次回支払日が今月のサブスクリプションの合計
    pub current_month_total: f64,
    /// 全サブスクリプションの合計
    pub total: f64,
}

/// 支払いの緊急度（表示用の分類）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeverityBand {
    /// 今月の支払いではない
    Neutral,
    /// 残り20日超
    Safe,
    /// 残り6〜20日
    Warning,
    /// 残り5日以下（期限切れを含む）
    Critical,
}

impl SeverityBand {
    /// 表示用の色コード（Neutralはテーマの色を使うためNone）
    pub fn indicator_color(&self) -> Option<&'static str> {
        match self {
            SeverityBand::Neutral => None,
            SeverityBand::Safe => Some("#4CAF50"),
            SeverityBand::Warning => Some("#FF9800"),
            SeverityBand::Critical => Some("#F44336"),
        }
    }
}

/// 支払期限の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DueStatus {
    /// 残り日数あり
    DaysLeft,
    /// 今日が支払日
    DueToday,
    /// 期限切れ
    Overdue,
    /// 次回支払日が解析できない
    Unknown,
}

/// 1件ごとのカウントダウン状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    pub days_remaining: i64,
    pub is_current_month: bool,
    pub band: SeverityBand,
    pub status: DueStatus,
}

/// フィルタ結果の1件
///
/// 元の並びでのインデックスを保持するため、フィルタ後の一覧から編集・削除しても
/// 正しいレコードを指す。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredEntry<'a> {
    pub index: usize,
    pub record: &'a SubscriptionRecord,
}

/// 一括ロールオーバーの結果
#[derive(Debug, Clone, PartialEq)]
pub struct RolloverOutcome {
    /// ロールオーバー適用後のレコード（順序は入力と同じ）
    pub records: Vec<SubscriptionRecord>,
    /// 日付が進められたレコードのインデックス
    pub rolled_over: Vec<usize>,
}

impl RolloverOutcome {
    /// 変更があったかどうか（保存が必要かどうか）
    pub fn changed(&self) -> bool {
        !self.rolled_over.is_empty()
    }
}
