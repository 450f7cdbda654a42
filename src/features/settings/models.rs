use crate::features::subscriptions::models::DatePattern;
use crate::shared::utils::NumberSeparators;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// 地域設定
///
/// 日付パターン、金額表示の区切り文字、「今日」を決めるタイムゾーンを選択する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Region {
    /// コロンビア（日付は dd/MM/yyyy）
    #[default]
    #[serde(rename = "CO")]
    Co,
    /// アメリカ合衆国（日付は MM/dd/yyyy）
    #[serde(rename = "US")]
    Us,
}

impl Region {
    /// 地域コードから地域を取得する（大文字小文字は区別しない）
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "CO" => Some(Region::Co),
            "US" => Some(Region::Us),
            _ => None,
        }
    }

    /// 地域コード
    pub fn code(&self) -> &'static str {
        match self {
            Region::Co => "CO",
            Region::Us => "US",
        }
    }

    /// この地域で使用する日付パターン
    pub fn date_pattern(&self) -> DatePattern {
        match self {
            Region::Co => DatePattern::DayFirst,
            Region::Us => DatePattern::MonthFirst,
        }
    }

    /// 金額表示の区切り文字（es-CO / en-US）
    pub fn number_separators(&self) -> NumberSeparators {
        match self {
            Region::Co => NumberSeparators {
                grouping: '.',
                decimal: ',',
            },
            Region::Us => NumberSeparators {
                grouping: ',',
                decimal: '.',
            },
        }
    }

    /// この地域のタイムゾーン
    pub fn timezone(&self) -> Tz {
        match self {
            Region::Co => chrono_tz::America::Bogota,
            Region::Us => chrono_tz::America::New_York,
        }
    }

    /// この地域での今日の日付
    ///
    /// エンジンは「今日」を引数で受け取るため、呼び出し側はこの値を渡す。
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone()).date_naive()
    }
}

/// 表示言語
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    /// スペイン語
    #[default]
    #[serde(rename = "es")]
    Es,
    /// 英語
    #[serde(rename = "en")]
    En,
}

impl Language {
    /// 言語コードから言語を取得する
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "es" => Some(Language::Es),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    /// 言語に応じた文字列を選択する
    pub fn pick<'a>(&self, es: &'a str, en: &'a str) -> &'a str {
        match self {
            Language::Es => es,
            Language::En => en,
        }
    }
}

/// アプリケーション設定
///
/// 保存形式は `{"lang": "es", "reg": "CO"}`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(rename = "lang", default)]
    pub language: Language,
    #[serde(rename = "reg", default)]
    pub region: Region,
}

impl AppSettings {
    /// 現在の地域の日付パターン
    pub fn date_pattern(&self) -> DatePattern {
        self.region.date_pattern()
    }
}
