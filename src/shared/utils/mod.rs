use once_cell::sync::Lazy;
use regex::Regex;

/// 金額入力から数字と小数点以外を取り除くための正規表現
static NON_AMOUNT_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9.]").expect("金額用正規表現のコンパイルに失敗"));

/// 表示時の小数点以下の最大桁数
const MAX_FRACTION_DIGITS: usize = 3;

/// 数値の区切り文字（ロケールごと）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberSeparators {
    /// 桁区切り
    pub grouping: char,
    /// 小数点
    pub decimal: char,
}

/// 金額入力文字列を正規化する
///
/// 数字と小数点以外の文字（通貨記号、空白、桁区切りのカンマなど）を取り除く。
pub fn sanitize_amount_input(input: &str) -> String {
    NON_AMOUNT_CHARS.replace_all(input, "").into_owned()
}

/// 金額入力文字列を数値に変換する
///
/// # 戻り値
/// 正規化後に有限の数値として解釈できた場合はSome
pub fn parse_amount_input(input: &str) -> Option<f64> {
    let sanitized = sanitize_amount_input(input);
    if sanitized.is_empty() {
        return None;
    }
    sanitized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// ロケールの区切り文字に従って金額入力文字列を数値に変換する
///
/// 桁区切りを取り除き、小数点を `.` に置き換えてから `parse_amount_input` で解釈する。
///
/// # 例
/// * `"39.900"` (`.`/`,`) -> `39900.0`
/// * `"$ 39,900.50"` (`,`/`.`) -> `39900.5`
pub fn parse_localized_amount(input: &str, separators: NumberSeparators) -> Option<f64> {
    let normalized: String = input
        .chars()
        .filter(|c| *c != separators.grouping)
        .map(|c| if c == separators.decimal { '.' } else { c })
        .collect();
    parse_amount_input(&normalized)
}

/// 文字列の正規化（前後の空白を削除）
pub fn normalize_string(text: &str) -> String {
    text.trim().to_string()
}

/// 金額をロケールの区切り文字でフォーマットする
///
/// 通貨記号は付けない。小数点以下は最大3桁で、末尾の0は表示しない。
///
/// # 例
/// * `39900.0` (`.`/`,`) -> `"39.900"`
/// * `1234.5` (`,`/`.`) -> `"1,234.5"`
pub fn format_amount(amount: f64, separators: NumberSeparators) -> String {
    if !amount.is_finite() {
        return amount.to_string();
    }

    let negative = amount < 0.0;
    let fixed = format!("{:.*}", MAX_FRACTION_DIGITS, amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separators.grouping);
        }
        grouped.push(*digit);
    }

    let mut result = String::new();
    if negative && (grouped.chars().any(|c| c != '0') || !frac_part.is_empty()) {
        result.push('-');
    }
    result.push_str(&grouped);
    if !frac_part.is_empty() {
        result.push(separators.decimal);
        result.push_str(frac_part);
    }
    result
}
