use super::models::SubscriptionRecord;
use crate::shared::errors::AppResult;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// エクスポートCSVのヘッダー行
pub const CSV_HEADER: &str = r#""Name","Last Payment","Next Payment","Amount""#;

/// 取り込まなかった行の理由
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("必要な項目が不足しています")]
    MissingFields,
    #[error("金額 \"{0}\" を数値として解釈できません")]
    InvalidAmount(String),
}

/// 取り込まなかった行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1始まりの行番号（ヘッダーが1行目）
    pub line: usize,
    pub reason: SkipReason,
}

/// CSV取り込み結果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CsvImport {
    pub records: Vec<SubscriptionRecord>,
    pub skipped: Vec<SkippedRow>,
}

/// 一覧をCSVテキストに変換する
///
/// 1行目はヘッダー、以降は `"name","lastPayment","nextPayment",amount`。行区切りは `\n`。
/// 項目はエスケープしないため、名前に `"` や `,` を含むレコードは `import_csv` で
/// 元に戻らない（`"` は取り除かれ、`,` は列をずらす）。
pub fn export_csv(records: &[SubscriptionRecord]) -> String {
    std::iter::once(CSV_HEADER.to_string())
        .chain(records.iter().map(|r| {
            format!(
                "\"{}\",\"{}\",\"{}\",{}",
                r.name, r.last_payment, r.next_payment, r.amount
            )
        }))
        .collect::<Vec<_>>()
        .join("\n")
}

/// CSVテキストから一覧を取り込む
///
/// 1行目はヘッダーとして読み飛ばす。各行から `"` を取り除いてカンマで分割し、
/// 4項目のいずれかが空の行と、金額が数値でない行は取り込まずに `skipped` に記録する。
/// 空行は無視する。日付の形式はここでは検証しない。
pub fn import_csv(text: &str) -> CsvImport {
    let mut result = CsvImport::default();

    for (offset, line) in text.split('\n').enumerate().skip(1) {
        let line_number = offset + 1;
        let cleaned = line.replace('"', "");
        if cleaned.trim().is_empty() {
            continue;
        }

        match parse_row(&cleaned) {
            Ok(record) => result.records.push(record),
            Err(reason) => {
                log::warn!("CSVの{line_number}行目を取り込みませんでした: {reason}");
                result.skipped.push(SkippedRow {
                    line: line_number,
                    reason,
                });
            }
        }
    }

    log::info!(
        "CSVを取り込みました: imported={}, skipped={}",
        result.records.len(),
        result.skipped.len()
    );
    result
}

fn parse_row(cleaned: &str) -> Result<SubscriptionRecord, SkipReason> {
    let mut fields = cleaned.split(',').map(str::trim);
    let (Some(name), Some(last), Some(next), Some(amount)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(SkipReason::MissingFields);
    };

    if [name, last, next, amount].iter().any(|f| f.is_empty()) {
        return Err(SkipReason::MissingFields);
    }

    let amount_value = amount
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SkipReason::InvalidAmount(amount.to_string()))?;

    Ok(SubscriptionRecord::new(name, last, next, amount_value))
}

/// エクスポートファイル名（拡張子なし）
///
/// 例: `Subscriptions_20240215_093000`
pub fn export_file_name(now: NaiveDateTime) -> String {
    format!("Subscriptions_{}", now.format("%Y%m%d_%H%M%S"))
}

/// 一覧をCSVファイルとしてディレクトリに書き出す
///
/// # 引数
/// * `dir` - 書き出し先ディレクトリ
/// * `records` - 書き出す一覧
/// * `now` - ファイル名に使う日時
///
/// # 戻り値
/// 作成したファイルのパス
pub fn write_export(
    dir: &Path,
    records: &[SubscriptionRecord],
    now: NaiveDateTime,
) -> AppResult<PathBuf> {
    let path = dir.join(format!("{}.csv", export_file_name(now)));
    std::fs::write(&path, export_csv(records))?;
    log::info!("CSVを書き出しました: {path:?}, count={}", records.len());
    Ok(path)
}

/// CSVファイルを読み込んで取り込む
pub fn read_import(path: &Path) -> AppResult<CsvImport> {
    let text = std::fs::read_to_string(path)?;
    Ok(import_csv(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_records() -> Vec<SubscriptionRecord> {
        vec![
            SubscriptionRecord::new("Netflix", "15/01/2024", "15/02/2024", 39900.0),
            SubscriptionRecord::new("Spotify", "01/02/2024", "01/03/2024", 16900.5),
        ]
    }

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_export_format() {
        let csv = export_csv(&sample_records());
        assert_eq!(
            csv,
            "\"Name\",\"Last Payment\",\"Next Payment\",\"Amount\"\n\
             \"Netflix\",\"15/01/2024\",\"15/02/2024\",39900\n\
             \"Spotify\",\"01/02/2024\",\"01/03/2024\",16900.5"
        );
        assert_eq!(export_csv(&[]), CSV_HEADER);
    }

    #[test]
    fn test_import_exported_text() {
        let records = sample_records();
        let imported = import_csv(&export_csv(&records));

        assert_eq!(imported.records, records);
        assert!(imported.skipped.is_empty());
    }

    #[test]
    fn test_import_reports_malformed_rows() {
        let text = "\"Name\",\"Last Payment\",\"Next Payment\",\"Amount\"\n\
                    \"Netflix\",\"15/01/2024\",\"15/02/2024\",39900\n\
                    \"Broken\",\"15/01/2024\"\n\
                    \n\
                    \"NoAmount\",\"15/01/2024\",\"15/02/2024\",\n\
                    \"Text\",\"15/01/2024\",\"15/02/2024\",abc\r\n";
        let imported = import_csv(text);

        assert_eq!(imported.records.len(), 1);
        assert_eq!(imported.records[0].name, "Netflix");
        assert_eq!(
            imported.skipped,
            vec![
                SkippedRow {
                    line: 3,
                    reason: SkipReason::MissingFields
                },
                SkippedRow {
                    line: 5,
                    reason: SkipReason::MissingFields
                },
                SkippedRow {
                    line: 6,
                    reason: SkipReason::InvalidAmount("abc".to_string())
                },
            ]
        );
    }

    #[test]
    fn test_import_trims_fields_and_ignores_extra_columns() {
        let text = "header\n  Disney+ , 03/01/2024 ,03/02/2024, 25900 ,extra\r\n";
        let imported = import_csv(text);

        assert_eq!(
            imported.records,
            vec![SubscriptionRecord::new("Disney+", "03/01/2024", "03/02/2024", 25900.0)]
        );
    }

    #[test]
    fn test_names_with_quotes_or_commas_are_not_escaped() {
        let records = vec![
            SubscriptionRecord::new("Say \"Hi\"", "15/01/2024", "15/02/2024", 10.0),
            SubscriptionRecord::new("A, B", "15/01/2024", "15/02/2024", 10.0),
        ];
        let csv = export_csv(&records);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], r#""Say "Hi"","15/01/2024","15/02/2024",10"#);
        assert_eq!(lines[2], r#""A, B","15/01/2024","15/02/2024",10"#);

        let imported = import_csv(&csv);
        // 引用符は取り除かれる
        assert_eq!(
            imported.records,
            vec![SubscriptionRecord::new("Say Hi", "15/01/2024", "15/02/2024", 10.0)]
        );
        // カンマで列がずれ、日付が金額の位置に来る
        assert_eq!(
            imported.skipped,
            vec![SkippedRow {
                line: 3,
                reason: SkipReason::InvalidAmount("15/02/2024".to_string())
            }]
        );
    }

    #[test]
    fn test_import_header_only() {
        assert_eq!(import_csv(CSV_HEADER), CsvImport::default());
        assert_eq!(import_csv(""), CsvImport::default());
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name(timestamp()), "Subscriptions_20240215_093000");
    }

    #[test]
    fn test_write_and_read_files() {
        let temp_dir = TempDir::new().unwrap();
        let records = sample_records();

        let path = write_export(temp_dir.path(), &records, timestamp()).unwrap();
        assert!(path.ends_with("Subscriptions_20240215_093000.csv"));

        let imported = read_import(&path).unwrap();
        assert_eq!(imported.records, records);

        assert!(read_import(&temp_dir.path().join("missing.csv")).is_err());
    }
}
