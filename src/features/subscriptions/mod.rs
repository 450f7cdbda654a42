/// サブスクリプション機能モジュール
///
/// このモジュールは、サブスクリプション台帳に関連するすべての機能を提供します：
/// - 台帳エンジン（ロールオーバー、合計、フィルタ、緊急度）
/// - ローカル／リモートの保存先
/// - CSVの書き出しと取り込み
/// - 一覧を管理するサービス
pub mod csv_exchange;
pub mod ledger;
pub mod models;
pub mod remote;
pub mod repository;
pub mod service;
pub mod storage;

// 公開インターフェース
pub use csv_exchange::{
    export_csv, export_file_name, import_csv, read_import, write_export, CsvImport, SkipReason,
    SkippedRow,
};

pub use ledger::{
    aggregate_totals, countdown, days_between, days_remaining, derive_next_payment,
    filter_records, format_record_date, is_in_current_month, parse_record_date, rollover_all,
    rollover_if_due, rollover_report, severity_band, validate_draft, DraftError, InvalidDate,
};

pub use models::{
    Countdown, DatePattern, DueStatus, FilteredEntry, RolloverOutcome, SeverityBand,
    SubscriptionDraft, SubscriptionRecord, Totals,
};

pub use remote::RemoteSubscriptionStore;
pub use repository::{LocalSubscriptionStore, SUBSCRIPTIONS_KEY};
pub use service::{Notice, SubscriptionService};
pub use storage::SubscriptionStore;
