use super::csv_exchange::{self, CsvImport};
use super::ledger;
use super::models::{
    Countdown, DatePattern, FilteredEntry, SubscriptionDraft, SubscriptionRecord, Totals,
};
use super::storage::SubscriptionStore;
use crate::features::settings::{AppSettings, Language};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{format_amount, normalize_string, parse_localized_amount};
use chrono::NaiveDate;

/// ユーザーへの通知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Deleted,
    Imported(usize),
    ImportFailed,
    ExportSucceeded,
    ExportFailed,
    IncompleteFields,
}

impl Notice {
    /// 言語に応じた通知メッセージ
    pub fn message(&self, language: Language) -> String {
        match self {
            Notice::Deleted => language.pick("Eliminada", "Deleted").to_string(),
            Notice::Imported(count) => match language {
                Language::Es => format!("Importadas {count} suscripciones"),
                Language::En => format!("Imported {count} subscriptions"),
            },
            Notice::ImportFailed => language
                .pick("Error al importar archivo CSV", "Failed to import CSV file")
                .to_string(),
            Notice::ExportSucceeded => language
                .pick("Exportado correctamente", "Export successful")
                .to_string(),
            Notice::ExportFailed => language.pick("Error al exportar", "Export failed").to_string(),
            Notice::IncompleteFields => language
                .pick("Complete todos los campos", "Fill all fields")
                .to_string(),
        }
    }
}

/// サブスクリプション一覧の管理
///
/// メモリ上の一覧（唯一の書き込み可能なコピー）と保存先を持つ。
/// 変更は先に保存し、保存に成功した場合のみメモリに反映する。
/// 日付パターンは保持している設定から取り、エンジンに毎回渡す。
pub struct SubscriptionService<S: SubscriptionStore> {
    store: S,
    records: Vec<SubscriptionRecord>,
    settings: AppSettings,
}

impl<S: SubscriptionStore> SubscriptionService<S> {
    pub fn new(store: S, settings: AppSettings) -> Self {
        Self {
            store,
            records: Vec::new(),
            settings,
        }
    }

    pub fn records(&self) -> &[SubscriptionRecord] {
        &self.records
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> AppSettings {
        self.settings
    }

    pub fn pattern(&self) -> DatePattern {
        self.settings.date_pattern()
    }

    /// 設定を切り替える
    ///
    /// 保存済みの日付テキストは変換しない。
    pub fn set_settings(&mut self, settings: AppSettings) {
        if settings.date_pattern() != self.pattern() {
            log::warn!(
                "日付パターンを変更しました: {} -> {}（既存の日付は変換されません）",
                self.pattern(),
                settings.date_pattern()
            );
        }
        self.settings = settings;
    }

    /// 言語に応じた通知メッセージ
    pub fn notice(&self, notice: Notice) -> String {
        notice.message(self.settings.language)
    }

    /// 保存先から一覧を読み込む
    ///
    /// # 戻り値
    /// 読み込んだ件数
    pub async fn load(&mut self) -> AppResult<usize> {
        let records = self.store.load().await?;
        log::info!(
            "{}から読み込みました: count={}",
            self.store.describe(),
            records.len()
        );
        self.records = records;
        Ok(self.records.len())
    }

    /// メモリ上の一覧を破棄して読み込み直す
    pub async fn force_reload(&mut self) -> AppResult<usize> {
        log::info!("一覧を強制的に再読み込みします");
        self.load().await
    }

    /// サブスクリプションを追加する
    ///
    /// # 戻り値
    /// 追加したレコードのインデックス
    pub async fn add(&mut self, draft: SubscriptionDraft) -> AppResult<usize> {
        let record = self.record_from_draft(&draft)?;

        let mut next = self.records.clone();
        next.push(record);
        self.commit(next).await?;

        let index = self.records.len() - 1;
        log::info!("サブスクリプションを追加しました: index={index}");
        Ok(index)
    }

    /// サブスクリプションを更新する
    pub async fn update(&mut self, index: usize, draft: SubscriptionDraft) -> AppResult<()> {
        self.ensure_index(index)?;
        let record = self.record_from_draft(&draft)?;

        let mut next = self.records.clone();
        next[index] = record;
        self.commit(next).await?;

        log::info!("サブスクリプションを更新しました: index={index}");
        Ok(())
    }

    /// サブスクリプションを削除する
    ///
    /// # 戻り値
    /// 削除したレコード
    pub async fn delete(&mut self, index: usize) -> AppResult<SubscriptionRecord> {
        self.ensure_index(index)?;

        let mut next = self.records.clone();
        let removed = next.remove(index);
        self.commit(next).await?;

        log::info!("サブスクリプションを削除しました: index={index}");
        Ok(removed)
    }

    /// 全件にロールオーバーを適用する
    ///
    /// 変更があった場合のみ保存する。
    ///
    /// # 戻り値
    /// 日付が進められたレコードのインデックス
    pub async fn refresh_all(&mut self, today: NaiveDate) -> AppResult<Vec<usize>> {
        let outcome = ledger::rollover_report(&self.records, today, self.pattern());
        if !outcome.changed() {
            log::debug!("ロールオーバー対象はありません");
            return Ok(Vec::new());
        }

        self.commit(outcome.records).await?;
        log::info!(
            "ロールオーバーを適用しました: indexes={:?}",
            outcome.rolled_over
        );
        Ok(outcome.rolled_over)
    }

    /// 1件にロールオーバーを適用する
    ///
    /// # 戻り値
    /// 日付が進められた場合はtrue
    pub async fn refresh_single(&mut self, index: usize, today: NaiveDate) -> AppResult<bool> {
        self.ensure_index(index)?;

        let rolled = ledger::rollover_if_due(&self.records[index], today, self.pattern());
        if rolled == self.records[index] {
            return Ok(false);
        }

        let mut next = self.records.clone();
        next[index] = rolled;
        self.commit(next).await?;
        log::info!("ロールオーバーを適用しました: index={index}");
        Ok(true)
    }

    /// CSVテキストを取り込み、一覧の末尾に追加する
    pub async fn import_csv(&mut self, text: &str) -> AppResult<CsvImport> {
        let imported = csv_exchange::import_csv(text);
        if imported.records.is_empty() {
            return Ok(imported);
        }

        let mut next = self.records.clone();
        next.extend(imported.records.iter().cloned());
        self.commit(next).await?;
        Ok(imported)
    }

    /// 一覧をCSVテキストに変換する
    pub fn export_csv(&self) -> String {
        csv_exchange::export_csv(&self.records)
    }

    /// 合計金額
    pub fn totals(&self, today: NaiveDate) -> Totals {
        ledger::aggregate_totals(&self.records, today, self.pattern())
    }

    /// フィルタ済みの一覧
    pub fn filtered(
        &self,
        query: &str,
        restrict_to_current_month: bool,
        today: NaiveDate,
    ) -> Vec<FilteredEntry<'_>> {
        ledger::filter_records(
            &self.records,
            query,
            restrict_to_current_month,
            today,
            self.pattern(),
        )
    }

    /// 全件のカウントダウン（一覧と同じ順序）
    pub fn countdowns(&self, today: NaiveDate) -> Vec<Countdown> {
        self.records
            .iter()
            .map(|record| ledger::countdown(record, today, self.pattern()))
            .collect()
    }

    /// 金額を現在の地域の形式で表示する
    pub fn display_amount(&self, amount: f64) -> String {
        format_amount(amount, self.settings.region.number_separators())
    }

    /// フォーム入力から入力内容を作成する
    ///
    /// 金額は現在の地域の桁区切りと小数点に従い、通貨記号を取り除いてから解釈する。
    /// 日付は現在のパターンで解析する。
    pub fn draft_from_input(
        &self,
        name: &str,
        last_payment: &str,
        amount: &str,
    ) -> AppResult<SubscriptionDraft> {
        let amount = parse_localized_amount(amount, self.settings.region.number_separators())
            .ok_or(ledger::DraftError::NonPositiveAmount)?;
        ledger::validate_draft(name, amount)?;
        let last_payment = ledger::parse_record_date(last_payment, self.pattern())?;

        Ok(SubscriptionDraft {
            name: normalize_string(name),
            last_payment,
            amount,
        })
    }

    fn record_from_draft(&self, draft: &SubscriptionDraft) -> AppResult<SubscriptionRecord> {
        ledger::validate_draft(&draft.name, draft.amount)?;

        let next_payment = ledger::derive_next_payment(draft.last_payment).ok_or_else(|| {
            AppError::validation(format!(
                "次回支払日を計算できません: {}",
                draft.last_payment
            ))
        })?;

        Ok(SubscriptionRecord {
            name: normalize_string(&draft.name),
            last_payment: ledger::format_record_date(draft.last_payment, self.pattern()),
            next_payment: ledger::format_record_date(next_payment, self.pattern()),
            amount: draft.amount,
        })
    }

    fn ensure_index(&self, index: usize) -> AppResult<()> {
        if index < self.records.len() {
            Ok(())
        } else {
            Err(AppError::not_found(format!("インデックス {index} のサブスクリプション")))
        }
    }

    /// 保存に成功した場合のみメモリ上の一覧を置き換える
    async fn commit(&mut self, next: Vec<SubscriptionRecord>) -> AppResult<()> {
        if let Err(e) = self.store.save(&next).await {
            log::error!(
                "{}への保存に失敗したため、変更を破棄しました: {}",
                self.store.describe(),
                e.details()
            );
            return Err(e);
        }
        self.records = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::settings::Region;
    use crate::features::subscriptions::repository::LocalSubscriptionStore;
    use crate::shared::database::create_tables;
    use rusqlite::Connection;

    /// 保存に必ず失敗する保存先
    struct FailingStore;

    impl SubscriptionStore for FailingStore {
        async fn load(&self) -> AppResult<Vec<SubscriptionRecord>> {
            Err(AppError::Database("読み込み失敗".to_string()))
        }

        async fn save(&self, _records: &[SubscriptionRecord]) -> AppResult<()> {
            Err(AppError::Database("書き込み失敗".to_string()))
        }

        fn describe(&self) -> &'static str {
            "テスト用ストア"
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn local_service() -> SubscriptionService<LocalSubscriptionStore> {
        let conn = Connection::open_in_memory().expect("テスト用データベースの作成に失敗");
        create_tables(&conn).unwrap();
        SubscriptionService::new(
            LocalSubscriptionStore::from_connection(conn),
            AppSettings::default(),
        )
    }

    fn draft(name: &str, last_payment: NaiveDate, amount: f64) -> SubscriptionDraft {
        SubscriptionDraft {
            name: name.to_string(),
            last_payment,
            amount,
        }
    }

    #[tokio::test]
    async fn test_add_derives_next_payment_and_persists() {
        let mut service = local_service();

        let index = service
            .add(draft("  Netflix ", date(2024, 1, 15), 39900.0))
            .await
            .unwrap();

        assert_eq!(index, 0);
        assert_eq!(
            service.records()[0],
            SubscriptionRecord::new("Netflix", "15/01/2024", "15/02/2024", 39900.0)
        );
        assert_eq!(service.store().load().await.unwrap(), service.records());
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_draft() {
        let mut service = local_service();

        let error = service
            .add(draft("", date(2024, 1, 15), 39900.0))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));

        let error = service
            .add(draft("Netflix", date(2024, 1, 15), 0.0))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
        assert!(service.records().is_empty());
        assert_eq!(service.notice(Notice::IncompleteFields), "Complete todos los campos");
    }

    #[test]
    fn test_draft_from_input() {
        let service = local_service();

        let parsed = service
            .draft_from_input(" Netflix ", "15/01/2024", "$ 39.900")
            .unwrap();
        assert_eq!(parsed, draft("Netflix", date(2024, 1, 15), 39900.0));
        let parsed = service
            .draft_from_input("Spotify", "15/01/2024", "1.234,5")
            .unwrap();
        assert_eq!(parsed.amount, 1234.5);

        assert!(matches!(
            service.draft_from_input("Netflix", "15/01/2024", "abc"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.draft_from_input("Netflix", "01/15/2024", "100"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_draft_from_input_uses_region_separators() {
        let mut service = local_service();
        service.set_settings(AppSettings {
            language: Language::En,
            region: Region::Us,
        });

        let parsed = service
            .draft_from_input("Netflix", "01/15/2024", "$ 39,900.50")
            .unwrap();
        assert_eq!(parsed, draft("Netflix", date(2024, 1, 15), 39900.5));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let mut service = local_service();
        service
            .add(draft("Netflix", date(2024, 1, 15), 39900.0))
            .await
            .unwrap();
        service
            .add(draft("Spotify", date(2024, 2, 1), 16900.0))
            .await
            .unwrap();

        service
            .update(1, draft("Spotify Duo", date(2024, 1, 31), 21900.0))
            .await
            .unwrap();
        assert_eq!(
            service.records()[1],
            SubscriptionRecord::new("Spotify Duo", "31/01/2024", "29/02/2024", 21900.0)
        );

        let removed = service.delete(0).await.unwrap();
        assert_eq!(removed.name, "Netflix");
        assert_eq!(service.records().len(), 1);
        assert_eq!(service.records()[0].name, "Spotify Duo");

        service.force_reload().await.unwrap();
        assert_eq!(service.records().len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_index_is_not_found() {
        let mut service = local_service();

        assert!(matches!(
            service.delete(0).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service
                .update(3, draft("Netflix", date(2024, 1, 15), 1.0))
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.refresh_single(0, date(2024, 2, 20)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_all_rolls_over_and_persists() {
        let mut service = local_service();
        service
            .add(draft("Netflix", date(2024, 1, 15), 39900.0))
            .await
            .unwrap();
        service
            .add(draft("Future", date(2024, 2, 18), 500.0))
            .await
            .unwrap();

        let rolled = service.refresh_all(date(2024, 2, 20)).await.unwrap();
        assert_eq!(rolled, vec![0]);
        assert_eq!(service.records()[0].last_payment, "15/02/2024");
        assert_eq!(service.records()[0].next_payment, "15/03/2024");

        // 2回目は変更なし
        assert!(service.refresh_all(date(2024, 2, 20)).await.unwrap().is_empty());
        assert_eq!(service.store().load().await.unwrap(), service.records());
    }

    #[tokio::test]
    async fn test_refresh_single() {
        let mut service = local_service();
        service
            .add(draft("Netflix", date(2024, 1, 15), 39900.0))
            .await
            .unwrap();

        assert!(!service.refresh_single(0, date(2024, 2, 15)).await.unwrap());
        assert!(service.refresh_single(0, date(2024, 2, 16)).await.unwrap());
        assert_eq!(service.records()[0].next_payment, "15/03/2024");
    }

    #[tokio::test]
    async fn test_import_appends_and_export() {
        let mut service = local_service();
        service
            .add(draft("Netflix", date(2024, 1, 15), 39900.0))
            .await
            .unwrap();

        let text = "\"Name\",\"Last Payment\",\"Next Payment\",\"Amount\"\n\
                    \"Spotify\",\"01/02/2024\",\"01/03/2024\",16900\n\
                    \"Broken\"";
        let imported = service.import_csv(text).await.unwrap();

        assert_eq!(imported.records.len(), 1);
        assert_eq!(imported.skipped.len(), 1);
        assert_eq!(service.records().len(), 2);
        assert_eq!(service.records()[1].name, "Spotify");
        assert_eq!(
            service.notice(Notice::Imported(imported.records.len())),
            "Importadas 1 suscripciones"
        );

        let exported = service.export_csv();
        assert_eq!(exported.lines().count(), 3);
        assert!(exported.ends_with("\"Spotify\",\"01/02/2024\",\"01/03/2024\",16900"));
    }

    #[tokio::test]
    async fn test_queries_use_region_pattern() {
        let mut service = local_service();
        service.set_settings(AppSettings {
            language: Language::En,
            region: Region::Us,
        });
        service
            .add(draft("Netflix", date(2024, 1, 15), 39900.0))
            .await
            .unwrap();
        service
            .add(draft("Hulu", date(2024, 2, 10), 7.99))
            .await
            .unwrap();

        assert_eq!(service.records()[0].next_payment, "02/15/2024");

        let today = date(2024, 2, 1);
        let totals = service.totals(today);
        assert_eq!(totals.current_month_total, 39900.0);
        assert_eq!(totals.total, 39900.0 + 7.99);

        let filtered = service.filtered("hu", false, today);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].index, 1);

        let countdowns = service.countdowns(today);
        assert_eq!(countdowns[0].days_remaining, 14);
        assert_eq!(countdowns[1].days_remaining, 38);

        assert_eq!(service.display_amount(39900.0), "39,900");
        assert_eq!(service.notice(Notice::Deleted), "Deleted");
    }

    #[tokio::test]
    async fn test_storage_failure_leaves_memory_untouched() {
        let mut service = SubscriptionService::new(FailingStore, AppSettings::default());

        let error = service
            .add(draft("Netflix", date(2024, 1, 15), 39900.0))
            .await
            .unwrap_err();
        assert!(error.is_storage_failure());
        assert!(service.records().is_empty());

        assert!(service.load().await.is_err());
        assert!(service.records().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_records() {
        let mut service = local_service();
        service
            .add(draft("Netflix", date(2024, 1, 15), 39900.0))
            .await
            .unwrap();
        let before = service.records().to_vec();

        let mut failing = SubscriptionService::new(FailingStore, AppSettings::default());
        failing.records = before.clone();

        assert!(failing.refresh_all(date(2024, 2, 20)).await.is_err());
        assert_eq!(failing.records(), before.as_slice());
    }
}
