use super::models::SubscriptionRecord;
use super::storage::SubscriptionStore;
use crate::shared::database::{get_value, set_value};
use crate::shared::errors::{AppError, AppResult};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// サブスクリプション一覧を保存するキー
pub const SUBSCRIPTIONS_KEY: &str = "subscriptions";

/// サブスクリプション一覧を読み込む
///
/// # 引数
/// * `conn` - データベース接続
///
/// # 戻り値
/// 保存済みの一覧。未保存の場合は空の一覧、JSONが壊れている場合はエラー
pub fn load_records(conn: &Connection) -> AppResult<Vec<SubscriptionRecord>> {
    let Some(raw) = get_value(conn, SUBSCRIPTIONS_KEY)? else {
        log::debug!("サブスクリプションが未保存のため、空の一覧を返します");
        return Ok(Vec::new());
    };

    let records: Vec<SubscriptionRecord> = serde_json::from_str(&raw).map_err(|e| {
        log::error!("保存済みサブスクリプションの解析に失敗しました: {e}");
        AppError::from(e)
    })?;

    log::debug!("サブスクリプションを読み込みました: count={}", records.len());
    Ok(records)
}

/// サブスクリプション一覧を保存する（既存の一覧は置き換え）
///
/// # 引数
/// * `conn` - データベース接続
/// * `records` - 保存する一覧
pub fn save_records(conn: &Connection, records: &[SubscriptionRecord]) -> AppResult<()> {
    let raw = serde_json::to_string(records)?;
    set_value(conn, SUBSCRIPTIONS_KEY, &raw)?;
    log::debug!("サブスクリプションを保存しました: count={}", records.len());
    Ok(())
}

/// ローカルデータベースを使う保存先
#[derive(Clone)]
pub struct LocalSubscriptionStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalSubscriptionStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 接続を所有する保存先を作成する
    pub fn from_connection(conn: Connection) -> Self {
        Self::new(Arc::new(Mutex::new(conn)))
    }

    /// 共有している接続（設定の読み書きなどに使う）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::concurrency(format!("データベースロック取得エラー: {e}")))
    }
}

impl SubscriptionStore for LocalSubscriptionStore {
    async fn load(&self) -> AppResult<Vec<SubscriptionRecord>> {
        let conn = self.lock()?;
        load_records(&conn)
    }

    async fn save(&self, records: &[SubscriptionRecord]) -> AppResult<()> {
        let conn = self.lock()?;
        save_records(&conn, records)
    }

    fn describe(&self) -> &'static str {
        "ローカルストア"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::database::{create_tables, open_database};
    use tempfile::TempDir;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("テスト用データベースの作成に失敗");
        create_tables(&conn).unwrap();
        conn
    }

    fn sample_records() -> Vec<SubscriptionRecord> {
        vec![
            SubscriptionRecord::new("Netflix", "15/01/2024", "15/02/2024", 39900.0),
            SubscriptionRecord::new("Spotify", "01/02/2024", "01/03/2024", 16900.0),
        ]
    }

    #[test]
    fn test_load_records_when_nothing_stored() {
        let conn = create_test_db();
        assert!(load_records(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_records() {
        let conn = create_test_db();
        let records = sample_records();

        save_records(&conn, &records).unwrap();
        assert_eq!(load_records(&conn).unwrap(), records);

        // 上書き保存
        save_records(&conn, &records[..1]).unwrap();
        assert_eq!(load_records(&conn).unwrap(), records[..1].to_vec());
    }

    #[test]
    fn test_stored_shape_is_json_array() {
        let conn = create_test_db();
        save_records(&conn, &sample_records()[..1]).unwrap();

        let raw = get_value(&conn, SUBSCRIPTIONS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["lastPayment"], "15/01/2024");
        assert_eq!(value[0]["nextPayment"], "15/02/2024");
        assert_eq!(value[0]["amount"], 39900.0);
    }

    #[test]
    fn test_corrupted_records_are_an_error() {
        let conn = create_test_db();
        set_value(&conn, SUBSCRIPTIONS_KEY, "[{broken").unwrap();

        let error = load_records(&conn).unwrap_err();
        assert!(matches!(error, AppError::Json(_)));
    }

    #[tokio::test]
    async fn test_local_store_roundtrip() {
        let store = LocalSubscriptionStore::from_connection(create_test_db());
        let records = sample_records();

        assert!(store.load().await.unwrap().is_empty());
        store.save(&records).await.unwrap();
        assert_eq!(store.load().await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_local_store_persists_across_connections() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("subscriptions.db");
        let records = sample_records();

        {
            let store = LocalSubscriptionStore::from_connection(open_database(&db_path).unwrap());
            store.save(&records).await.unwrap();
        }

        let reopened = LocalSubscriptionStore::from_connection(open_database(&db_path).unwrap());
        assert_eq!(reopened.load().await.unwrap(), records);
    }
}
