use crate::shared::config::InitializationResult;
use crate::shared::errors::AppResult;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// データベース接続を初期化し、テーブルを作成する
///
/// # 引数
/// * `init` - アプリケーション初期化結果（データベースパスを含む）
///
/// # 戻り値
/// データベース接続、または失敗時はエラー
pub fn initialize_database(init: &InitializationResult) -> AppResult<Connection> {
    let conn = open_database(&init.database_path)?;
    log::info!("データベースを初期化しました: {:?}", init.database_path);
    Ok(conn)
}

/// 指定パスのデータベースを開き、テーブルを作成する
pub fn open_database(path: &Path) -> AppResult<Connection> {
    let conn = Connection::open(path)?;
    create_tables(&conn)?;
    Ok(conn)
}

/// データベーステーブルを作成する
///
/// モバイル版のキーバリューストアと同じく、値はUTF-8テキストとして保存する。
pub fn create_tables(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS key_value_store (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// キーに対応する値を取得する
///
/// # 戻り値
/// 値（存在しない場合はNone）、または失敗時はエラー
pub fn get_value(conn: &Connection, key: &str) -> AppResult<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM key_value_store WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    Ok(value)
}

/// キーに値を保存する（既存の値は上書き）
pub fn set_value(conn: &Connection, key: &str, value: &str) -> AppResult<()> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO key_value_store (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, now],
    )?;

    Ok(())
}

/// キーを削除する
///
/// # 戻り値
/// 削除された場合はtrue
pub fn remove_value(conn: &Connection, key: &str) -> AppResult<bool> {
    let rows_affected = conn.execute(
        "DELETE FROM key_value_store WHERE key = ?1",
        params![key],
    )?;
    Ok(rows_affected > 0)
}
