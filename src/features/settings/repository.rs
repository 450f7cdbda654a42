use super::models::AppSettings;
use crate::shared::database::{get_value, remove_value, set_value};
use crate::shared::errors::AppResult;
use rusqlite::Connection;

/// 設定を保存するキー
pub const SETTINGS_KEY: &str = "appSettings";

/// 設定を読み込む
///
/// # 戻り値
/// 保存済みの設定。未保存、または壊れている場合はデフォルト設定（es / CO）
pub fn load_settings(conn: &Connection) -> AppResult<AppSettings> {
    let Some(raw) = get_value(conn, SETTINGS_KEY)? else {
        log::debug!("設定が未保存のため、デフォルト設定を使用します");
        return Ok(AppSettings::default());
    };

    match serde_json::from_str::<AppSettings>(&raw) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            log::warn!("設定の解析に失敗したため、デフォルト設定を使用します: {e}");
            Ok(AppSettings::default())
        }
    }
}

/// 設定を保存する
pub fn save_settings(conn: &Connection, settings: &AppSettings) -> AppResult<()> {
    let raw = serde_json::to_string(settings)?;
    set_value(conn, SETTINGS_KEY, &raw)?;
    log::info!(
        "設定を保存しました: lang={:?}, reg={}",
        settings.language,
        settings.region.code()
    );
    Ok(())
}

/// 保存済みの設定を削除し、デフォルト設定に戻す
///
/// # 戻り値
/// デフォルト設定（es / CO）
pub fn reset_settings(conn: &Connection) -> AppResult<AppSettings> {
    if remove_value(conn, SETTINGS_KEY)? {
        log::info!("設定を削除し、デフォルト設定に戻しました");
    } else {
        log::debug!("設定が未保存のため、削除は不要でした");
    }
    Ok(AppSettings::default())
}
