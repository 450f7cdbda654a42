/// 設定機能モジュール
///
/// 地域（日付パターン・数値ロケール・タイムゾーン）と表示言語を管理します。
/// 設定はサブスクリプションと同じキーバリューストアに保存されます。
pub mod models;
pub mod repository;

pub use models::{AppSettings, Language, Region};
pub use repository::{load_settings, reset_settings, save_settings, SETTINGS_KEY};
