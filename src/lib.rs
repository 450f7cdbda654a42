// 機能モジュール構造
pub mod features;
pub mod shared;

use features::settings::{load_settings, reset_settings, save_settings, AppSettings};
use features::subscriptions::{
    LocalSubscriptionStore, RemoteSubscriptionStore, SubscriptionService,
};
use log::{info, warn};
use shared::config::{
    initialize_application, initialize_logging_system, load_environment_variables,
    log_initialization_complete, InitializationResult,
};
use shared::database::initialize_database;
use shared::errors::{AppError, AppResult};
use std::path::Path;

/// アプリケーション状態（設定と一覧の管理を保持）
pub struct AppContext {
    pub init: InitializationResult,
    pub subscriptions: SubscriptionService<LocalSubscriptionStore>,
    /// リモートストアが設定されている場合のみSome
    pub remote: Option<SubscriptionService<RemoteSubscriptionStore>>,
}

impl AppContext {
    pub fn settings(&self) -> AppSettings {
        self.subscriptions.settings()
    }

    /// 設定を保存し、各サービスに反映する
    pub fn update_settings(&mut self, settings: AppSettings) -> AppResult<()> {
        {
            let conn = self.subscriptions.store().connection();
            let conn = conn
                .lock()
                .map_err(|e| AppError::concurrency(format!("データベースロック取得エラー: {e}")))?;
            save_settings(&conn, &settings)?;
        }

        self.subscriptions.set_settings(settings);
        if let Some(remote) = self.remote.as_mut() {
            remote.set_settings(settings);
        }
        Ok(())
    }

    /// 保存済みの設定を削除してデフォルト設定に戻し、各サービスに反映する
    pub fn reset_settings(&mut self) -> AppResult<AppSettings> {
        let settings = {
            let conn = self.subscriptions.store().connection();
            let conn = conn
                .lock()
                .map_err(|e| AppError::concurrency(format!("データベースロック取得エラー: {e}")))?;
            reset_settings(&conn)?
        };

        self.subscriptions.set_settings(settings);
        if let Some(remote) = self.remote.as_mut() {
            remote.set_settings(settings);
        }
        Ok(settings)
    }
}

/// アプリケーションを初期化する
///
/// 環境変数とログを初期化し、データベースと設定を読み込んだうえで、
/// 保存済みの一覧を読み込んでロールオーバーを適用する。
///
/// # 引数
/// * `data_dir` - データディレクトリ（Noneの場合はOS標準のデータディレクトリ）
pub async fn bootstrap(data_dir: Option<&Path>) -> AppResult<AppContext> {
    // 環境に応じた.envファイルを読み込み（ログシステム初期化前に実行）
    load_environment_variables();
    initialize_logging_system();

    info!("アプリケーション初期化を開始します...");

    let init = initialize_application(data_dir)?;
    let conn = initialize_database(&init)?;
    let settings = load_settings(&conn)?;
    info!(
        "設定を読み込みました: lang={:?}, reg={}",
        settings.language,
        settings.region.code()
    );

    let mut subscriptions =
        SubscriptionService::new(LocalSubscriptionStore::from_connection(conn), settings);
    subscriptions.load().await?;

    let today = settings.region.today();
    let rolled = subscriptions.refresh_all(today).await?;
    if !rolled.is_empty() {
        info!("起動時にロールオーバーを適用しました: count={}", rolled.len());
    }

    let remote = match RemoteSubscriptionStore::from_env() {
        Ok(Some(store)) => Some(SubscriptionService::new(store, settings)),
        Ok(None) => None,
        Err(e) => {
            warn!("リモートストアを利用できません: {}", e.details());
            None
        }
    };

    log_initialization_complete(&init);
    info!("アプリケーション初期化が完了しました");

    Ok(AppContext {
        init,
        subscriptions,
        remote,
    })
}
