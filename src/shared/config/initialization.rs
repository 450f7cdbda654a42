use crate::shared::config::{get_database_filename, get_environment, Environment};
use crate::shared::errors::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// データディレクトリ名（OSのデータディレクトリ直下に作成）
const APP_DIR_NAME: &str = "subscription-ledger";

/// アプリケーション初期化の結果を表す構造体
#[derive(Debug)]
pub struct InitializationResult {
    /// 初回起動かどうか
    pub is_first_run: bool,
    /// アプリケーションデータディレクトリのパス
    pub app_data_dir: PathBuf,
    /// データベースファイルのパス
    pub database_path: PathBuf,
    /// 実行環境
    pub environment: Environment,
}

/// アプリケーションの初期化を実行する
///
/// # 引数
/// * `data_dir` - データディレクトリ（Noneの場合はOS標準のデータディレクトリを使用）
///
/// # 戻り値
/// 初期化結果、または失敗時はエラー
///
/// # 処理内容
/// 1. アプリケーションデータディレクトリの作成
/// 2. 初回起動の判定
/// 3. 環境に応じたデータベースファイルパスの決定
pub fn initialize_application(data_dir: Option<&Path>) -> AppResult<InitializationResult> {
    let environment = get_environment();

    let app_data_dir = ensure_app_data_directory(data_dir)?;

    let db_filename = get_database_filename(environment.clone());
    let database_path = app_data_dir.join(db_filename);

    // 初回起動かどうかを判定（データベースファイルの存在で判定）
    let is_first_run = !database_path.exists();

    if is_first_run {
        log_first_run_initialization(&environment, &app_data_dir, &database_path);
    }

    Ok(InitializationResult {
        is_first_run,
        app_data_dir,
        database_path,
        environment,
    })
}

/// アプリケーションデータディレクトリを確実に作成する
fn ensure_app_data_directory(data_dir: Option<&Path>) -> AppResult<PathBuf> {
    let app_data_dir = match data_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::data_dir()
            .ok_or_else(|| AppError::configuration("データディレクトリの取得に失敗しました"))?
            .join(APP_DIR_NAME),
    };

    if !app_data_dir.exists() {
        fs::create_dir_all(&app_data_dir).map_err(|e| {
            AppError::configuration(format!("アプリデータディレクトリの作成に失敗: {e}"))
        })?;

        log::info!("アプリケーションデータディレクトリを作成しました: {app_data_dir:?}");
    }

    Ok(app_data_dir)
}

/// 初回起動時の初期化ログを出力する
fn log_first_run_initialization(
    environment: &Environment,
    app_data_dir: &Path,
    database_path: &Path,
) {
    log::info!("=== アプリケーション初回起動 ===");
    log::info!("実行環境: {environment:?}");
    log::info!("アプリデータディレクトリ: {app_data_dir:?}");
    log::info!("データベースファイル: {database_path:?}");
}

/// 初期化完了ログを出力する
pub fn log_initialization_complete(result: &InitializationResult) {
    if result.is_first_run {
        log::info!("=== 初期化完了 ===");
        log::info!("初回起動の初期化が正常に完了しました");
    } else {
        log::info!("アプリケーション起動完了（既存データベースを使用）");
    }
    log::info!("環境: {:?}", result.environment);
    log::info!("データベース: {:?}", result.database_path);
}
