/// アプリケーションの実行環境を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

/// 環境変数取得エラー
#[derive(Debug, Clone)]
pub struct EnvVarError {
    /// 変数名
    pub var_name: String,
    /// エラーメッセージ
    pub message: String,
}

impl std::fmt::Display for EnvVarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "環境変数 {} が見つかりません: {}",
            self.var_name, self.message
        )
    }
}

impl std::error::Error for EnvVarError {}

/// 環境変数を取得する（優先順位: 起動時 > コンパイル時 > エラー）
///
/// # 取得順序
/// 1. 起動時の環境変数（`std::env::var`）
/// 2. コンパイル時の環境変数（`option_env!`マクロ、build.rsで埋め込み）
/// 3. どちらも見つからない場合はエラー
#[macro_export]
macro_rules! get_env_var {
    ($var_name:expr) => {{
        if let Ok(value) = std::env::var($var_name) {
            log::debug!("環境変数 {} を起動時の環境変数から取得しました", $var_name);
            Ok(value)
        } else if let Some(value) = option_env!($var_name) {
            log::debug!("環境変数 {} をコンパイル時の環境変数から取得しました", $var_name);
            Ok(value.to_string())
        } else {
            Err($crate::shared::config::environment::EnvVarError {
                var_name: $var_name.to_string(),
                message: format!(
                    "起動時の環境変数 {} もコンパイル時の環境変数も見つかりませんでした",
                    $var_name
                ),
            })
        }
    }};
}

/// 環境変数を取得する（オプション版）
#[macro_export]
macro_rules! get_env_var_optional {
    ($var_name:expr) => {{
        $crate::get_env_var!($var_name).ok()
    }};
}

/// 環境変数を取得する（デフォルト値付き）
///
/// # 引数
/// * `var_name` - 環境変数名
/// * `default_value` - デフォルト値
#[macro_export]
macro_rules! get_env_var_or_default {
    ($var_name:expr, $default_value:expr) => {{
        $crate::get_env_var!($var_name).unwrap_or_else(|_| {
            log::debug!(
                "環境変数 {} が見つからないため、デフォルト値を使用します: {}",
                $var_name,
                $default_value
            );
            $default_value.to_string()
        })
    }};
}

/// 環境設定を管理する構造体
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// 実行環境
    pub environment: String,
    /// デバッグモードの有効/無効
    pub debug_mode: bool,
    /// ログレベル
    pub log_level: String,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Self {
        let environment = get_environment();
        let debug_mode = environment == Environment::Development;
        let log_level = crate::get_env_var!("LOG_LEVEL").unwrap_or_else(|_| {
            if debug_mode {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

        Self {
            environment: format!("{environment:?}").to_lowercase(),
            debug_mode,
            log_level,
        }
    }

    /// プロダクション環境かどうかを判定
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 開発環境かどうかを判定
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// 文字列のログレベルを`log::LevelFilter`に変換する
    ///
    /// 不明な値は Info として扱う。
    pub fn level_filter(&self) -> log::LevelFilter {
        match self.log_level.to_lowercase().as_str() {
            "error" => log::LevelFilter::Error,
            "warn" => log::LevelFilter::Warn,
            "info" => log::LevelFilter::Info,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            _ => log::LevelFilter::Info,
        }
    }
}

/// 現在の実行環境を判定する
///
/// # 判定ロジック
/// 1. 環境変数 ENVIRONMENT（起動時、なければコンパイル時）を確認
/// 2. デバッグビルドの場合は Development
/// 3. リリースビルドの場合は Production
pub fn get_environment() -> Environment {
    if let Ok(env_var) = crate::get_env_var!("ENVIRONMENT") {
        let env = match env_var.as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
        log::debug!("環境判定: 環境変数を使用 -> {env_var} -> {env:?}");
        return env;
    }

    // フォールバック: ビルド設定に基づく判定
    let env = if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    };
    log::debug!(
        "環境判定: ビルド設定を使用 -> debug_assertions={} -> {env:?}",
        cfg!(debug_assertions)
    );
    env
}

/// 環境に応じたデータベースファイル名を取得する
///
/// # ファイル名の規則
/// - 開発環境: "dev_subscriptions.db"
/// - プロダクション環境: "subscriptions.db"
pub fn get_database_filename(env: Environment) -> &'static str {
    match env {
        Environment::Development => "dev_subscriptions.db",
        Environment::Production => "subscriptions.db",
    }
}

/// 開発環境の場合のみ.envファイルを読み込む
///
/// 本番ビルドでは環境変数は実行時に設定されることを前提とする。
pub fn load_environment_variables() {
    if cfg!(debug_assertions) {
        match dotenv::dotenv() {
            Ok(path) => {
                log::info!("環境ファイルを読み込みました: {}", path.display());
            }
            Err(e) => {
                log::warn!("環境ファイルの読み込みに失敗: {e}");
            }
        }
    } else {
        log::info!("本番環境: 環境変数は実行時に設定されます");
    }
}

/// ログシステムを初期化する
///
/// 二重初期化はエラーにせず無視する（テストや再初期化を許容するため`try_init`を使用）。
pub fn initialize_logging_system() {
    let env_config = EnvironmentConfig::from_env();

    let result = env_logger::Builder::from_default_env()
        .filter_level(env_config.level_filter())
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init();

    if result.is_ok() {
        log::info!(
            "ログシステムを初期化しました: level={}, environment={}",
            env_config.log_level,
            env_config.environment
        );
    }
}

/// リモートストア（ドキュメントストア）の設定
#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    /// REST APIのベースURL
    pub base_url: String,
    /// プロジェクトID
    pub project_id: String,
    /// APIキー（任意）
    pub api_key: Option<String>,
    /// コレクション名
    pub collection: String,
    /// ドキュメントID（固定）
    pub document_id: String,
    /// リクエストのタイムアウト（秒）
    pub timeout_seconds: u64,
    /// 最大リトライ回数
    pub max_retries: u32,
}

/// リモートストアのデフォルトベースURL
pub const DEFAULT_REMOTE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
/// サブスクリプションを格納するコレクション名
pub const DEFAULT_REMOTE_COLLECTION: &str = "subscriptions";
/// サブスクリプションを格納するドキュメントID
pub const DEFAULT_REMOTE_DOCUMENT_ID: &str = "shared";

impl RemoteStoreConfig {
    /// 指定したプロジェクト用のデフォルト設定を作成する
    pub fn new<S: Into<String>>(project_id: S) -> Self {
        Self {
            base_url: DEFAULT_REMOTE_BASE_URL.to_string(),
            project_id: project_id.into(),
            api_key: None,
            collection: DEFAULT_REMOTE_COLLECTION.to_string(),
            document_id: DEFAULT_REMOTE_DOCUMENT_ID.to_string(),
            timeout_seconds: 30,
            max_retries: 3,
        }
    }

    /// 環境変数からリモートストア設定を読み込む
    ///
    /// # 戻り値
    /// `REMOTE_STORE_PROJECT_ID` が未設定の場合は None（リモートストア無効）
    pub fn from_env() -> Option<Self> {
        let project_id = match crate::get_env_var!("REMOTE_STORE_PROJECT_ID") {
            Ok(id) if !id.trim().is_empty() => id,
            _ => {
                log::info!("REMOTE_STORE_PROJECT_IDが未設定のため、リモートストアは無効です");
                return None;
            }
        };

        let base_url =
            crate::get_env_var_or_default!("REMOTE_STORE_BASE_URL", DEFAULT_REMOTE_BASE_URL);
        let api_key = crate::get_env_var_optional!("REMOTE_STORE_API_KEY");

        let timeout_seconds = crate::get_env_var_or_default!("REMOTE_STORE_TIMEOUT_SECONDS", "30")
            .parse()
            .unwrap_or_else(|_| {
                log::warn!(
                    "REMOTE_STORE_TIMEOUT_SECONDSのパースに失敗しました。デフォルト値30秒を使用します"
                );
                30
            });

        let max_retries = crate::get_env_var_or_default!("REMOTE_STORE_MAX_RETRIES", "3")
            .parse()
            .unwrap_or_else(|_| {
                log::warn!(
                    "REMOTE_STORE_MAX_RETRIESのパースに失敗しました。デフォルト値3回を使用します"
                );
                3
            });

        log::info!(
            "リモートストア設定: base_url={base_url}, project={project_id}, timeout={timeout_seconds}s, max_retries={max_retries}"
        );

        Some(Self {
            base_url,
            project_id,
            api_key,
            collection: DEFAULT_REMOTE_COLLECTION.to_string(),
            document_id: DEFAULT_REMOTE_DOCUMENT_ID.to_string(),
            timeout_seconds,
            max_retries,
        })
    }

    /// 設定を検証する
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("リモートストアのベースURLが設定されていません".to_string());
        }
        if self.project_id.trim().is_empty() {
            return Err("リモートストアのプロジェクトIDが設定されていません".to_string());
        }
        if self.document_id.trim().is_empty() {
            return Err("リモートストアのドキュメントIDが設定されていません".to_string());
        }
        if self.timeout_seconds == 0 {
            return Err("タイムアウトは0より大きい値である必要があります".to_string());
        }
        Ok(())
    }

    /// リモートストアがlocalhostかどうかを判定（エミュレータ接続時）
    pub fn is_localhost(&self) -> bool {
        self.base_url.contains("localhost") || self.base_url.contains("127.0.0.1")
    }
}
