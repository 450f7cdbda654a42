/// 汎用APIクライアント
///
/// リモートのドキュメントストアとの通信を行うクライアント。
/// 接続失敗時は指数バックオフでリトライする。
use crate::shared::config::environment::RemoteStoreConfig;
use crate::shared::errors::{AppError, AppResult};
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// エラーメッセージに使うサービス名
const SERVICE_NAME: &str = "リモートストア";

/// APIクライアント設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiClientConfig {
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_retries: 3,
        }
    }
}

impl From<&RemoteStoreConfig> for ApiClientConfig {
    fn from(config: &RemoteStoreConfig) -> Self {
        Self {
            timeout_seconds: config.timeout_seconds,
            max_retries: config.max_retries,
        }
    }
}

/// サーバーからのエラーレスポンス（`{"error": {"code", "message", "status"}}`）
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// 汎用APIクライアント
pub struct ApiClient {
    client: Client,
    config: ApiClientConfig,
}

impl ApiClient {
    /// 設定を指定してAPIクライアントを作成
    pub fn new_with_config(config: ApiClientConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTPクライアント初期化失敗: {e}")))?;

        Ok(Self { client, config })
    }

    /// クライアント設定
    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// GETリクエストを送信
    ///
    /// # 戻り値
    /// リソースが存在しない（404）場合はNone
    pub async fn get<T>(&self, url: &Url) -> AppResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        info!("GETリクエスト送信: path={}", url.path());

        let request = self.client.get(url.clone());
        let response = self.send_request_with_retry(request, "GET", url).await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("リソースが存在しません: path={}", url.path());
            return Ok(None);
        }

        Self::parse_response(response, "GET", url).await.map(Some)
    }

    /// PATCHリクエストを送信
    pub async fn patch<B, T>(&self, url: &Url, body: &B) -> AppResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        info!("PATCHリクエスト送信: path={}", url.path());

        let request = self.client.patch(url.clone()).json(body);
        let response = self.send_request_with_retry(request, "PATCH", url).await?;

        Self::parse_response(response, "PATCH", url).await
    }

    /// 成功レスポンスを解析し、失敗レスポンスはエラーに変換する
    async fn parse_response<T>(response: Response, method: &str, url: &Url) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        let result: T = response.json().await.map_err(|e| {
            AppError::external_service(SERVICE_NAME.to_string(), format!("レスポンス解析エラー: {e}"))
        })?;

        info!("{method}リクエスト成功: path={}", url.path());
        Ok(result)
    }

    /// リトライ機能付きでリクエストを送信
    ///
    /// 接続エラーの場合のみリトライする。HTTPステータスは呼び出し側で判定する。
    async fn send_request_with_retry(
        &self,
        request: RequestBuilder,
        method: &str,
        url: &Url,
    ) -> AppResult<Response> {
        let mut attempts = 0;
        loop {
            let Some(cloned_request) = request.try_clone() else {
                return Err(AppError::external_service(
                    SERVICE_NAME,
                    "リクエストのクローンに失敗しました",
                ));
            };

            match cloned_request.send().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempts < self.config.max_retries {
                        attempts += 1;
                        let delay = retry_delay(attempts);
                        warn!(
                            "{method}リクエスト失敗、リトライします: path={}, attempt={attempts}/{}, delay={delay:?}",
                            url.path(),
                            self.config.max_retries
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(AppError::external_service(
                        SERVICE_NAME.to_string(),
                        format!("サーバーへの接続に失敗しました: {e}"),
                    ));
                }
            }
        }
    }

    /// エラーレスポンスを処理し、詳細なエラー情報を持つAppErrorに変換
    async fn handle_error_response(response: Response) -> AppError {
        let status_code = response.status().as_u16();
        let response_text = response
            .text()
            .await
            .unwrap_or_else(|_| "レスポンス読み取り失敗".to_string());

        error_from_body(status_code, &response_text)
    }
}

/// リトライ間隔（2^attempt 秒）
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_secs(2_u64.saturating_pow(attempt))
}

/// エラーレスポンスの本文からAppErrorを作成する
fn error_from_body(status_code: u16, body: &str) -> AppError {
    if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
        debug!(
            "構造化エラーレスポンスを受信: code={}, status={:?}, message={}",
            error_response.error.code, error_response.error.status, error_response.error.message
        );
        return AppError::external_service(
            SERVICE_NAME.to_string(),
            format!(
                "{} - {}",
                error_response.error.code, error_response.error.message
            ),
        );
    }

    warn!("非構造化エラーレスポンス: status={status_code}, body={body}");
    AppError::external_service(
        SERVICE_NAME.to_string(),
        format!("{status_code} - {}", status_message(status_code)),
    )
}

/// HTTPステータスコードに対応するメッセージ
fn status_message(status_code: u16) -> &'static str {
    match status_code {
        400 => "リクエストの形式が正しくありません",
        401 => "認証に失敗しました",
        403 => "この操作を実行する権限がありません",
        404 => "指定されたリソースが見つかりません",
        413 => "データサイズが制限を超えています",
        429 => "リクエストが多すぎます。しばらく待ってから再試行してください",
        500 => "サーバー内部エラーが発生しました",
        502 => "サーバーとの通信でエラーが発生しました",
        503 => "サーバーが一時的に利用できません",
        504 => "サーバーからの応答がタイムアウトしました",
        _ => "不明なエラーが発生しました",
    }
}
