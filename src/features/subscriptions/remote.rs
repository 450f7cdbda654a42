/// リモートストア
///
/// ドキュメントストアのREST APIに、一覧全体をJSON文字列として1つのドキュメントに保存する。
/// ドキュメントは `documents/{collection}/{document_id}` に固定され、
/// 本文は `{"fields": {"data": {"stringValue": "<JSON配列>"}}}` の形になる。
use super::models::SubscriptionRecord;
use super::storage::SubscriptionStore;
use crate::shared::api_client::{ApiClient, ApiClientConfig};
use crate::shared::config::RemoteStoreConfig;
use crate::shared::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use url::Url;

/// 保存するドキュメント
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    #[serde(default)]
    pub fields: DocumentFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<StringValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringValue {
    #[serde(rename = "stringValue")]
    pub string_value: String,
}

/// ドキュメントのURLを組み立てる
///
/// # 引数
/// * `config` - リモートストア設定
///
/// # 戻り値
/// `{base_url}/projects/{project}/databases/(default)/documents/{collection}/{document_id}`。
/// APIキーがある場合は `key` クエリを付ける
pub fn document_url(config: &RemoteStoreConfig) -> AppResult<Url> {
    let mut url = Url::parse(&config.base_url).map_err(|e| {
        AppError::configuration(format!("リモートストアのURLが不正です: {e}"))
    })?;

    url.path_segments_mut()
        .map_err(|_| AppError::configuration("リモートストアのURLにパスを追加できません"))?
        .pop_if_empty()
        .extend([
            "projects",
            config.project_id.as_str(),
            "databases",
            "(default)",
            "documents",
            config.collection.as_str(),
            config.document_id.as_str(),
        ]);

    if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
        url.query_pairs_mut().append_pair("key", key);
    }

    Ok(url)
}

/// 一覧をドキュメントに変換する
pub fn encode_document(records: &[SubscriptionRecord]) -> AppResult<RemoteDocument> {
    Ok(RemoteDocument {
        fields: DocumentFields {
            data: Some(StringValue {
                string_value: serde_json::to_string(records)?,
            }),
        },
    })
}

/// ドキュメントから一覧を取り出す
///
/// `data` フィールドがないドキュメントは空の一覧として扱う。
pub fn decode_document(document: &RemoteDocument) -> AppResult<Vec<SubscriptionRecord>> {
    match &document.fields.data {
        Some(data) => Ok(serde_json::from_str(&data.string_value)?),
        None => {
            log::warn!("リモートドキュメントにdataフィールドがありません");
            Ok(Vec::new())
        }
    }
}

/// リモートのドキュメントストアを使う保存先
pub struct RemoteSubscriptionStore {
    client: ApiClient,
    url: Url,
}

impl RemoteSubscriptionStore {
    /// 設定からリモートストアを作成する
    pub fn new(config: &RemoteStoreConfig) -> AppResult<Self> {
        config.validate().map_err(AppError::Configuration)?;

        let url = document_url(config)?;
        let client = ApiClient::new_with_config(ApiClientConfig::from(config))?;

        log::info!(
            "リモートストアを作成しました: collection={}, document={}, localhost={}",
            config.collection,
            config.document_id,
            config.is_localhost()
        );

        Ok(Self { client, url })
    }

    /// 環境変数からリモートストアを作成する
    ///
    /// # 戻り値
    /// リモートストアが設定されていない場合はNone
    pub fn from_env() -> AppResult<Option<Self>> {
        match RemoteStoreConfig::from_env() {
            Some(config) => Self::new(&config).map(Some),
            None => Ok(None),
        }
    }
}

impl SubscriptionStore for RemoteSubscriptionStore {
    async fn load(&self) -> AppResult<Vec<SubscriptionRecord>> {
        let document: Option<RemoteDocument> = self.client.get(&self.url).await?;

        match document {
            Some(document) => {
                let records = decode_document(&document)?;
                log::info!("リモートストアから読み込みました: count={}", records.len());
                Ok(records)
            }
            None => {
                log::info!("リモートドキュメントが存在しないため、空の一覧を返します");
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, records: &[SubscriptionRecord]) -> AppResult<()> {
        let document = encode_document(records)?;
        let _: serde_json::Value = self.client.patch(&self.url, &document).await?;
        log::info!("リモートストアに保存しました: count={}", records.len());
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "リモートストア"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_url() {
        let config = RemoteStoreConfig::new("demo-project");
        let url = document_url(&config).unwrap();

        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/demo-project/databases/(default)/documents/subscriptions/shared"
        );
    }

    #[test]
    fn test_document_url_with_api_key_and_trailing_slash() {
        let mut config = RemoteStoreConfig::new("demo-project");
        config.base_url = "http://localhost:8080/v1/".to_string();
        config.api_key = Some("abc 123".to_string());

        let url = document_url(&config).unwrap();
        assert_eq!(
            url.path(),
            "/v1/projects/demo-project/databases/(default)/documents/subscriptions/shared"
        );
        assert_eq!(url.query(), Some("key=abc+123"));
    }

    #[test]
    fn test_document_url_rejects_invalid_base() {
        let mut config = RemoteStoreConfig::new("demo-project");
        config.base_url = "not a url".to_string();

        assert!(matches!(
            document_url(&config),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_document_shape() {
        let records = vec![SubscriptionRecord::new(
            "Netflix",
            "15/01/2024",
            "15/02/2024",
            39900.0,
        )];
        let document = encode_document(&records).unwrap();
        let value = serde_json::to_value(&document).unwrap();

        let data = value["fields"]["data"]["stringValue"].as_str().unwrap();
        assert!(data.starts_with(r#"[{"name":"Netflix""#));
        assert_eq!(decode_document(&document).unwrap(), records);
    }

    #[test]
    fn test_decode_server_document() {
        let body = r#"{
            "name": "projects/demo-project/databases/(default)/documents/subscriptions/shared",
            "fields": {
                "data": {"stringValue": "[{\"name\":\"Spotify\",\"lastPayment\":\"01/02/2024\",\"nextPayment\":\"01/03/2024\",\"amount\":16900}]"}
            },
            "createTime": "2024-02-01T00:00:00Z",
            "updateTime": "2024-02-01T00:00:00Z"
        }"#;
        let document: RemoteDocument = serde_json::from_str(body).unwrap();
        let records = decode_document(&document).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Spotify");
        assert_eq!(records[0].amount, 16900.0);

        let empty: RemoteDocument = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert!(decode_document(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = RemoteStoreConfig::new("demo-project");
        config.timeout_seconds = 0;
        assert!(matches!(
            RemoteSubscriptionStore::new(&config),
            Err(AppError::Configuration(_))
        ));
    }
}
