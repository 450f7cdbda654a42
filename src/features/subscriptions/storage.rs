use super::models::SubscriptionRecord;
use crate::shared::errors::AppResult;
use std::future::Future;

/// サブスクリプション一覧の保存先
///
/// ローカルストアとリモートストアは同じインターフェースの別実装。
/// 一覧全体を1つの値として読み書きする（部分更新はしない）。
pub trait SubscriptionStore: Send + Sync {
    /// 保存済みの一覧を読み込む
    ///
    /// # 戻り値
    /// 何も保存されていない場合は空の一覧
    fn load(&self) -> impl Future<Output = AppResult<Vec<SubscriptionRecord>>> + Send;

    /// 一覧全体を保存する（既存の内容は置き換えられる）
    fn save(&self, records: &[SubscriptionRecord]) -> impl Future<Output = AppResult<()>> + Send;

    /// ログ出力用の保存先名
    fn describe(&self) -> &'static str;
}
