use std::env;

fn main() {
    // ビルド時の環境変数をコンパイル時の値として埋め込む
    // 実行時に同名の環境変数があればそちらが優先される（get_env_var! を参照）
    for key in [
        "ENVIRONMENT",
        "LOG_LEVEL",
        "REMOTE_STORE_BASE_URL",
        "REMOTE_STORE_PROJECT_ID",
        "REMOTE_STORE_API_KEY",
        "REMOTE_STORE_TIMEOUT_SECONDS",
        "REMOTE_STORE_MAX_RETRIES",
    ] {
        if let Ok(value) = env::var(key) {
            println!("cargo:rustc-env={}={}", key, value);
        }
        println!("cargo:rerun-if-env-changed={}", key);
    }

    let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
    println!("cargo:warning=ビルド環境: {}", environment);
}
