//! 日誌初始化
//!
//! `RUST_LOG` 優先；未設置時依命令列的詳細程度決定等級。

use tracing_subscriber::{fmt, EnvFilter};

/// 詳細程度對應的預設等級：0 警告、1 資訊、2 除錯、3 以上追蹤
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// 初始化日誌系統
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// 測試用日誌（輸出至測試擷取器，可重複呼叫）
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
