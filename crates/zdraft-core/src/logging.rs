//! 日志初始化
//!
//! 库代码只使用 `tracing` 宏；宿主程序启动时调用一次 [`init`]。

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// 安装全局 fmt 订阅者
///
/// 已经安装过订阅者时返回错误，不会覆盖。
pub fn init(level: Level) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    tracing::subscriber::set_global_default(FmtSubscriber::builder().with_max_level(level).finish())
}

/// 解析日志级别字符串（"trace" / "debug" / "info" / "warn" / "error"），无法识别时为 INFO
pub fn parse_level(value: &str) -> Level {
    value.trim().parse().unwrap_or(Level::INFO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" WARN "), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_init_twice() {
        assert!(init(Level::ERROR).is_ok());
        // 同一进程中第二次安装必然失败
        assert!(init(Level::INFO).is_err());
    }
}
