//! 业务指标模块
//!
//! 基于 metrics facade 记录评分操作指标。未安装 recorder 时所有记录均为空操作。

/// 注册指标描述
///
/// 这些描述会出现在导出端（如 Prometheus）的 HELP 注释中
pub fn describe_metrics() {
    metrics::describe_counter!(
        "rating_operations_total",
        "Total number of rating operations by outcome"
    );
    metrics::describe_histogram!(
        "rating_operation_duration_seconds",
        "Rating operation duration in seconds"
    );
}

/// 记录评分操作
///
/// `outcome` 为 "success" 或错误码（如 "ALREADY_RATED"）
#[inline]
pub fn record_rating_operation(operation: &str, outcome: &str, duration_secs: f64) {
    metrics::counter!(
        "rating_operations_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "rating_operation_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}
