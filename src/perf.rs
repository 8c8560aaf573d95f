use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

static PERF_QUERY_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_QUERY_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static PERF_DEPTH: Cell<u32> = Cell::new(0);
    static QUERY_COUNT: Cell<u64> = Cell::new(0);
    static SLOW_QUERY_COUNT: Cell<u64> = Cell::new(0);
}

fn is_true(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

fn truncate_query(query: &str, max_len: usize) -> String {
    let s = query.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

/// 安装查询统计（用于查询计数 + 慢查询日志）
///
/// 开关：
/// - 默认开启；`INJECTION_AUDIT_PERF_QUERY=0` 关闭
/// - `INJECTION_AUDIT_SLOW_QUERY_MS=50` 配置慢查询阈值（毫秒）
///   Debug 默认 50，Release 默认 200
pub fn install_query_tracing() {
    let enabled = match std::env::var("INJECTION_AUDIT_PERF_QUERY") {
        Ok(v) => is_true(&v),
        Err(_) => true,
    };

    PERF_QUERY_ENABLED.store(enabled, Ordering::Relaxed);

    let slow_ms = std::env::var("INJECTION_AUDIT_SLOW_QUERY_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    SLOW_QUERY_THRESHOLD_MS.store(slow_ms, Ordering::Relaxed);
}

/// 记录一次已执行的查询（由各数据源连接在查询返回后调用）
pub fn record_query(query: &str, duration: Duration) {
    if !PERF_QUERY_ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let active = PERF_DEPTH.with(|d| d.get() > 0);
    if active {
        QUERY_COUNT.with(|c| c.set(c.get().saturating_add(1)));
    }

    let ms = duration.as_millis() as u64;
    let threshold = SLOW_QUERY_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        let query_short = truncate_query(query, 420);
        tracing::warn!(
            target: "slow_query",
            duration_ms = ms,
            query = %query_short,
            "slow query"
        );
        if active {
            SLOW_QUERY_COUNT.with(|c| c.set(c.get().saturating_add(1)));
        }
    }
}

/// 性能统计 Guard：记录 elapsed_ms + 查询数 + 慢查询数
///
/// 使用方式：
/// ```ignore
/// let _perf = injection_audit::perf::PerfGuard::new("source_count");
/// // do work...
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    query_start: u64,
    slow_query_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        PERF_DEPTH.with(|d| d.set(d.get().saturating_add(1)));
        let query_start = QUERY_COUNT.with(|c| c.get());
        let slow_query_start = SLOW_QUERY_COUNT.with(|c| c.get());
        Self {
            op,
            start: Instant::now(),
            query_start,
            slow_query_start,
        }
    }

    /// 本 Guard 存活期间已记录的查询数
    pub fn query_count(&self) -> u64 {
        QUERY_COUNT
            .with(|c| c.get())
            .saturating_sub(self.query_start)
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let query_count = self.query_count();
        let slow_query_end = SLOW_QUERY_COUNT.with(|c| c.get());
        let slow_query_count = slow_query_end.saturating_sub(self.slow_query_start);

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            query_count,
            slow_query_count,
            "done"
        );

        PERF_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
