//! 指数退避（带抖动）
//!
//! Shared by the database retry executor and the upstream HTTP client.

/// 计算第 `attempt` 次重试前的延迟（毫秒）
///
/// `base_ms * 2^(attempt-1)`，上限 `max_ms`，再加 0-25% 的随机抖动，避免惊群效应
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    let exp_delay = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    let capped = exp_delay.min(max_ms);
    let jitter = rand::random_range(0..=capped / 4);
    capped.saturating_add(jitter)
}
