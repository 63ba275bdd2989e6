//! 内核定时器抽象
//!
//! 驱动核心只需要单调毫秒时钟与可重设的单次定时器（mod_timer / del_timer_sync）。
//! 定时器到期时平台调用 `EspPub::timer_expired(id)`。

/// 驱动使用的定时器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// AP 接口的 beacon 定时器
    Beacon(u8),
    /// AP 接口的 null-data 保活定时器
    NullData(u8),
    /// 硬件扫描超时兜底
    ScanTimeout,
}

pub trait TimerOps {
    /// 单调时钟（毫秒）
    fn now_ms(&self) -> u64;

    /// 设置（或重设）`id` 在绝对时间 `expires_ms` 到期
    fn mod_timer(&self, id: TimerId, expires_ms: u64);

    /// 取消 `id`；返回前保证该定时器回调不在执行，且之后不再触发，直到被重新设置
    fn del_timer_sync(&self, id: TimerId);
}
