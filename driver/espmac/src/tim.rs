//! TIM 聚合环
//!
//! 保活定时器把每次产生的 TIM 字节压入环中；beacon 取环内所有字节的按位或。
//! 一个站点的指示位因此会在之后若干个 beacon 中保持，两个定时器之间无需同步。

/// 环长度（BEACON_TIM_SAVE_MAX）
pub const BEACON_TIM_SAVE_MAX: usize = 12;

#[derive(Debug, Clone, Default)]
pub struct TimRing {
    saved: [u8; BEACON_TIM_SAVE_MAX],
    count: usize,
}

impl TimRing {
    pub const fn new() -> Self {
        Self {
            saved: [0; BEACON_TIM_SAVE_MAX],
            count: 0,
        }
    }

    /// 压入一个 TIM 字节，覆盖最旧的一项，返回新的聚合值
    pub fn push(&mut self, tim: u8) -> u8 {
        self.saved[self.count] = tim;
        self.count = (self.count + 1) % BEACON_TIM_SAVE_MAX;
        self.aggregate()
    }

    pub fn aggregate(&self) -> u8 {
        self.saved.iter().fold(0, |acc, t| acc | t)
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
