//! SkbQueue: 对应 Linux `struct sk_buff_head`（自带 spinlock 的 FIFO）
//!
//! 收包上送队列（rxq）使用：可在定时器上下文入队，在 sendup work 中整体取出。

use alloc::collections::VecDeque;

use super::SkBuff;

/// 带锁的 skb FIFO，对应 `skb_queue_tail` / `skb_dequeue`。
pub struct SkbQueue {
    queue: spin::Mutex<VecDeque<SkBuff>>,
}

impl SkbQueue {
    pub const fn new() -> Self {
        Self {
            queue: spin::Mutex::new(VecDeque::new()),
        }
    }

    /// 对应 `skb_queue_tail`。
    pub fn push_tail(&self, skb: SkBuff) {
        self.queue.lock().push_back(skb);
    }

    /// 对应 `skb_dequeue`。
    pub fn pop_head(&self) -> Option<SkBuff> {
        self.queue.lock().pop_front()
    }

    /// 一次取走全部（对应 skb_queue_splice_init 到私有链表），调用方在锁外逐个处理。
    pub fn take_all(&self) -> VecDeque<SkBuff> {
        core::mem::take(&mut *self.queue.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// 对应 `skb_queue_purge`。
    pub fn purge(&self) {
        self.queue.lock().clear();
    }
}

impl Default for SkbQueue {
    fn default() -> Self {
        Self::new()
    }
}
