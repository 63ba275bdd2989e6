//! Socket buffer (skb) 模块: 对应 ESP 驱动依赖的 `linux/skbuff.h`
//!
//! - **[SkBuff]**：单帧缓冲，`put`/`pull`/`push`，带发送控制块 [SkbCb]
//! - **[SkbQueue]**：带锁 FIFO（对应 `struct sk_buff_head`），用于收包上送队列

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod queue;
mod skbuff;

pub use queue::SkbQueue;
pub use skbuff::{tx_flags, SkBuff, SkbCb};
