//! SkBuff: 对应 Linux `struct sk_buff` 的帧缓冲
//!
//! 布局：`[ headroom | data (len) | tailroom ]`。
//! 另带 `cb`（对应 `IEEE80211_SKB_CB(skb)`），发送路径用它携带 vif、加密与 AMPDU 标志。

use alloc::vec::Vec;
use core::ops::{Deref, DerefMut};

/// `SkbCb::flags` 位定义（对应 IEEE80211_TX_CTL_* / IEEE80211_TX_INTFL_*）
pub mod tx_flags {
    /// 帧已属于某个 AMPDU 聚合（IEEE80211_TX_CTL_AMPDU）
    pub const AMPDU: u32 = 1 << 6;
    /// 驱动自行构造、不加密（IEEE80211_TX_INTFL_DONT_ENCRYPT）
    pub const DONT_ENCRYPT: u32 = 1 << 12;
}

/// 发送控制块（对应 struct ieee80211_tx_info 中驱动关心的字段）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkbCb {
    pub flags: u32,
    /// 所属虚拟接口下标（control.vif）
    pub vif_idx: Option<u8>,
    /// 硬件密钥槽位（control.hw_key）；None 表示不走硬件加密
    pub hw_key_idx: Option<u8>,
}

/// 帧缓冲，与 `struct sk_buff` 语义对齐。
///
/// - `put(n)`：尾部追加 n 字节；对应 `skb_put`
/// - `pull(n)`：头部消费 n 字节；对应 `skb_pull`
/// - `push(n)`：data 前扩展 n 字节；对应 `skb_push`
#[derive(Clone)]
pub struct SkBuff {
    storage: Vec<u8>,
    head: usize,
    len: usize,
    pub cb: SkbCb,
}

impl SkBuff {
    /// 对应 `dev_alloc_skb(size)`。
    pub fn alloc(capacity: usize) -> Self {
        Self::alloc_with_headroom(capacity, 0)
    }

    /// 分配 `headroom + capacity` 并预留 headroom（对应 dev_alloc_skb + skb_reserve）。
    pub fn alloc_with_headroom(capacity: usize, headroom: usize) -> Self {
        let mut storage = Vec::with_capacity(headroom + capacity);
        storage.resize(headroom + capacity, 0);
        SkBuff {
            storage,
            head: headroom,
            len: 0,
            cb: SkbCb::default(),
        }
    }

    /// 以现成帧内容构造（上层下发的 beacon、缓存组播帧等）。
    pub fn from_slice(data: &[u8]) -> Self {
        let mut skb = Self::alloc(data.len());
        if let Some(dst) = skb.put(data.len()) {
            dst.copy_from_slice(data);
        }
        skb
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.storage[self.head..self.head + self.len]
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.storage[self.head..self.head + self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn headroom(&self) -> usize {
        self.head
    }

    #[inline]
    pub fn tailroom(&self) -> usize {
        self.storage.len().saturating_sub(self.head + self.len)
    }

    /// 尾部追加 n 字节（清零），空间不足返回 None。对应 `skb_put`。
    #[inline]
    pub fn put(&mut self, n: usize) -> Option<&mut [u8]> {
        if self.tailroom() < n {
            return None;
        }
        let start = self.head + self.len;
        self.len += n;
        let area = &mut self.storage[start..start + n];
        area.fill(0);
        Some(area)
    }

    /// 对应 `skb_pull`。
    #[inline]
    pub fn pull(&mut self, n: usize) {
        let consume = n.min(self.len);
        self.head += consume;
        self.len -= consume;
    }

    /// 对应 `skb_push`；headroom 不足返回 false。
    #[inline]
    pub fn push(&mut self, n: usize) -> bool {
        if self.head < n {
            return false;
        }
        self.head -= n;
        self.len += n;
        true
    }
}

impl Deref for SkBuff {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        self.data()
    }
}

impl DerefMut for SkBuff {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.data_mut()
    }
}

impl core::fmt::Debug for SkBuff {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SkBuff")
            .field("len", &self.len)
            .field("headroom", &self.head)
            .field("cb", &self.cb)
            .finish()
    }
}
