//! cfg80211 抽象
//!
//! 对应 Linux net/cfg80211.h 中 ESP 驱动用到的部分：接口类型、信道定义、扫描请求。

use crate::ieee80211::Channel;

/// 虚拟接口类型（对应 NL80211_IFTYPE_*）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum Nl80211Iftype {
    #[default]
    Unspecified = 0,
    AdHoc = 1,
    Station = 2,
    Ap = 3,
    ApVlan = 4,
    Wds = 5,
    Monitor = 6,
    MeshPoint = 7,
    P2pClient = 8,
    P2pGo = 9,
    P2pDevice = 10,
}

/// 信道类型（对应 enum nl80211_channel_type，cfg80211_get_chandef_type 的返回值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ChannelType {
    #[default]
    NoHt = 0,
    Ht20 = 1,
    Ht40Minus = 2,
    Ht40Plus = 3,
}

impl ChannelType {
    #[inline]
    pub fn is_ht(self) -> bool {
        self != ChannelType::NoHt
    }
}

/// 信道定义（对应 struct cfg80211_chan_def，简化为主信道 + 类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChanDef {
    pub channel: Channel,
    pub chan_type: ChannelType,
}

/// SSID（对应 struct cfg80211_ssid）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ssid {
    pub ssid: [u8; 32],
    pub ssid_len: u8,
}

impl Ssid {
    pub fn new(s: &[u8]) -> Self {
        let len = s.len().min(32);
        let mut ssid = [0u8; 32];
        ssid[..len].copy_from_slice(&s[..len]);
        Self {
            ssid,
            ssid_len: len as u8,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.ssid[..self.ssid_len as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.ssid_len == 0
    }
}

/// 扫描请求（对应 struct cfg80211_scan_request，简化）
#[derive(Debug, Clone, Copy)]
pub struct ScanRequest<'a> {
    /// 要扫描的信道（空表示所有支持信道）
    pub channels: &'a [Channel],
    /// 要探测的 SSID（空表示被动扫描）
    pub ssids: &'a [Ssid],
}
