//! IEEE 802.11 类型与常量
//!
//! 对应 Linux include/linux/ieee80211.h 中 ESP 驱动用到的部分：信道、帧头字段、
//! QoS/序列号解析、TIM 元素、cipher suite。

/// 频段（对应 NL80211_BAND_*）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Band {
    #[default]
    TwoGhz = 0,
    FiveGhz = 1,
}

/// 信道（对应 struct ieee80211_channel）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    /// 中心频率 MHz
    pub center_freq: u32,
    pub band: Band,
    pub max_power: i8,
}

impl Channel {
    pub const fn new_2g(freq_mhz: u32, max_power_dbm: i8) -> Self {
        Self {
            center_freq: freq_mhz,
            band: Band::TwoGhz,
            max_power: max_power_dbm,
        }
    }
}

/// 802.11 信息元素 ID（WLAN_EID_*）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WlanEid {
    Ssid = 0,
    SupportedRates = 1,
    DsParams = 3,
    Tim = 5,
    HtCapability = 45,
}

impl WlanEid {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// frame_control 字段（little-endian u16 视角）
pub mod fc {
    pub const TYPE_MASK: u16 = 0x000C;
    pub const STYPE_MASK: u16 = 0x00F0;
    pub const TYPE_MGMT: u16 = 0x0000;
    pub const TYPE_DATA: u16 = 0x0008;
    pub const SUBTYPE_BEACON: u16 = 0x0080;
    pub const SUBTYPE_DEAUTH: u16 = 0x00C0;
    pub const SUBTYPE_NULLFUNC: u16 = 0x0040;
    /// data 帧的 QoS 子类型位（IEEE80211_STYPE_QOS_DATA）
    pub const SUBTYPE_QOS_DATA: u16 = 0x0080;
    pub const TODS: u16 = 0x0100;
    pub const FROMDS: u16 = 0x0200;
}

/// 三地址帧头长度
pub const HDR3_LEN: usize = 24;
/// 四地址帧头长度
pub const HDR4_LEN: usize = 30;
/// Beacon 固定部分：帧头 24 + timestamp 8 + beacon_int 2 + capab 2
pub const BEACON_FIXED_LEN: usize = HDR3_LEN + 12;
/// QoS control 中 TID 掩码（IEEE80211_QOS_CTL_TID_MASK）
pub const QOS_CTL_TID_MASK: u8 = 0x0f;
/// 序列号 12 位
pub const SEQ_MASK: u16 = 0x0fff;
/// 每站 TID 数（WME_NUM_TID）
pub const WME_NUM_TID: usize = 8;
/// 去认证原因：站点离开（WLAN_REASON_DEAUTH_LEAVING）
pub const WLAN_REASON_DEAUTH_LEAVING: u16 = 3;

/// Cipher suite（WLAN_CIPHER_SUITE_*）
pub mod wlan_cipher_suite {
    pub const WEP40: u32 = 0x000F_AC01;
    pub const TKIP: u32 = 0x000F_AC02;
    pub const CCMP: u32 = 0x000F_AC04;
    pub const WEP104: u32 = 0x000F_AC05;
    pub const AES_CMAC: u32 = 0x000F_AC06;

    #[inline]
    pub fn is_wep(cipher: u32) -> bool {
        cipher == WEP40 || cipher == WEP104
    }
}

/// 从帧取 frame_control（前 2 字节，little-endian）
#[inline]
pub fn frame_control(buf: &[u8]) -> u16 {
    if buf.len() >= 2 {
        u16::from_le_bytes([buf[0], buf[1]])
    } else {
        0
    }
}

#[inline]
pub fn is_mgmt(fc: u16) -> bool {
    (fc & fc::TYPE_MASK) == fc::TYPE_MGMT
}

#[inline]
pub fn is_beacon(fc: u16) -> bool {
    is_mgmt(fc) && (fc & fc::STYPE_MASK) == fc::SUBTYPE_BEACON
}

#[inline]
pub fn is_deauth(fc: u16) -> bool {
    is_mgmt(fc) && (fc & fc::STYPE_MASK) == fc::SUBTYPE_DEAUTH
}

/// 对应 ieee80211_is_data_qos
#[inline]
pub fn is_data_qos(fc: u16) -> bool {
    (fc & fc::TYPE_MASK) == fc::TYPE_DATA && (fc & fc::SUBTYPE_QOS_DATA) != 0
}

/// 对应 ieee80211_has_a4
#[inline]
pub fn has_a4(fc: u16) -> bool {
    (fc & (fc::TODS | fc::FROMDS)) == (fc::TODS | fc::FROMDS)
}

/// 帧头中的序列号（seq_ctrl >> 4）
#[inline]
pub fn seq_num(buf: &[u8]) -> Option<u16> {
    if buf.len() < HDR3_LEN {
        return None;
    }
    Some(u16::from_le_bytes([buf[22], buf[23]]) >> 4)
}

/// QoS data 帧的 TID（对应 ieee80211_get_qos_ctl(hdr)[0] & TID_MASK）
#[inline]
pub fn qos_tid(buf: &[u8]) -> Option<u8> {
    let fc = frame_control(buf);
    if !is_data_qos(fc) {
        return None;
    }
    let off = if has_a4(fc) { HDR4_LEN } else { HDR3_LEN };
    buf.get(off).map(|b| b & QOS_CTL_TID_MASK)
}

/// 下一个 12 位序列号（GET_NEXT_SEQ）
#[inline]
pub const fn next_seq(seq: u16) -> u16 {
    seq.wrapping_add(1) & SEQ_MASK
}

/// 写三地址帧头：frame_control、duration、addr1..3，seq_ctrl 置 0
pub fn write_hdr3(buf: &mut [u8], fc: u16, duration: u16, a1: &[u8; 6], a2: &[u8; 6], a3: &[u8; 6]) -> bool {
    if buf.len() < HDR3_LEN {
        return false;
    }
    buf[0..2].copy_from_slice(&fc.to_le_bytes());
    buf[2..4].copy_from_slice(&duration.to_le_bytes());
    buf[4..10].copy_from_slice(a1);
    buf[10..16].copy_from_slice(a2);
    buf[16..22].copy_from_slice(a3);
    buf[22..24].fill(0);
    true
}
