//! mac80211 抽象
//!
//! 对应 Linux net/mac80211.h：ieee80211_vif / ieee80211_sta / ieee80211_conf / bss_conf /
//! ampdu_params / key_conf / tx_queue_params，以及驱动回调协议栈的函数（beacon_get、
//! get_buffered_bc、ieee80211_rx、scan_completed、*_tx_ba_cb 等）。

use skb::SkBuff;

use crate::cfg80211::{ChanDef, Nl80211Iftype};

/// 虚拟接口（对应 struct ieee80211_vif 中驱动读取的字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vif {
    pub addr: [u8; 6],
    pub iftype: Nl80211Iftype,
    pub p2p: bool,
}

/// 站 HT 能力（对应 struct ieee80211_sta_ht_cap，简化）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HtCap {
    pub ht_supported: bool,
    pub cap: u16,
    pub ampdu_factor: u8,
    pub ampdu_density: u8,
}

/// 对端站（对应 struct ieee80211_sta）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sta {
    pub addr: [u8; 6],
    pub aid: u16,
    pub ht_cap: HtCap,
}

/// 硬件配置（对应 struct ieee80211_conf）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conf {
    pub chandef: ChanDef,
    pub flags: u32,
}

/// ieee80211_conf::flags
pub mod conf_flags {
    pub const MONITOR: u32 = 1 << 0;
    pub const PS: u32 = 1 << 1;
    pub const IDLE: u32 = 1 << 2;
}

/// config(changed) 的 changed 位（IEEE80211_CONF_CHANGE_*）
pub mod conf_changed {
    pub const SMPS: u32 = 1 << 1;
    pub const LISTEN_INTERVAL: u32 = 1 << 2;
    pub const MONITOR: u32 = 1 << 3;
    pub const PS: u32 = 1 << 4;
    pub const POWER: u32 = 1 << 5;
    pub const CHANNEL: u32 = 1 << 6;
    pub const RETRY_LIMITS: u32 = 1 << 7;
    pub const IDLE: u32 = 1 << 8;
}

/// BSS 配置（对应 struct ieee80211_bss_conf 中驱动读取的字段）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BssConf {
    pub bssid: [u8; 6],
    pub assoc: bool,
    pub aid: u16,
    pub enable_beacon: bool,
    /// beacon 间隔（TU）
    pub beacon_int: u16,
}

/// bss_info_changed 的 changed 位（BSS_CHANGED_*）
pub mod bss_changed {
    pub const ASSOC: u32 = 1 << 0;
    pub const ERP_CTS_PROT: u32 = 1 << 1;
    pub const ERP_PREAMBLE: u32 = 1 << 2;
    pub const ERP_SLOT: u32 = 1 << 3;
    pub const HT: u32 = 1 << 4;
    pub const BASIC_RATES: u32 = 1 << 5;
    pub const BEACON_INT: u32 = 1 << 6;
    pub const BSSID: u32 = 1 << 7;
    pub const BEACON: u32 = 1 << 8;
    pub const BEACON_ENABLED: u32 = 1 << 9;
}

/// configure_filter 的 FIF_* 位
pub mod filter_flags {
    pub const PROMISC_IN_BSS: u32 = 1 << 0;
    pub const ALLMULTI: u32 = 1 << 1;
    pub const FCSFAIL: u32 = 1 << 2;
    pub const CONTROL: u32 = 1 << 4;
    pub const OTHER_BSS: u32 = 1 << 5;
}

/// 软件 TX 队列参数（对应 struct ieee80211_tx_queue_params）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxqParams {
    pub txop: u16,
    pub cw_min: u16,
    pub cw_max: u16,
    pub aifs: u8,
}

/// AMPDU 动作（对应 enum ieee80211_ampdu_mlme_action）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmpduAction {
    RxStart,
    RxStop,
    TxStart,
    TxStopCont,
    TxStopFlush,
    TxStopFlushCont,
    TxOperational,
}

/// ampdu_action 参数（对应 struct ieee80211_ampdu_params）
///
/// TX_START 时驱动把起始序列号写回 `ssn`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmpduParams {
    pub action: AmpduAction,
    pub sta: Sta,
    pub tid: u16,
    pub ssn: u16,
    pub buf_size: u8,
}

/// set_key 命令（enum set_key_cmd）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKeyCmd {
    Set,
    Disable,
}

/// ieee80211_key_conf::flags
pub mod key_flags {
    pub const GENERATE_IV: u32 = 1 << 1;
    pub const GENERATE_MMIC: u32 = 1 << 2;
    pub const PAIRWISE: u32 = 1 << 3;
}

/// 密钥（对应 struct ieee80211_key_conf）；驱动写回 `hw_key_idx` 与 `flags`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyConf {
    pub cipher: u32,
    pub flags: u32,
    pub keyidx: u8,
    pub hw_key_idx: u8,
    pub keylen: u8,
    pub key: [u8; 32],
}

impl KeyConf {
    pub fn new(cipher: u32, keyidx: u8, flags: u32, key: &[u8]) -> Self {
        let len = key.len().min(32);
        let mut k = [0u8; 32];
        k[..len].copy_from_slice(&key[..len]);
        Self {
            cipher,
            flags,
            keyidx,
            hw_key_idx: 0,
            keylen: len as u8,
            key: k,
        }
    }
}

/// 协议栈（mac80211）提供给驱动的回调面
///
/// 驱动在定时器、收包、固件事件上下文中调用，实现需可重入（`&self`）。
pub trait Mac80211Host {
    /// 取当前 beacon 模板（ieee80211_beacon_get），AP 未就绪时返回 None
    fn beacon_get(&self, vif_idx: u8) -> Option<SkBuff>;

    /// 取一帧 DTIM 后待发的缓存组播/广播帧（ieee80211_get_buffered_bc）
    fn get_buffered_bc(&self, vif_idx: u8) -> Option<SkBuff>;

    /// 上送一帧（ieee80211_rx）
    fn rx(&self, skb: SkBuff);

    /// 扫描完成（ieee80211_scan_completed）
    fn scan_completed(&self, aborted: bool);

    /// 已驻留信道（ieee80211_ready_on_channel）
    fn ready_on_channel(&self);

    /// 驻留到期（ieee80211_remain_on_channel_expired）
    fn remain_on_channel_expired(&self);

    /// 请求协议栈发起 TX BA 协商（ieee80211_start_tx_ba_session）
    fn start_tx_ba_session(&self, addr: &[u8; 6], tid: u8) -> Result<(), i32>;

    /// 请求协议栈结束 TX BA（ieee80211_stop_tx_ba_session）
    fn stop_tx_ba_session(&self, addr: &[u8; 6], tid: u8) -> Result<(), i32>;

    /// TX BA 已开始（ieee80211_start_tx_ba_cb_irqsafe）
    fn start_tx_ba_cb(&self, vif_idx: u8, addr: &[u8; 6], tid: u8);

    /// TX BA 已停止（ieee80211_stop_tx_ba_cb_irqsafe）
    fn stop_tx_ba_cb(&self, vif_idx: u8, addr: &[u8; 6], tid: u8);

    /// 停止全部发送队列（ieee80211_stop_queues）
    fn stop_queues(&self);
}
