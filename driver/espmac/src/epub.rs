//! 驱动上下文 [EspPub]（esp_pub）
//!
//! 持有固件传输、协议栈回调、定时器三个协作者，以及驱动核心的全部共享状态。
//! 每类状态一把独立的 `spin::Mutex`，锁内不调用协作者；标志位用原子量。
//!
//! 锁顺序（需要嵌套时）：vifs → nodes → rx_ampdu → tim。

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use ieee80211::cfg80211::ChannelType;
use ieee80211::ieee80211::wlan_cipher_suite;
use ieee80211::{Channel, Conf, Mac80211Host, Nl80211Iftype, Vif};
use sip::{SipCmd, SipTransport};
use skb::SkbQueue;
use spin::Mutex;

use crate::config::EspConf;
use crate::error::{EspError, EspResult};
use crate::key::KeyMap;
use crate::node::NodeTable;
use crate::rxampdu::RxAmpduRegistry;
use crate::scan::ScanState;
use crate::tim::TimRing;
use crate::timer::{TimerId, TimerOps};
use crate::vif::VifTable;

/// esp_wl.flags
pub mod wl_flags {
    pub const HW_REGISTERED: u32 = 1 << 0;
    /// STA 已关联到非零 BSSID
    pub const CONNECT: u32 = 1 << 1;
    /// 扫描期间停了发送队列，扫描结束需重新触发
    pub const STOP_TXQ: u32 = 1 << 2;
    pub const RFKILL: u32 = 1 << 3;
}

/// 2.4G 信道 1..13
pub const ESP_CHANNELS_2GHZ: [Channel; 13] = [
    Channel::new_2g(2412, 25),
    Channel::new_2g(2417, 25),
    Channel::new_2g(2422, 25),
    Channel::new_2g(2427, 25),
    Channel::new_2g(2432, 25),
    Channel::new_2g(2437, 25),
    Channel::new_2g(2442, 25),
    Channel::new_2g(2447, 25),
    Channel::new_2g(2452, 25),
    Channel::new_2g(2457, 25),
    Channel::new_2g(2462, 25),
    Channel::new_2g(2467, 25),
    Channel::new_2g(2472, 25),
];

/// 向协议栈注册的硬件能力（ieee80211_hw / wiphy 字段）
#[derive(Debug, Clone)]
pub struct HwCaps {
    pub perm_addrs: [[u8; 6]; 2],
    pub n_addresses: usize,
    pub channels: &'static [Channel],
    pub cipher_suites: &'static [u32],
    pub interface_modes: &'static [Nl80211Iftype],
    pub max_scan_ssids: u8,
    pub max_remain_on_channel_ms: u32,
    pub max_rx_aggregation_subframes: u8,
    pub max_tx_aggregation_subframes: u8,
    pub max_listen_interval: u16,
    pub queues: u8,
    pub ht_supported: bool,
    pub ht_cap: u16,
}

const ESP_CIPHER_SUITES: [u32; 4] = [
    wlan_cipher_suite::WEP40,
    wlan_cipher_suite::WEP104,
    wlan_cipher_suite::TKIP,
    wlan_cipher_suite::CCMP,
];

const ESP_INTERFACE_MODES: [Nl80211Iftype; 4] = [
    Nl80211Iftype::P2pGo,
    Nl80211Iftype::P2pClient,
    Nl80211Iftype::Station,
    Nl80211Iftype::Ap,
];

pub struct EspPub<T: SipTransport, H: Mac80211Host, C: TimerOps> {
    pub(crate) conf: EspConf,
    pub(crate) sip: T,
    pub(crate) host: H,
    pub(crate) timer: C,

    /// 站表与各站 TX AMPDU 会话（tx_ampdu_lock）
    pub(crate) nodes: Mutex<NodeTable>,
    /// rx_ampdu_lock
    pub(crate) rx_ampdu: Mutex<RxAmpduRegistry>,
    pub(crate) tim: Mutex<TimRing>,
    /// 接口槽位、AP 状态、保活主接口
    pub(crate) vifs: Mutex<VifTable>,
    pub(crate) keys: Mutex<KeyMap>,
    pub(crate) scan: Mutex<ScanState>,
    pub(crate) hw_conf: Mutex<Option<Conf>>,
    pub(crate) bssid: Mutex<[u8; 6]>,
    /// 待上送协议栈的帧（驱动构造的 deauth 等）
    pub(crate) rxq: SkbQueue,

    pub(crate) wl_off: AtomicBool,
    pub(crate) wl_flags: AtomicU32,
    pub(crate) roc_flags: AtomicBool,
    pub(crate) txq_stopped: AtomicBool,
    pub(crate) rx_filter: AtomicU32,
    pub(crate) tkip_key_set: AtomicBool,
}

impl<T: SipTransport, H: Mac80211Host, C: TimerOps> EspPub<T, H, C> {
    /// 对应 esp_pub_alloc_mac80211：无线初始为关闭，直到 `start`
    pub fn new(mut conf: EspConf, sip: T, host: H, timer: C) -> Self {
        if !conf.p2p_concurrent {
            conf.vif_addrs[0] = conf.mac_addr;
        }
        let nodes = NodeTable::new(conf.max_sta_per_vif, conf.time_remain_max);
        Self {
            conf,
            sip,
            host,
            timer,
            nodes: Mutex::new(nodes),
            rx_ampdu: Mutex::new(RxAmpduRegistry::new()),
            tim: Mutex::new(TimRing::new()),
            vifs: Mutex::new(VifTable::new()),
            keys: Mutex::new(KeyMap::new()),
            scan: Mutex::new(ScanState::default()),
            hw_conf: Mutex::new(None),
            bssid: Mutex::new([0; 6]),
            rxq: SkbQueue::new(),
            wl_off: AtomicBool::new(true),
            wl_flags: AtomicU32::new(0),
            roc_flags: AtomicBool::new(false),
            txq_stopped: AtomicBool::new(false),
            rx_filter: AtomicU32::new(0),
            tkip_key_set: AtomicBool::new(false),
        }
    }

    /// 对应 esp_register_mac80211：返回向协议栈登记的能力
    pub fn register(&self) -> HwCaps {
        let (perm_addrs, n_addresses) = if self.conf.p2p_concurrent {
            (self.conf.vif_addrs, 2)
        } else {
            ([self.conf.mac_addr, [0; 6]], 1)
        };
        self.set_wl_flag(wl_flags::HW_REGISTERED);
        log::info!(target: "wireless::espmac", "register hw addr={:02x?} n_addresses={}", perm_addrs[0], n_addresses);
        HwCaps {
            perm_addrs,
            n_addresses,
            channels: &ESP_CHANNELS_2GHZ,
            cipher_suites: &ESP_CIPHER_SUITES,
            interface_modes: &ESP_INTERFACE_MODES,
            max_scan_ssids: 2,
            max_remain_on_channel_ms: 5000,
            max_rx_aggregation_subframes: 0x40,
            max_tx_aggregation_subframes: 0x40,
            max_listen_interval: 10,
            queues: 4,
            ht_supported: true,
            ht_cap: 0x112c,
        }
    }

    /// 对应 esp_pub_dealloc_mac80211
    pub fn unregister(&self) {
        self.set_wl_flag(wl_flags::RFKILL);
        self.clear_wl_flag(wl_flags::HW_REGISTERED);
        self.rxq.purge();
    }

    pub fn conf(&self) -> &EspConf {
        &self.conf
    }

    pub fn sip(&self) -> &T {
        &self.sip
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn timer(&self) -> &C {
        &self.timer
    }

    pub fn is_off(&self) -> bool {
        self.wl_off.load(Ordering::Acquire)
    }

    pub fn is_roc(&self) -> bool {
        self.roc_flags.load(Ordering::Acquire)
    }

    pub fn wl_flags(&self) -> u32 {
        self.wl_flags.load(Ordering::Acquire)
    }

    pub(crate) fn set_wl_flag(&self, flag: u32) {
        self.wl_flags.fetch_or(flag, Ordering::AcqRel);
    }

    pub(crate) fn clear_wl_flag(&self, flag: u32) {
        self.wl_flags.fetch_and(!flag, Ordering::AcqRel);
    }

    /// test_and_clear_bit
    pub(crate) fn test_and_clear_wl_flag(&self, flag: u32) -> bool {
        self.wl_flags.fetch_and(!flag, Ordering::AcqRel) & flag != 0
    }

    /// 当前信道类型（cfg80211_get_chandef_type）；尚未配置视为 NO_HT
    pub fn chan_type(&self) -> ChannelType {
        let conf = *self.hw_conf.lock();
        conf.map(|c| c.chandef.chan_type).unwrap_or(ChannelType::NoHt)
    }

    /// 协议栈下发的 vif 对应的驱动接口下标
    pub(crate) fn vif_index(&self, vif: &Vif) -> EspResult<u8> {
        self.vifs.lock().find_by_addr(&vif.addr).ok_or(EspError::NotFound)
    }

    /// 平台定时器到期回调入口
    pub fn timer_expired(&self, id: TimerId) {
        match id {
            TimerId::Beacon(ifidx) => self.beacon_tick(ifidx),
            TimerId::NullData(ifidx) => self.nulldata_alarm(ifidx),
            TimerId::ScanTimeout => self.scan_timeout_report(),
        }
    }

    pub(crate) fn send_cmd(&self, cmd: SipCmd) -> EspResult {
        self.sip.send_cmd(&cmd).map_err(|e| {
            log::warn!(target: "wireless::espmac", "sip cmd {} failed: {:?}", cmd.id(), e);
            EspError::from(e)
        })
    }
}
