//! ESP softMAC 驱动核心 (espmac)
//!
//! 位于 mac80211 协议栈与 SIP 固件传输之间，负责：
//! - 站表与每 TID 的 TX AMPDU 会话状态机
//! - RX 重排会话登记
//! - AP 模式客户端保活（null-data 探测、TIM 环、deauth 上送）
//! - beacon 定时下发与 TIM 改写
//! - 接口生命周期、密钥槽位、扫描与 remain-on-channel
//!
//! 平台提供 [sip::SipTransport]、[ieee80211::Mac80211Host] 与 [TimerOps] 三个实现，
//! 构造 [EspPub] 后经 [Mac80211Ops] 驱动；定时器到期调用 [EspPub::timer_expired]，
//! 固件事件调用 [EspPub::handle_sip_event]。

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod ampdu;
mod beacon;
mod config;
mod conn_monitor;
mod epub;
mod error;
mod event;
mod key;
mod node;
mod ops;
mod rxampdu;
mod scan;
mod session;
mod tim;
mod timer;
mod vif;

#[cfg(test)]
mod mock;

pub use ampdu::{TidState, TxTid};
pub use beacon::{patch_tim, BeaconClock};
pub use config::{
    parse_configfile, EspConf, ESP_AMPDU_TRIGGER_CNT, ESP_LOSS_COUNT_MAX, ESP_ND_TIMER_INTERVAL_MS,
    ESP_ND_TIME_REMAIN_MAX, ESP_PUB_MAX_STA,
};
pub use conn_monitor::{build_deauth, build_nulldata, liveness_tick, LivenessTick};
pub use epub::{wl_flags, EspPub, HwCaps, ESP_CHANNELS_2GHZ};
pub use error::{EspError, EspResult};
pub use key::{KeyMap, KeySlot};
pub use node::{EspNode, NodeTable, StaState, NODE_TABLE_CAPACITY};
pub use ops::{Mac80211Ops, FLUSH_TIMEOUT_MS};
pub use rxampdu::{RxAmpduRegistry, ESP_PUB_MAX_RXAMPDU};
pub use scan::{SCAN_PERMIT_MS, SCAN_TIMEOUT_PER_CHANNEL_MS};
pub use tim::{TimRing, BEACON_TIM_SAVE_MAX};
pub use timer::{TimerId, TimerOps};
pub use vif::{getaddr_index, iftype_mode, EspVif, VifTable, ESP_PUB_MAX_VIF};
