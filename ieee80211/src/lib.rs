//! # ieee80211: IEEE 802.11 / cfg80211 / mac80211 抽象
//!
//! ESP softMAC 驱动依赖的 Linux 内核 **cfg80211** 与 **mac80211** 接口子集。
//!
//! | 模块      | Linux 位置                    | 说明 |
//! |-----------|-------------------------------|------|
//! | ieee80211 | include/linux/ieee80211.h     | 信道、帧头字段、QoS/序列号、cipher suite |
//! | cfg80211  | net/cfg80211.h                | 接口类型、信道定义、扫描请求 |
//! | mac80211  | net/mac80211.h                | vif/sta/conf/bss_conf/ampdu/key 参数与协议栈回调 [Mac80211Host] |

#![cfg_attr(not(test), no_std)]

pub mod cfg80211;
pub mod ieee80211;
pub mod mac80211;

pub use cfg80211::{ChanDef, ChannelType, Nl80211Iftype, ScanRequest, Ssid};
pub use ieee80211::{Band, Channel, WlanEid, WME_NUM_TID};
pub use mac80211::{
    AmpduAction, AmpduParams, BssConf, Conf, HtCap, KeyConf, Mac80211Host, SetKeyCmd, Sta,
    TxqParams, Vif,
};
