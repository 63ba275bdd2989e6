//! ESP softMAC wireless crate
//!
//! 整合 ESP 系列 SDIO/SPI WiFi 芯片的 softMAC 驱动核心：
//! - ieee80211：cfg80211 / mac80211 接口子集与 802.11 帧字段
//! - skb：帧缓冲与队列
//! - sip：主机/固件命令、事件与传输通道抽象
//! - espmac：站表、AMPDU 会话、保活、beacon 调度、接口/密钥/扫描

#![no_std]

extern crate alloc;

pub use espmac;
pub use ieee80211;
pub use sip;
pub use skb;

use espmac::{EspConf, EspPub, HwCaps, TimerOps};
use ieee80211::Mac80211Host;
use sip::SipTransport;

/// 无线驱动上下文：驱动核心 + 注册时得到的硬件能力
///
/// 平台在传输层就绪后创建，交给协议栈适配层使用
pub struct EspWirelessDriver<T: SipTransport, H: Mac80211Host, C: TimerOps> {
    pub esp: EspPub<T, H, C>,
    pub caps: HwCaps,
}

impl<T: SipTransport, H: Mac80211Host, C: TimerOps> EspWirelessDriver<T, H, C> {
    pub fn new(conf: EspConf, sip: T, host: H, timer: C) -> Self {
        let esp = EspPub::new(conf, sip, host, timer);
        let caps = esp.register();
        Self { esp, caps }
    }

    pub fn esp(&self) -> &EspPub<T, H, C> {
        &self.esp
    }

    pub fn caps(&self) -> &HwCaps {
        &self.caps
    }
}

impl<T: SipTransport, H: Mac80211Host, C: TimerOps> Drop for EspWirelessDriver<T, H, C> {
    fn drop(&mut self) {
        self.esp.unregister();
    }
}

/// 驱动初始化：可选的配置文件内容（`esp_init_data.conf` 形式的 `KEY=value` 行）覆盖默认配置
///
/// 对应 esp_pub_alloc_mac80211 + esp_register_mac80211；固件下载与传输层探测由平台在此之前完成
pub fn esp_wireless_init<T: SipTransport, H: Mac80211Host, C: TimerOps>(
    config_file: Option<&[u8]>,
    sip: T,
    host: H,
    timer: C,
) -> EspWirelessDriver<T, H, C> {
    let mut conf = EspConf::default();
    if let Some(data) = config_file {
        espmac::parse_configfile(data, &mut conf);
    }
    log::info!(target: "wireless", "wireless: init esp driver mac={:02x?}", conf.mac_addr);
    EspWirelessDriver::new(conf, sip, host, timer)
}
