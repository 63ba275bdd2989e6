//! Beacon 调度
//!
//! 驱动自行按 beacon 间隔从协议栈取 beacon 模板、改写 TIM 后交给固件发送。
//! 定时用累计周期数乘以间隔、相对一个参考时刻计算，避免逐次取整误差累积；
//! 每 100 个周期重设一次参考时刻。

use ieee80211::ieee80211::BEACON_FIXED_LEN;
use ieee80211::{Mac80211Host, WlanEid};
use sip::SipTransport;

use crate::epub::EspPub;
use crate::timer::{TimerId, TimerOps};

/// 参考时刻重设周期
const BEACON_CYCLE_RESET: u64 = 100;

/// 每接口 beacon 时钟（init_jiffies / cycle_beacon_count）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BeaconClock {
    pub init_ms: u64,
    pub cycle_count: u64,
    /// TU
    pub beacon_int: u16,
}

impl BeaconClock {
    pub fn start(now_ms: u64, beacon_int: u16) -> Self {
        Self {
            init_ms: now_ms,
            cycle_count: 1,
            beacon_int,
        }
    }

    /// 下一次到期时刻：init + cycle * beacon_int * 1024us
    pub fn expiry(&self) -> u64 {
        self.init_ms + self.cycle_count * self.beacon_int as u64 * 1024 / 1000
    }

    /// 进入下一周期并返回新的到期时刻
    pub fn advance(&mut self, now_ms: u64) -> u64 {
        let cycle = self.cycle_count;
        self.cycle_count += 1;
        if cycle == BEACON_CYCLE_RESET {
            self.init_ms = now_ms;
            self.cycle_count -= BEACON_CYCLE_RESET;
        }
        self.expiry()
    }
}

/// 改写 beacon 中的 TIM 元素。
///
/// DTIM count 为 0 时置组播位（bitmap control bit0）；bitmap offset 为 0 且 PVB 至少一字节时，
/// 把 `aggregate` 或入 PVB 第一字节（只覆盖 AID 0..7）。返回是否为 DTIM beacon，
/// 即之后需要发送缓存的组播/广播帧。
pub fn patch_tim(beacon: &mut [u8], aggregate: u8) -> bool {
    let mut pos = BEACON_FIXED_LEN;
    while pos + 2 <= beacon.len() {
        let eid = beacon[pos];
        let len = beacon[pos + 1] as usize;
        if eid == WlanEid::Tim.as_u8() {
            if len < 3 || pos + 2 + len > beacon.len() {
                return false;
            }
            let dtim_count = beacon[pos + 2];
            let ctrl = pos + 4;
            if dtim_count == 0 {
                beacon[ctrl] |= 0x01;
            }
            if beacon[ctrl] & 0xfe == 0 && len >= 4 {
                beacon[ctrl + 1] |= aggregate;
            }
            return dtim_count == 0;
        }
        pos += 2 + len;
    }
    false
}

impl<T: SipTransport, H: Mac80211Host, C: TimerOps> EspPub<T, H, C> {
    /// 启动 beacon 定时器（init_beacon_timer），同时清空 TIM 环
    pub(crate) fn beacon_start(&self, ifidx: u8, beacon_int: u16) {
        let now = self.timer.now_ms();
        let clock = BeaconClock::start(now, beacon_int);
        {
            let mut vifs = self.vifs.lock();
            let Some(ev) = vifs.get_mut(ifidx) else {
                return;
            };
            ev.beacon_interval = beacon_int;
            ev.clock = clock;
            ev.ap_up = true;
        }
        self.tim.lock().clear();
        self.timer.mod_timer(TimerId::Beacon(ifidx), clock.expiry());
        log::info!(target: "wireless::espmac", "beacon start vif {} interval {} TU", ifidx, beacon_int);
    }

    pub(crate) fn beacon_stop(&self, ifidx: u8) {
        if let Some(ev) = self.vifs.lock().get_mut(ifidx) {
            ev.ap_up = false;
            ev.beacon_interval = 0;
        }
        self.timer.del_timer_sync(TimerId::Beacon(ifidx));
        log::info!(target: "wireless::espmac", "beacon stop vif {}", ifidx);
    }

    /// beacon 定时器到期（drv_handle_beacon）
    pub fn beacon_tick(&self, ifidx: u8) {
        let up = self.vifs.lock().get(ifidx).map(|v| v.ap_up).unwrap_or(false);
        if !up {
            log::trace!(target: "wireless::espmac", "beacon tick on idle vif {}", ifidx);
            return;
        }

        let mut dtim = false;
        if let Some(mut beacon) = self.host.beacon_get(ifidx) {
            let aggregate = self.tim.lock().aggregate();
            dtim = patch_tim(beacon.data_mut(), aggregate);
            log::trace!(target: "wireless::espmac", "beacon len {} tim {:#04x} dtim {}", beacon.len(), aggregate, dtim);
            beacon.cb.vif_idx = Some(ifidx);
            self.sip.tx_data_pkt_enqueue(beacon);
        }

        let now = self.timer.now_ms();
        let next = self
            .vifs
            .lock()
            .get_mut(ifidx)
            .filter(|v| v.ap_up)
            .map(|v| v.clock.advance(now));
        if let Some(expires) = next {
            self.timer.mod_timer(TimerId::Beacon(ifidx), expires);
        }

        // TODO: 缓存组播帧应在工作信道上发送，离开信道（ROC）期间需要推迟
        if dtim {
            while let Some(mut skb) = self.host.get_buffered_bc(ifidx) {
                skb.cb.vif_idx = Some(ifidx);
                self.sip.tx_data_pkt_enqueue(skb);
            }
        }
    }
}
