//! AP 模式下的客户端保活监测（null-data 探测）
//!
//! 每个 tick 遍历主接口上的站点：
//!
//! | 状态   | 动作 |
//! |--------|------|
//! | NORMAL | time_remain 减一；到 0 进入 WAIT 并探测、置 TIM 位；到 1 预先置 TIM 位 |
//! | WAIT   | loss 加一；未超过上限则重发探测并置 TIM 位，否则进入 LOST 并上送一次 deauth |
//! | LOST   | 跳过，等待协议栈移除 |
//!
//! 状态推进在站表锁内完成，帧的构造与发送在锁外进行。
//!
//! 每个 tick 都向 TIM 环压入本次的字节（包括 0），旧位因此在环长个 tick 后老化清除。

use alloc::vec::Vec;

use ieee80211::ieee80211::{fc, write_hdr3, HDR3_LEN, WLAN_REASON_DEAUTH_LEAVING};
use ieee80211::Mac80211Host;
use sip::SipTransport;
use skb::{tx_flags, SkBuff};

use crate::epub::EspPub;
use crate::node::{NodeTable, StaState};
use crate::timer::{TimerId, TimerOps};

/// 探测帧与 deauth 使用的 duration（60ms）
const ND_DURATION: u16 = 0x003c;

/// deauth 帧长度：三地址头 + reason code
const DEAUTH_LEN: usize = HDR3_LEN + 2;

/// 一次保活 tick 的结果
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LivenessTick {
    /// 本 tick 产生的 TIM 字节
    pub tim: u8,
    /// 需要探测的站点
    pub probes: Vec<[u8; 6]>,
    /// 判定为失联、需上送 deauth 的站点
    pub deauths: Vec<[u8; 6]>,
}

#[inline]
fn aid_bit(aid: u16) -> u8 {
    if aid < 8 {
        1 << aid
    } else {
        0
    }
}

/// 推进 `ifidx` 上各站点的保活状态
pub fn liveness_tick(nodes: &mut NodeTable, ifidx: u8, loss_count_max: u32) -> LivenessTick {
    let mut out = LivenessTick::default();
    for node in nodes.iter_vif_mut(ifidx) {
        match node.sta_state {
            StaState::Normal => {
                node.time_remain = node.time_remain.saturating_sub(1);
                if node.time_remain == 0 {
                    node.sta_state = StaState::Wait;
                    out.probes.push(node.addr);
                    out.tim |= aid_bit(node.aid);
                } else if node.time_remain == 1 {
                    out.tim |= aid_bit(node.aid);
                }
            }
            StaState::Wait => {
                node.loss_count += 1;
                if node.loss_count <= loss_count_max {
                    out.probes.push(node.addr);
                    out.tim |= aid_bit(node.aid);
                } else {
                    node.sta_state = StaState::Lost;
                    out.deauths.push(node.addr);
                }
            }
            StaState::Lost => {}
        }
    }
    out
}

/// null-data 探测帧：FromDS，a1 = 站点，a2 = a3 = AP 地址，不加密
pub fn build_nulldata(sta: &[u8; 6], master: &[u8; 6], ifidx: u8, headroom: usize) -> Option<SkBuff> {
    let mut skb = SkBuff::alloc_with_headroom(HDR3_LEN, headroom);
    let hdr = skb.put(HDR3_LEN)?;
    let frame_control = fc::TYPE_DATA | fc::SUBTYPE_NULLFUNC | fc::FROMDS;
    if !write_hdr3(hdr, frame_control, ND_DURATION, sta, master, master) {
        return None;
    }
    skb.cb.flags |= tx_flags::DONT_ENCRYPT;
    skb.cb.vif_idx = Some(ifidx);
    skb.cb.hw_key_idx = None;
    Some(skb)
}

/// 伪造站点发出的 deauth（reason 3），上送协议栈以移除失联站点
pub fn build_deauth(sta: &[u8; 6], master: &[u8; 6]) -> Option<SkBuff> {
    let mut skb = SkBuff::alloc(DEAUTH_LEN);
    let frame = skb.put(DEAUTH_LEN)?;
    let frame_control = fc::TYPE_MGMT | fc::SUBTYPE_DEAUTH;
    if !write_hdr3(frame, frame_control, ND_DURATION, master, sta, master) {
        return None;
    }
    frame[HDR3_LEN..].copy_from_slice(&WLAN_REASON_DEAUTH_LEAVING.to_le_bytes());
    Some(skb)
}

impl<T: SipTransport, H: Mac80211Host, C: TimerOps> EspPub<T, H, C> {
    /// 记录主接口并启动保活定时器
    pub(crate) fn conn_monitor_open(&self, ifidx: u8) {
        {
            let mut vifs = self.vifs.lock();
            let Some(addr) = vifs.get(ifidx).map(|v| v.addr) else {
                return;
            };
            vifs.set_master(ifidx, addr);
        }
        let expires = self.timer.now_ms() + self.conf.nd_first_expiry_ms;
        self.timer.mod_timer(TimerId::NullData(ifidx), expires);
        log::debug!(target: "wireless::espmac", "conn monitor open on vif {}", ifidx);
    }

    /// 同步取消保活定时器并清除主接口；可重复调用
    pub(crate) fn conn_monitor_close(&self, ifidx: u8) {
        self.timer.del_timer_sync(TimerId::NullData(ifidx));
        let mut vifs = self.vifs.lock();
        if matches!(vifs.master(), Some((m, _)) if m == ifidx) {
            vifs.clear_master();
        }
        log::debug!(target: "wireless::espmac", "conn monitor close on vif {}", ifidx);
    }

    /// 保活定时器到期（esp_send_nulldata_alarm）
    pub fn nulldata_alarm(&self, ifidx: u8) {
        let master = self.vifs.lock().master();
        let Some((_, master_addr)) = master.filter(|(m, _)| *m == ifidx) else {
            log::trace!(target: "wireless::espmac", "nulldata tick on non-master vif {}", ifidx);
            return;
        };

        let tick = {
            let mut nodes = self.nodes.lock();
            liveness_tick(&mut nodes, ifidx, self.conf.loss_count_max)
        };
        let aggregate = self.tim.lock().push(tick.tim);
        if tick.tim != 0 {
            log::trace!(target: "wireless::espmac", "tim {:#04x} aggregate {:#04x}", tick.tim, aggregate);
        }

        for sta in &tick.probes {
            if let Some(skb) = build_nulldata(sta, &master_addr, ifidx, self.conf.extra_tx_headroom) {
                self.sip.tx_data_pkt_enqueue(skb);
            }
        }
        for sta in &tick.deauths {
            log::warn!(target: "wireless::espmac", "station {:02x?} lost, deauth", sta);
            self.sendup_deauth(sta, &master_addr);
        }
        if !tick.deauths.is_empty() {
            self.sendup_work();
        }

        let expires = self.timer.now_ms() + self.conf.nd_timer_interval_ms;
        self.timer.mod_timer(TimerId::NullData(ifidx), expires);
    }

    /// 构造 deauth 放入上送队列
    pub(crate) fn sendup_deauth(&self, sta: &[u8; 6], master: &[u8; 6]) {
        if let Some(skb) = build_deauth(sta, master) {
            self.rxq.push_tail(skb);
        }
    }

    /// 清空上送队列，在所有锁之外把帧交给协议栈
    pub(crate) fn sendup_work(&self) {
        for skb in self.rxq.take_all() {
            self.host.rx(skb);
        }
    }

    /// 收到站点的帧：恢复为 NORMAL
    pub fn station_rx_activity(&self, addr: &[u8; 6]) {
        let mut nodes = self.nodes.lock();
        let max = nodes.time_remain_max();
        if let Ok(node) = nodes.get_by_addr_mut(addr) {
            node.reset_liveness(max);
        }
    }
}
