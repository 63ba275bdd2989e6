//! 单元测试用的记录型协作者

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::vec::Vec;

use axerrno::{AxError, AxResult};
use ieee80211::ieee80211::BEACON_FIXED_LEN;
use ieee80211::mac80211::bss_changed;
use ieee80211::{BssConf, HtCap, Mac80211Host, Nl80211Iftype, Sta, Vif};
use sip::{SipCmd, SipTransport};
use skb::SkBuff;
use spin::Mutex;

use crate::config::EspConf;
use crate::epub::EspPub;
use crate::ops::Mac80211Ops;
use crate::timer::{TimerId, TimerOps};

#[derive(Default)]
pub struct MockTransport {
    cmds: Mutex<Vec<SipCmd>>,
    frames: Mutex<Vec<SkBuff>>,
    queued: AtomicUsize,
    triggers: AtomicUsize,
    fail: AtomicBool,
    stuck: AtomicBool,
}

impl MockTransport {
    pub fn cmds(&self) -> Vec<SipCmd> {
        self.cmds.lock().clone()
    }

    pub fn frames(&self) -> Vec<SkBuff> {
        self.frames.lock().clone()
    }

    pub fn triggers(&self) -> usize {
        self.triggers.load(Ordering::SeqCst)
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_queued(&self, n: usize) {
        self.queued.store(n, Ordering::SeqCst);
    }

    /// 触发发送队列处理后队列仍不清空
    pub fn set_stuck(&self, stuck: bool) {
        self.stuck.store(stuck, Ordering::SeqCst);
    }
}

impl SipTransport for MockTransport {
    fn send_cmd(&self, cmd: &SipCmd) -> AxResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AxError::BadState);
        }
        self.cmds.lock().push(*cmd);
        Ok(())
    }

    fn tx_data_pkt_enqueue(&self, skb: SkBuff) {
        self.frames.lock().push(skb);
    }

    fn tx_data_pkt_queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    fn trigger_txq_process(&self) {
        self.triggers.fetch_add(1, Ordering::SeqCst);
        if !self.stuck.load(Ordering::SeqCst) {
            self.queued.store(0, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    ScanCompleted(bool),
    ReadyOnChannel,
    RocExpired,
    StartTxBa([u8; 6], u8),
    StopTxBa([u8; 6], u8),
    StartTxBaCb(u8, [u8; 6], u8),
    StopTxBaCb(u8, [u8; 6], u8),
    StopQueues,
}

#[derive(Default)]
pub struct MockHost {
    beacon: Mutex<Option<SkBuff>>,
    buffered_bc: Mutex<VecDeque<SkBuff>>,
    rx: Mutex<Vec<SkBuff>>,
    events: Mutex<Vec<HostEvent>>,
    refuse_ba: AtomicBool,
}

impl MockHost {
    pub fn set_beacon(&self, template: Option<Vec<u8>>) {
        *self.beacon.lock() = template.map(|b| SkBuff::from_slice(&b));
    }

    pub fn push_buffered_bc(&self, frame: &[u8]) {
        self.buffered_bc.lock().push_back(SkBuff::from_slice(frame));
    }

    pub fn rx_frames(&self) -> Vec<SkBuff> {
        self.rx.lock().clone()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().clone()
    }

    pub fn set_refuse_ba(&self, refuse: bool) {
        self.refuse_ba.store(refuse, Ordering::SeqCst);
    }

    fn record(&self, ev: HostEvent) {
        self.events.lock().push(ev);
    }
}

impl Mac80211Host for MockHost {
    fn beacon_get(&self, _vif_idx: u8) -> Option<SkBuff> {
        self.beacon.lock().clone()
    }

    fn get_buffered_bc(&self, _vif_idx: u8) -> Option<SkBuff> {
        self.buffered_bc.lock().pop_front()
    }

    fn rx(&self, skb: SkBuff) {
        self.rx.lock().push(skb);
    }

    fn scan_completed(&self, aborted: bool) {
        self.record(HostEvent::ScanCompleted(aborted));
    }

    fn ready_on_channel(&self) {
        self.record(HostEvent::ReadyOnChannel);
    }

    fn remain_on_channel_expired(&self) {
        self.record(HostEvent::RocExpired);
    }

    fn start_tx_ba_session(&self, addr: &[u8; 6], tid: u8) -> Result<(), i32> {
        if self.refuse_ba.load(Ordering::SeqCst) {
            return Err(-16);
        }
        self.record(HostEvent::StartTxBa(*addr, tid));
        Ok(())
    }

    fn stop_tx_ba_session(&self, addr: &[u8; 6], tid: u8) -> Result<(), i32> {
        if self.refuse_ba.load(Ordering::SeqCst) {
            return Err(-16);
        }
        self.record(HostEvent::StopTxBa(*addr, tid));
        Ok(())
    }

    fn start_tx_ba_cb(&self, vif_idx: u8, addr: &[u8; 6], tid: u8) {
        self.record(HostEvent::StartTxBaCb(vif_idx, *addr, tid));
    }

    fn stop_tx_ba_cb(&self, vif_idx: u8, addr: &[u8; 6], tid: u8) {
        self.record(HostEvent::StopTxBaCb(vif_idx, *addr, tid));
    }

    fn stop_queues(&self) {
        self.record(HostEvent::StopQueues);
    }
}

/// 手动推进的时钟；`auto_advance` 非零时每次读时钟前进该步长
#[derive(Default)]
pub struct FakeTimer {
    now: AtomicU64,
    step: AtomicU64,
    armed: Mutex<HashMap<TimerId, u64>>,
    cancelled: Mutex<Vec<TimerId>>,
}

impl FakeTimer {
    pub fn set_now(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn set_auto_advance(&self, step_ms: u64) {
        self.step.store(step_ms, Ordering::SeqCst);
    }

    pub fn armed_at(&self, id: TimerId) -> Option<u64> {
        self.armed.lock().get(&id).copied()
    }

    pub fn cancelled(&self) -> Vec<TimerId> {
        self.cancelled.lock().clone()
    }
}

impl TimerOps for FakeTimer {
    fn now_ms(&self) -> u64 {
        let step = self.step.load(Ordering::SeqCst);
        self.now.fetch_add(step, Ordering::SeqCst)
    }

    fn mod_timer(&self, id: TimerId, expires_ms: u64) {
        self.armed.lock().insert(id, expires_ms);
    }

    fn del_timer_sync(&self, id: TimerId) {
        self.armed.lock().remove(&id);
        self.cancelled.lock().push(id);
    }
}

pub type TestPub = EspPub<MockTransport, MockHost, FakeTimer>;

pub fn test_pub(conf: EspConf) -> TestPub {
    EspPub::new(conf, MockTransport::default(), MockHost::default(), FakeTimer::default())
}

pub fn sta_vif(addr: [u8; 6]) -> Vif {
    Vif {
        addr,
        iftype: Nl80211Iftype::Station,
        p2p: false,
    }
}

pub fn ap_vif(addr: [u8; 6]) -> Vif {
    Vif {
        addr,
        iftype: Nl80211Iftype::Ap,
        p2p: false,
    }
}

/// HT 能力的对端站点，地址末字节为 `last`
pub fn test_sta(last: u8, aid: u16) -> Sta {
    Sta {
        addr: [0x02, 0, 0, 0, 0, last],
        aid,
        ht_cap: HtCap {
            ht_supported: true,
            ..Default::default()
        },
    }
}

/// 启用 beacon（间隔 100 TU）的 AP 接口 0，时钟从 0 开始
pub fn ap_up_pub(conf: EspConf) -> TestPub {
    let p = test_pub(conf);
    p.start().unwrap();
    let vif = ap_vif(p.conf().mac_addr);
    p.add_interface(&vif).unwrap();
    let info = BssConf {
        bssid: vif.addr,
        enable_beacon: true,
        beacon_int: 100,
        ..Default::default()
    };
    p.bss_info_changed(&vif, &info, bss_changed::BEACON_ENABLED).unwrap();
    p
}

/// 固定头 + SSID + TIM 的 beacon
pub fn beacon_frame(dtim_count: u8, bitmap_ctrl: u8, pvb: &[u8]) -> Vec<u8> {
    let mut b = vec![0u8; BEACON_FIXED_LEN];
    b[0] = 0x80;
    b.extend_from_slice(&[0, 3, b'e', b's', b'p']);
    b.extend_from_slice(&[5, 3 + pvb.len() as u8, dtim_count, 2, bitmap_ctrl]);
    b.extend_from_slice(pvb);
    b
}

/// AP 发往 `da` 的 QoS data 帧
pub fn qos_data(da: &[u8; 6], seq: u16, tid: u8) -> SkBuff {
    let mut f = vec![0u8; 30];
    f[0..2].copy_from_slice(&0x0288u16.to_le_bytes());
    f[4..10].copy_from_slice(da);
    f[22..24].copy_from_slice(&(seq << 4).to_le_bytes());
    f[24] = tid;
    SkBuff::from_slice(&f)
}
