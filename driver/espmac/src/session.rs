//! 发送路径上的 AMPDU 触发与 ampdu_action 的处理
//!
//! 状态迁移本身在 [crate::ampdu::TxTid]；这里负责取锁、能力门限、向固件下发
//! AMPDU_ACTION 以及回调协议栈。所有协作者调用都在站表锁释放之后进行。

use ieee80211::ieee80211::{frame_control, is_data_qos, qos_tid, seq_num};
use ieee80211::{AmpduAction, AmpduParams, Mac80211Host, Sta, Vif, WME_NUM_TID};
use sip::cmd::{
    SIP_AMPDU_RX_START, SIP_AMPDU_RX_STOP, SIP_AMPDU_TX_OPERATIONAL, SIP_AMPDU_TX_STOP, SIP_RX_AMPDU_WIN_SIZE,
};
use sip::{AmpduActionCmd, SipCmd, SipTransport};
use skb::{tx_flags, SkBuff};

use crate::epub::EspPub;
use crate::error::{EspError, EspResult};
use crate::node::{EspNode, NodeTable};
use crate::timer::TimerOps;

impl<T: SipTransport, H: Mac80211Host, C: TimerOps> EspPub<T, H, C> {
    /// 发送路径（esp_op_tx）：记录 QoS 帧序列号，必要时触发 BA 协商，然后入队
    pub(crate) fn do_tx(&self, sta: Option<&Sta>, skb: SkBuff) {
        if !self.conf.no_txampdu && self.chan_type().is_ht() {
            if let Some(sta) = sta {
                self.observe_tx_frame(sta, &skb);
            }
        }
        self.sip.tx_data_pkt_enqueue(skb);
    }

    fn observe_tx_frame(&self, sta: &Sta, skb: &SkBuff) {
        if !is_data_qos(frame_control(skb)) {
            return;
        }
        if skb.cb.flags & tx_flags::AMPDU != 0 {
            log::trace!(target: "wireless::espmac", "tx ampdu pkt, sn {:?} len {}", seq_num(skb), skb.len());
            return;
        }
        if !sta.ht_cap.ht_supported {
            return;
        }
        let (Some(tid), Some(seq)) = (qos_tid(skb), seq_num(skb)) else {
            return;
        };
        if tid as usize >= WME_NUM_TID {
            return;
        }

        let vif_idx = skb.cb.vif_idx;
        let triggered = {
            let mut nodes = self.nodes.lock();
            match Self::tx_node(&mut nodes, vif_idx, &sta.addr) {
                Ok(node) => node.tid[tid as usize].observe_tx(seq, self.conf.ampdu_trigger_cnt),
                Err(_) => false,
            }
        };
        if !triggered {
            return;
        }
        log::debug!(target: "wireless::espmac", "ampdu trigger {:02x?} tid {}", sta.addr, tid);
        if let Err(e) = self.host.start_tx_ba_session(&sta.addr, tid) {
            log::warn!(target: "wireless::espmac", "start_tx_ba_session refused: {}", e);
            if let Ok(node) = Self::tx_node(&mut self.nodes.lock(), vif_idx, &sta.addr) {
                node.tid[tid as usize].cancel_trigger();
            }
        }
    }

    /// 帧带有接口下标时只在该接口上查找站点
    fn tx_node<'a>(nodes: &'a mut NodeTable, vif_idx: Option<u8>, addr: &[u8; 6]) -> EspResult<&'a mut EspNode> {
        match vif_idx {
            Some(ifidx) => nodes.get_on_vif_mut(ifidx, addr),
            None => nodes.get_by_addr_mut(addr),
        }
    }

    fn ampdu_gate(&self, disabled: bool, sta: &Sta) -> EspResult {
        if disabled || !self.chan_type().is_ht() || !sta.ht_cap.ht_supported {
            return Err(EspError::NotSupported);
        }
        Ok(())
    }

    pub(crate) fn do_ampdu_action(&self, vif: &Vif, params: &mut AmpduParams) -> EspResult {
        let tid = params.tid as u8;
        if params.tid as usize >= WME_NUM_TID {
            return Err(EspError::InvalidInput);
        }
        let addr = params.sta.addr;
        log::debug!(target: "wireless::espmac", "ampdu_action {:?} {:02x?} tid {}", params.action, addr, tid);

        match params.action {
            AmpduAction::TxStart => {
                self.ampdu_gate(self.conf.no_txampdu, &params.sta)?;
                let (ssn, ifidx) = {
                    let mut nodes = self.nodes.lock();
                    let node = nodes.get_by_addr_mut(&addr)?;
                    (node.tid[tid as usize].start(tid)?, node.ifidx)
                };
                params.ssn = ssn;
                self.host.start_tx_ba_cb(ifidx, &addr, tid);
                Ok(())
            }
            AmpduAction::TxStopCont | AmpduAction::TxStopFlush | AmpduAction::TxStopFlushCont => {
                let ifidx = {
                    let mut nodes = self.nodes.lock();
                    let node = nodes.get_by_addr_mut(&addr)?;
                    node.tid[tid as usize].stop();
                    node.ifidx
                };
                if params.action == AmpduAction::TxStopCont {
                    self.host.stop_tx_ba_cb(ifidx, &addr, tid);
                }
                self.send_ampdu_action(SIP_AMPDU_TX_STOP, ifidx, &addr, tid, 0, 0)
            }
            AmpduAction::TxOperational => {
                let ifidx = {
                    let mut nodes = self.nodes.lock();
                    let node = nodes.get_by_addr_mut(&addr)?;
                    node.tid[tid as usize].operational(tid)?;
                    node.ifidx
                };
                self.send_ampdu_action(SIP_AMPDU_TX_OPERATIONAL, ifidx, &addr, tid, 0, params.buf_size)
            }
            AmpduAction::RxStart => {
                self.ampdu_gate(self.conf.no_rxampdu, &params.sta)?;
                let ifidx = self.vif_index(vif)?;
                let slot = self.rx_ampdu.lock().acquire(&addr, tid).map_err(|e| {
                    log::warn!(target: "wireless::espmac", "no free rx ampdu slot for {:02x?} tid {}", addr, tid);
                    e
                })?;
                let ret = self.send_ampdu_action(SIP_AMPDU_RX_START, ifidx, &addr, tid, params.ssn, SIP_RX_AMPDU_WIN_SIZE);
                if ret.is_err() {
                    let _ = self.rx_ampdu.lock().release(slot);
                }
                ret
            }
            AmpduAction::RxStop => {
                {
                    let mut rx = self.rx_ampdu.lock();
                    match rx.find(&addr, tid) {
                        Ok(slot) => {
                            let _ = rx.release(slot);
                        }
                        Err(_) => {
                            log::debug!(target: "wireless::espmac", "rx stop without session {:02x?} tid {}", addr, tid);
                        }
                    }
                }
                let ifidx = self.vif_index(vif).unwrap_or(0);
                self.send_ampdu_action(SIP_AMPDU_RX_STOP, ifidx, &addr, tid, 0, 0)
            }
        }
    }

    /// 驱动主动结束一个 TX BA 会话；返回是否发出了停止请求
    pub fn request_tx_stop(&self, addr: &[u8; 6], tid: u8) -> EspResult<bool> {
        if tid as usize >= WME_NUM_TID {
            return Err(EspError::InvalidInput);
        }
        let prev = {
            let mut nodes = self.nodes.lock();
            let session = &mut nodes.get_by_addr_mut(addr)?.tid[tid as usize];
            let prev = session.state;
            if !session.request_stop() {
                return Ok(false);
            }
            prev
        };
        if let Err(e) = self.host.stop_tx_ba_session(addr, tid) {
            log::warn!(target: "wireless::espmac", "stop_tx_ba_session refused: {}", e);
            if let Ok(node) = self.nodes.lock().get_by_addr_mut(addr) {
                node.tid[tid as usize].state = prev;
            }
            return Err(EspError::Busy);
        }
        Ok(true)
    }

    fn send_ampdu_action(&self, action_num: u8, index: u8, addr: &[u8; 6], tid: u8, ssn: u16, win_size: u8) -> EspResult {
        self.send_cmd(SipCmd::AmpduAction(AmpduActionCmd {
            action_num,
            index,
            tid,
            win_size,
            ssn,
            addr: *addr,
        }))
    }
}
