//! 驱动操作表 - 对应 struct ieee80211_ops
//!
//! 协议栈通过 [Mac80211Ops] 调用驱动。所有方法取 `&self`：发送路径、控制路径、
//! 定时器可能在不同上下文并发进入，状态由 [EspPub] 内部的锁保护。
//! 错误以 [EspError] 返回，需要 errno 的上层用 [EspError::errno] 转换。

use core::sync::atomic::Ordering;

use ieee80211::mac80211::{conf_changed, conf_flags, filter_flags};
use ieee80211::{
    AmpduParams, BssConf, Channel, Conf, KeyConf, Mac80211Host, Nl80211Iftype, ScanRequest, SetKeyCmd, Sta,
    TxqParams, Vif,
};
use sip::cmd::set_op;
use sip::{Config, SetSta, SipCmd, SipTransport, WmmParams};
use skb::SkBuff;

use crate::epub::{wl_flags, EspPub};
use crate::error::EspResult;
use crate::timer::TimerOps;

/// flush 等待发送队列清空的上限
pub const FLUSH_TIMEOUT_MS: u64 = 15;

pub trait Mac80211Ops {
    fn start(&self) -> EspResult;
    fn stop(&self);
    fn tx(&self, sta: Option<&Sta>, skb: SkBuff);
    fn add_interface(&self, vif: &Vif) -> EspResult;
    fn change_interface(&self, vif: &Vif, new_type: Nl80211Iftype, p2p: bool) -> EspResult;
    fn remove_interface(&self, vif: &Vif);
    /// `conf` 为协议栈当前的硬件配置，`changed` 为 IEEE80211_CONF_CHANGE_* 位
    fn config(&self, conf: &Conf, changed: u32) -> EspResult;
    fn bss_info_changed(&self, vif: &Vif, info: &BssConf, changed: u32) -> EspResult;
    /// 只保留驱动支持的过滤位，写回 `total_flags`
    fn configure_filter(&self, changed_flags: u32, total_flags: &mut u32);
    fn set_key(&self, cmd: SetKeyCmd, vif: &Vif, sta: Option<&Sta>, key: &mut KeyConf) -> EspResult;
    fn set_rts_threshold(&self, value: u32) -> EspResult;
    fn sta_add(&self, vif: &Vif, sta: &Sta) -> EspResult;
    fn sta_remove(&self, vif: &Vif, sta: &Sta) -> EspResult;
    fn conf_tx(&self, vif: &Vif, queue: u16, params: &TxqParams) -> EspResult;
    fn hw_scan(&self, vif: &Vif, req: &ScanRequest) -> EspResult;
    fn remain_on_channel(&self, chan: &Channel, duration: u32) -> EspResult;
    fn cancel_remain_on_channel(&self) -> EspResult;
    /// TX_START 时把起始序列号写回 `params.ssn`
    fn ampdu_action(&self, vif: &Vif, params: &mut AmpduParams) -> EspResult;
    fn flush(&self, drop: bool);
    /// 无线是否被硬件开关关闭
    fn rfkill_poll(&self) -> bool;
}

/// CW（2^n - 1）→ ECW 指数
fn cw_to_ecw(cw: u16) -> u8 {
    (u16::BITS - cw.leading_zeros()) as u8
}

impl<T: SipTransport, H: Mac80211Host, C: TimerOps> Mac80211Ops for EspPub<T, H, C> {
    fn start(&self) -> EspResult {
        log::info!(target: "wireless::espmac", "start");
        self.wl_off.store(false, Ordering::Release);
        Ok(())
    }

    fn stop(&self) {
        log::info!(target: "wireless::espmac", "stop");
        self.wl_off.store(true, Ordering::Release);
        if self.scan_pending() {
            self.hw_scan_done(true);
        }
    }

    fn tx(&self, sta: Option<&Sta>, skb: SkBuff) {
        self.do_tx(sta, skb);
    }

    fn add_interface(&self, vif: &Vif) -> EspResult {
        self.do_add_interface(vif)
    }

    fn change_interface(&self, vif: &Vif, new_type: Nl80211Iftype, p2p: bool) -> EspResult {
        self.do_change_interface(vif, new_type, p2p)
    }

    fn remove_interface(&self, vif: &Vif) {
        self.do_remove_interface(vif)
    }

    fn config(&self, conf: &Conf, changed: u32) -> EspResult {
        log::trace!(target: "wireless::espmac", "config changed={:#x}", changed);
        *self.hw_conf.lock() = Some(*conf);
        if changed & (conf_changed::CHANNEL | conf_changed::IDLE) == 0 {
            return Ok(());
        }
        self.send_cmd(SipCmd::Config(Config {
            center_freq: conf.chandef.channel.center_freq as u16,
            chan_type: conf.chandef.chan_type as u8,
            idle: (conf.flags & conf_flags::IDLE != 0) as u8,
        }))
    }

    fn bss_info_changed(&self, vif: &Vif, info: &BssConf, changed: u32) -> EspResult {
        self.do_bss_info_changed(vif, info, changed)
    }

    fn configure_filter(&self, _changed_flags: u32, total_flags: &mut u32) {
        let filter = *total_flags & filter_flags::ALLMULTI;
        self.rx_filter.store(filter, Ordering::Release);
        *total_flags = filter;
    }

    fn set_key(&self, cmd: SetKeyCmd, vif: &Vif, sta: Option<&Sta>, key: &mut KeyConf) -> EspResult {
        self.do_set_key(cmd, vif, sta, key)
    }

    fn set_rts_threshold(&self, value: u32) -> EspResult {
        log::trace!(target: "wireless::espmac", "set_rts_threshold {}", value);
        Ok(())
    }

    fn sta_add(&self, vif: &Vif, sta: &Sta) -> EspResult {
        let ifidx = self.vif_index(vif)?;
        log::debug!(target: "wireless::espmac", "sta_add vif {} sta {:02x?} aid {}", ifidx, sta.addr, sta.aid);
        let index = self.nodes.lock().attach(ifidx, sta).map_err(|e| {
            log::warn!(target: "wireless::espmac", "sta_add {:02x?} failed: {}", sta.addr, e);
            e
        })?;
        let cmd = SipCmd::SetSta(SetSta {
            ifidx,
            index,
            set: set_op::ADD,
            phymode: sta.ht_cap.ht_supported as u8,
            mac: sta.addr,
            aid: sta.aid,
            ampdu_factor: sta.ht_cap.ampdu_factor,
            ampdu_density: sta.ht_cap.ampdu_density,
        });
        if let Err(e) = self.send_cmd(cmd) {
            let _ = self.nodes.lock().detach(ifidx, &sta.addr);
            return Err(e);
        }
        Ok(())
    }

    fn sta_remove(&self, vif: &Vif, sta: &Sta) -> EspResult {
        let ifidx = self.vif_index(vif)?;
        log::debug!(target: "wireless::espmac", "sta_remove vif {} sta {:02x?}", ifidx, sta.addr);
        let Ok(index) = self.nodes.lock().detach(ifidx, &sta.addr) else {
            log::debug!(target: "wireless::espmac", "sta_remove {:02x?} not attached", sta.addr);
            return Ok(());
        };
        let released = self.rx_ampdu.lock().release_station(&sta.addr);
        if released > 0 {
            log::debug!(target: "wireless::espmac", "released {} rx ampdu sessions", released);
        }
        self.send_cmd(SipCmd::SetSta(SetSta {
            ifidx,
            index,
            set: set_op::REMOVE,
            mac: sta.addr,
            aid: sta.aid,
            ..Default::default()
        }))
    }

    fn conf_tx(&self, _vif: &Vif, queue: u16, params: &TxqParams) -> EspResult {
        self.send_cmd(SipCmd::WmmParams(WmmParams {
            aci: queue as u8,
            aifs: params.aifs,
            ecw_min: cw_to_ecw(params.cw_min),
            ecw_max: cw_to_ecw(params.cw_max),
            txop_us: params.txop.saturating_mul(32),
        }))
    }

    fn hw_scan(&self, vif: &Vif, req: &ScanRequest) -> EspResult {
        self.do_hw_scan(vif, req)
    }

    fn remain_on_channel(&self, chan: &Channel, duration: u32) -> EspResult {
        self.do_remain_on_channel(chan, duration)
    }

    fn cancel_remain_on_channel(&self) -> EspResult {
        self.do_cancel_remain_on_channel()
    }

    fn ampdu_action(&self, vif: &Vif, params: &mut AmpduParams) -> EspResult {
        self.do_ampdu_action(vif, params)
    }

    fn flush(&self, drop: bool) {
        log::debug!(target: "wireless::espmac", "flush drop={}", drop);
        let deadline = self.timer.now_ms() + FLUSH_TIMEOUT_MS;
        while self.sip.tx_data_pkt_queued() > 0 {
            if self.timer.now_ms() >= deadline {
                log::warn!(target: "wireless::espmac", "flush timeout, {} pkts queued", self.sip.tx_data_pkt_queued());
                break;
            }
            self.sip.trigger_txq_process();
        }
    }

    fn rfkill_poll(&self) -> bool {
        self.wl_flags() & wl_flags::RFKILL != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EspConf;
    use crate::error::EspError;
    use crate::mock::{ap_vif, sta_vif, test_pub, test_sta, TestPub};
    use crate::node::NODE_TABLE_CAPACITY;
    use alloc::sync::Arc;
    use ieee80211::cfg80211::{ChanDef, ChannelType};
    use std::thread;

    use crate::epub::ESP_CHANNELS_2GHZ;

    fn setstas(p: &TestPub) -> Vec<SetSta> {
        p.sip()
            .cmds()
            .into_iter()
            .filter_map(|c| match c {
                SipCmd::SetSta(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn start_stop_toggles_off() {
        let p = test_pub(EspConf::default());
        assert!(p.is_off());
        p.start().unwrap();
        assert!(!p.is_off());
        p.stop();
        assert!(p.is_off());
    }

    #[test]
    fn rfkill_reported_after_unregister() {
        let p = test_pub(EspConf::default());
        p.register();
        assert!(!p.rfkill_poll());
        p.unregister();
        assert!(p.rfkill_poll());
    }

    #[test]
    fn config_forwards_channel_and_records_type() {
        let p = test_pub(EspConf::default());
        let conf = Conf {
            chandef: ChanDef {
                channel: ESP_CHANNELS_2GHZ[10],
                chan_type: ChannelType::Ht40Minus,
            },
            flags: conf_flags::IDLE,
        };
        p.config(&conf, conf_changed::PS).unwrap();
        assert!(p.sip().cmds().is_empty());
        assert_eq!(p.chan_type(), ChannelType::Ht40Minus);
        p.config(&conf, conf_changed::CHANNEL).unwrap();
        assert_eq!(
            p.sip().cmds(),
            vec![SipCmd::Config(Config {
                center_freq: 2462,
                chan_type: 2,
                idle: 1
            })]
        );
    }

    #[test]
    fn filter_keeps_only_allmulti() {
        let p = test_pub(EspConf::default());
        let mut total = filter_flags::ALLMULTI | filter_flags::OTHER_BSS | filter_flags::CONTROL;
        p.configure_filter(0, &mut total);
        assert_eq!(total, filter_flags::ALLMULTI);
        let mut total = filter_flags::PROMISC_IN_BSS;
        p.configure_filter(0, &mut total);
        assert_eq!(total, 0);
    }

    #[test]
    fn sta_add_remove_commands() {
        let p = test_pub(EspConf::default());
        let vif = ap_vif(p.conf().mac_addr);
        p.add_interface(&vif).unwrap();
        let a = test_sta(1, 1);
        let b = test_sta(2, 2);
        p.sta_add(&vif, &a).unwrap();
        p.sta_add(&vif, &b).unwrap();
        assert_eq!(p.sta_add(&vif, &a), Err(EspError::AlreadyExists));
        p.sta_remove(&vif, &a).unwrap();
        // 不存在的站点：不下发命令
        p.sta_remove(&vif, &a).unwrap();

        let cmds = setstas(&p);
        assert_eq!(cmds.len(), 3);
        assert_eq!((cmds[0].set, cmds[0].index, cmds[0].phymode), (1, 0, 1));
        assert_eq!((cmds[1].set, cmds[1].index), (1, 1));
        assert_eq!((cmds[2].set, cmds[2].index, cmds[2].mac), (0, 0, a.addr));

        // 未知接口
        assert_eq!(p.sta_add(&sta_vif([7; 6]), &a), Err(EspError::NotFound));
    }

    #[test]
    fn sta_add_rolls_back_on_transport_failure() {
        let p = test_pub(EspConf::default());
        let vif = ap_vif(p.conf().mac_addr);
        p.add_interface(&vif).unwrap();
        p.sip().set_fail(true);
        assert!(p.sta_add(&vif, &test_sta(1, 1)).is_err());
        assert_eq!(p.nodes.lock().occupied(), 0);
    }

    #[test]
    fn per_vif_limit_through_sta_add() {
        let p = test_pub(EspConf::default());
        let vif = ap_vif(p.conf().mac_addr);
        p.add_interface(&vif).unwrap();
        for i in 0..4 {
            p.sta_add(&vif, &test_sta(i, i as u16)).unwrap();
        }
        let before = p.nodes.lock().occupied();
        let err = p.sta_add(&vif, &test_sta(9, 9)).unwrap_err();
        assert_eq!(err, EspError::CapacityExceeded);
        assert_eq!(i32::from(err), -28);
        assert_eq!(p.nodes.lock().occupied(), before);
        assert_eq!(setstas(&p).len(), 4);
    }

    #[test]
    fn conf_tx_converts_cw_and_txop() {
        let p = test_pub(EspConf::default());
        let vif = sta_vif(p.conf().mac_addr);
        let params = TxqParams {
            txop: 94,
            cw_min: 7,
            cw_max: 15,
            aifs: 2,
        };
        p.conf_tx(&vif, 1, &params).unwrap();
        assert_eq!(
            p.sip().cmds(),
            vec![SipCmd::WmmParams(WmmParams {
                aci: 1,
                aifs: 2,
                ecw_min: 3,
                ecw_max: 4,
                txop_us: 3008
            })]
        );
        assert_eq!(cw_to_ecw(1023), 10);
        assert_eq!(cw_to_ecw(0), 0);
    }

    #[test]
    fn flush_drains_or_times_out() {
        let p = test_pub(EspConf::default());
        p.sip().set_queued(5);
        p.flush(false);
        assert_eq!(p.sip().triggers(), 1);

        p.sip().set_queued(5);
        p.sip().set_stuck(true);
        p.timer().set_auto_advance(1);
        p.flush(true);
        assert_eq!(p.sip().triggers(), 1 + FLUSH_TIMEOUT_MS as usize - 1);
    }

    #[test]
    fn concurrent_attach_detach_keeps_table_consistent() {
        let mut conf = EspConf::default();
        conf.max_sta_per_vif = NODE_TABLE_CAPACITY;
        let p = Arc::new(test_pub(conf));
        let vif = ap_vif(p.conf().mac_addr);
        p.add_interface(&vif).unwrap();

        let workers: Vec<_> = (0..4u8)
            .map(|t| {
                let p = Arc::clone(&p);
                thread::spawn(move || {
                    for round in 0..200u16 {
                        let sta = test_sta(t * 2 + (round % 2) as u8, t as u16);
                        if p.sta_add(&vif, &sta).is_ok() {
                            let nodes = p.nodes.lock();
                            let node = nodes.get_by_addr(&sta.addr).unwrap();
                            assert_eq!(nodes.occupied() & (1 << node.index), 1 << node.index);
                            drop(nodes);
                            p.sta_remove(&vif, &sta).unwrap();
                        }
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(p.nodes.lock().occupied(), 0);
        let adds = setstas(&p).iter().filter(|s| s.set == 1).count();
        let removes = setstas(&p).iter().filter(|s| s.set == 0).count();
        assert_eq!(adds, removes);
    }
}
