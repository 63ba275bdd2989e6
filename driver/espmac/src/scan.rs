//! 硬件扫描与 remain-on-channel
//!
//! 扫描命令一次下发给固件，由固件逐信道扫描并以 SIP_EVT_SCAN_DONE 报告结束；
//! 同时启动一个按信道数估算的超时定时器兜底。

use core::sync::atomic::Ordering;

use ieee80211::{Channel, Mac80211Host, ScanRequest, Vif};
use sip::cmd::{freq_to_channel, SIP_SCAN_MAX_CHANNELS, SIP_SSID_MAX_LEN};
use sip::{Roc, Scan, SipCmd, SipEvtRoc, SipTransport};

use crate::epub::{wl_flags, EspPub, ESP_CHANNELS_2GHZ};
use crate::error::{EspError, EspResult};
use crate::timer::{TimerId, TimerOps};

/// 连接状态下两次后台扫描的最小间隔
pub const SCAN_PERMIT_MS: u64 = 900;
/// 每信道的超时估算（HZ / 4）
pub const SCAN_TIMEOUT_PER_CHANNEL_MS: u64 = 250;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanState {
    /// 已下发、尚未完成（wl.scan_req）
    pub pending: bool,
    pub permit_ms: u64,
    pub permit_valid: bool,
}

impl<T: SipTransport, H: Mac80211Host, C: TimerOps> EspPub<T, H, C> {
    pub(crate) fn do_hw_scan(&self, vif: &Vif, req: &ScanRequest) -> EspResult {
        log::debug!(target: "wireless::espmac", "hw_scan vif {:02x?} ssids={} channels={}",
            vif.addr, req.ssids.len(), req.channels.len());
        if self.is_off() {
            log::error!(target: "wireless::espmac", "scan but wl off");
            return Err(EspError::PermissionDenied);
        }
        if req.ssids.len() > 2 || (req.ssids.len() == 2 && !req.ssids[0].is_empty() && !req.ssids[1].is_empty()) {
            log::error!(target: "wireless::espmac", "scan ssid num {} not support", req.ssids.len());
            return Err(EspError::InvalidInput);
        }

        let now = self.timer.now_ms();
        if self.conf.support_bgscan && self.wl_flags() & wl_flags::CONNECT != 0 && !req.channels.is_empty() {
            let mut scan = self.scan.lock();
            let too_often = scan.permit_valid && now < scan.permit_ms;
            scan.permit_valid = true;
            if too_often {
                log::info!(target: "wireless::espmac", "scan too often");
                return Err(EspError::AccessDenied);
            }
        }

        self.scan.lock().pending = true;
        if let Err(e) = self.send_cmd(SipCmd::Scan(build_scan(req))) {
            log::error!(target: "wireless::espmac", "fail to send scan_cmd");
            self.scan.lock().pending = false;
            return Err(e);
        }

        self.scan.lock().permit_ms = now + SCAN_PERMIT_MS;
        self.set_wl_flag(wl_flags::STOP_TXQ);
        if !self.txq_stopped.swap(true, Ordering::AcqRel) {
            self.host.stop_queues();
        }
        let n_channels = if req.channels.is_empty() {
            ESP_CHANNELS_2GHZ.len()
        } else {
            req.channels.len()
        };
        self.timer.mod_timer(
            TimerId::ScanTimeout,
            now + n_channels as u64 * SCAN_TIMEOUT_PER_CHANNEL_MS,
        );
        Ok(())
    }

    /// 固件报告扫描结束（或驱动停止时中止）
    pub fn hw_scan_done(&self, aborted: bool) {
        self.timer.del_timer_sync(TimerId::ScanTimeout);
        self.scan.lock().pending = false;
        self.host.scan_completed(aborted);
        self.restart_txq();
    }

    /// 扫描超时（hw_scan_timeout_report）：仍未完成即视为中止
    pub(crate) fn scan_timeout_report(&self) {
        log::debug!(target: "wireless::espmac", "hw scan timeout");
        self.restart_txq();
        let aborted = core::mem::take(&mut self.scan.lock().pending);
        self.host.scan_completed(aborted);
    }

    fn restart_txq(&self) {
        if self.test_and_clear_wl_flag(wl_flags::STOP_TXQ) {
            self.txq_stopped.store(false, Ordering::Release);
            self.sip.trigger_txq_process();
        }
    }

    pub fn scan_pending(&self) -> bool {
        self.scan.lock().pending
    }

    pub(crate) fn do_remain_on_channel(&self, chan: &Channel, duration: u32) -> EspResult {
        log::debug!(target: "wireless::espmac", "remain_on_channel freq={} duration={}", chan.center_freq, duration);
        self.send_cmd(SipCmd::Roc(Roc {
            center_freq: chan.center_freq as u16,
            duration,
        }))
    }

    pub(crate) fn do_cancel_remain_on_channel(&self) -> EspResult {
        self.roc_flags.store(false, Ordering::Release);
        self.send_cmd(SipCmd::Roc(Roc {
            center_freq: 0,
            duration: 0,
        }))
    }

    /// 固件 ROC 报告（esp_rocdone_process）
    pub(crate) fn rocdone_process(&self, report: &SipEvtRoc) {
        log::debug!(target: "wireless::espmac", "roc report state={} is_ok={}", report.state, report.is_ok);
        match (report.state, report.is_ok) {
            (1, 1) => {
                self.roc_flags.store(true, Ordering::Release);
                self.host.ready_on_channel();
            }
            (0, 1) => {
                self.roc_flags.store(false, Ordering::Release);
                self.host.remain_on_channel_expired();
            }
            _ => {}
        }
    }
}

fn build_scan(req: &ScanRequest) -> Scan {
    let mut cmd = Scan::new();
    if let Some(ssid) = req.ssids.iter().find(|s| !s.is_empty()) {
        let bytes = ssid.as_bytes();
        let len = bytes.len().min(SIP_SSID_MAX_LEN);
        cmd.ssid[..len].copy_from_slice(&bytes[..len]);
        cmd.ssid_len = len as u8;
    }
    let mut n = 0;
    for ch in req.channels.iter().take(SIP_SCAN_MAX_CHANNELS) {
        if let Some(num) = freq_to_channel(ch.center_freq) {
            cmd.channels[n] = num;
            n += 1;
        }
    }
    cmd.n_channels = n as u8;
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EspConf;
    use crate::mock::{sta_vif, test_pub, HostEvent, TestPub};
    use crate::ops::Mac80211Ops;
    use ieee80211::Ssid;

    fn started(conf: EspConf) -> (TestPub, Vif) {
        let p = test_pub(conf);
        p.start().unwrap();
        let vif = sta_vif(p.conf().mac_addr);
        p.add_interface(&vif).unwrap();
        (p, vif)
    }

    fn scans(p: &TestPub) -> Vec<Scan> {
        p.sip()
            .cmds()
            .into_iter()
            .filter_map(|c| match c {
                SipCmd::Scan(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn scan_rejected_when_off_or_bad_ssids() {
        let p = test_pub(EspConf::default());
        let vif = sta_vif(p.conf().mac_addr);
        let req = ScanRequest { channels: &[], ssids: &[] };
        assert_eq!(p.hw_scan(&vif, &req), Err(EspError::PermissionDenied));

        p.start().unwrap();
        let two = [Ssid::new(b"a"), Ssid::new(b"b")];
        let req = ScanRequest { channels: &[], ssids: &two };
        assert_eq!(p.hw_scan(&vif, &req), Err(EspError::InvalidInput));
        let three = [Ssid::new(b""), Ssid::new(b""), Ssid::new(b"")];
        let req = ScanRequest { channels: &[], ssids: &three };
        assert_eq!(p.hw_scan(&vif, &req), Err(EspError::InvalidInput));
        assert!(scans(&p).is_empty());
        assert!(!p.scan_pending());
    }

    #[test]
    fn scan_stops_queues_once_and_arms_timeout() {
        let (p, vif) = started(EspConf::default());
        let ssids = [Ssid::new(b""), Ssid::new(b"espressif")];
        let chans = &ESP_CHANNELS_2GHZ[..3];
        p.hw_scan(&vif, &ScanRequest { channels: chans, ssids: &ssids }).unwrap();
        p.hw_scan(&vif, &ScanRequest { channels: &[], ssids: &[] }).unwrap();

        let s = scans(&p);
        assert_eq!(&s[0].ssid[..s[0].ssid_len as usize], b"espressif");
        assert_eq!(&s[0].channels[..s[0].n_channels as usize], &[1, 2, 3]);
        let stops = p.host().events().iter().filter(|e| **e == HostEvent::StopQueues).count();
        assert_eq!(stops, 1);
        assert_eq!(p.timer().armed_at(TimerId::ScanTimeout), Some(13 * 250));
        assert!(p.scan_pending());

        p.hw_scan_done(false);
        assert!(!p.scan_pending());
        assert_eq!(p.timer().armed_at(TimerId::ScanTimeout), None);
        assert_eq!(p.sip().triggers(), 1);
        assert!(p.host().events().contains(&HostEvent::ScanCompleted(false)));
        // 队列已恢复，下一次扫描会再次停队列
        p.hw_scan(&vif, &ScanRequest { channels: chans, ssids: &[] }).unwrap();
        let stops = p.host().events().iter().filter(|e| **e == HostEvent::StopQueues).count();
        assert_eq!(stops, 2);
    }

    #[test]
    fn background_scan_rate_limited_while_connected() {
        let mut conf = EspConf::default();
        conf.support_bgscan = true;
        let (p, vif) = started(conf);
        p.set_wl_flag(wl_flags::CONNECT);
        let req = ScanRequest { channels: &ESP_CHANNELS_2GHZ[..1], ssids: &[] };
        p.hw_scan(&vif, &req).unwrap();
        p.hw_scan_done(false);

        p.timer().set_now(500);
        assert_eq!(p.hw_scan(&vif, &req), Err(EspError::AccessDenied));
        p.timer().set_now(900);
        p.hw_scan(&vif, &req).unwrap();
        assert_eq!(scans(&p).len(), 2);
    }

    #[test]
    fn timeout_reports_pending_scan_as_aborted() {
        let (p, vif) = started(EspConf::default());
        p.hw_scan(&vif, &ScanRequest { channels: &[], ssids: &[] }).unwrap();
        p.timer_expired(TimerId::ScanTimeout);
        assert!(!p.scan_pending());
        assert_eq!(p.sip().triggers(), 1);
        p.timer_expired(TimerId::ScanTimeout);
        let done: Vec<_> = p
            .host()
            .events()
            .into_iter()
            .filter(|e| matches!(e, HostEvent::ScanCompleted(_)))
            .collect();
        assert_eq!(done, vec![HostEvent::ScanCompleted(true), HostEvent::ScanCompleted(false)]);
    }

    #[test]
    fn failed_scan_cmd_leaves_nothing_pending() {
        let (p, vif) = started(EspConf::default());
        p.sip().set_fail(true);
        assert!(matches!(
            p.hw_scan(&vif, &ScanRequest { channels: &[], ssids: &[] }),
            Err(EspError::Transport(_))
        ));
        assert!(!p.scan_pending());
        assert_eq!(p.timer().armed_at(TimerId::ScanTimeout), None);
        assert_eq!(p.wl_flags() & wl_flags::STOP_TXQ, 0);
    }

    #[test]
    fn roc_reports_toggle_flag() {
        let (p, _) = started(EspConf::default());
        p.remain_on_channel(&ESP_CHANNELS_2GHZ[5], 200).unwrap();
        p.rocdone_process(&SipEvtRoc { state: 1, is_ok: 1 });
        assert!(p.is_roc());
        p.rocdone_process(&SipEvtRoc { state: 0, is_ok: 0 });
        assert!(p.is_roc());
        p.rocdone_process(&SipEvtRoc { state: 0, is_ok: 1 });
        assert!(!p.is_roc());
        p.rocdone_process(&SipEvtRoc { state: 1, is_ok: 1 });
        p.cancel_remain_on_channel().unwrap();
        assert!(!p.is_roc());

        let rocs: Vec<Roc> = p
            .sip()
            .cmds()
            .into_iter()
            .filter_map(|c| match c {
                SipCmd::Roc(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(rocs, vec![Roc { center_freq: 2437, duration: 200 }, Roc { center_freq: 0, duration: 0 }]);
        let ev = p.host().events();
        assert_eq!(ev.iter().filter(|e| **e == HostEvent::ReadyOnChannel).count(), 2);
        assert_eq!(ev.iter().filter(|e| **e == HostEvent::RocExpired).count(), 1);
    }
}
