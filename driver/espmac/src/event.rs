//! 固件事件分发
//!
//! 传输层收到 SIP 事件后调用 [EspPub::handle_sip_event]；只处理驱动核心关心的事件，
//! 其余事件（credit、tx status 等）由传输层自行消费。

use ieee80211::Mac80211Host;
use sip::evt::{parse_evt_roc, parse_evt_scan_done};
use sip::{SipTransport, SIP_EVT_ROC, SIP_EVT_SCAN_DONE};

use crate::epub::EspPub;
use crate::error::{EspError, EspResult};
use crate::timer::TimerOps;

impl<T: SipTransport, H: Mac80211Host, C: TimerOps> EspPub<T, H, C> {
    pub fn handle_sip_event(&self, id: u8, param: &[u8]) -> EspResult {
        match id {
            SIP_EVT_ROC => {
                let report = parse_evt_roc(param).ok_or(EspError::InvalidInput)?;
                self.rocdone_process(&report);
            }
            SIP_EVT_SCAN_DONE => {
                let report = parse_evt_scan_done(param).ok_or(EspError::InvalidInput)?;
                if self.scan_pending() {
                    self.hw_scan_done(report.aborted);
                } else {
                    log::debug!(target: "wireless::espmac", "scan done {} without pending scan", report.scan_id);
                }
            }
            other => {
                log::debug!(target: "wireless::espmac", "ignore sip event {}", other);
            }
        }
        Ok(())
    }
}
