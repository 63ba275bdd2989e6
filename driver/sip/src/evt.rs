//! SIP 事件（固件 → 主机）
//! 对应 esp_sip.h 中 SIP_EVT_* 与 struct sip_evt_*，只解析驱动核心消费的两类。

/// 事件 ID（SIP_EVT_*）
pub const SIP_EVT_TARGET_ON: u8 = 0;
pub const SIP_EVT_BOOTUP: u8 = 1;
/// 扫描结束报告（SIP_EVT_SCAN_RESULT）
pub const SIP_EVT_SCAN_DONE: u8 = 3;
pub const SIP_EVT_TX_STATUS: u8 = 4;
pub const SIP_EVT_CREDIT_RPT: u8 = 5;
pub const SIP_EVT_ERROR: u8 = 6;
pub const SIP_EVT_ROC: u8 = 10;

/// sip_evt_roc：state 1 = 已驻留，0 = 驻留结束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SipEvtRoc {
    pub state: u16,
    pub is_ok: u16,
}

/// sip_evt_scan_report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SipEvtScanDone {
    pub scan_id: u16,
    pub aborted: bool,
}

fn le16(param: &[u8], off: usize) -> Option<u16> {
    let b = param.get(off..off + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

pub fn parse_evt_roc(param: &[u8]) -> Option<SipEvtRoc> {
    let ev = SipEvtRoc {
        state: le16(param, 0)?,
        is_ok: le16(param, 2)?,
    };
    log::trace!(target: "wireless::sip", "evt roc state={} is_ok={}", ev.state, ev.is_ok);
    Some(ev)
}

pub fn parse_evt_scan_done(param: &[u8]) -> Option<SipEvtScanDone> {
    Some(SipEvtScanDone {
        scan_id: le16(param, 0)?,
        aborted: le16(param, 2)? != 0,
    })
}
