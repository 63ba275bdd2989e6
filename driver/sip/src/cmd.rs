//! SIP 命令
//! 对应 esp_sip.h 中 SIP_CMD_* 与 struct sip_cmd_*：
//! 每个命令一个结构体，[SipCmd] 统一承载，`serialize` 输出小端字节流交给传输层。

/// 命令 ID（SIP_CMD_*）
pub const SIP_CMD_GET_VER: u8 = 0;
pub const SIP_CMD_INIT: u8 = 7;
pub const SIP_CMD_SCAN: u8 = 8;
pub const SIP_CMD_SETKEY: u8 = 9;
pub const SIP_CMD_CONFIG: u8 = 10;
pub const SIP_CMD_BSS_INFO_UPDATE: u8 = 11;
pub const SIP_CMD_SET_WMM_PARAM: u8 = 13;
pub const SIP_CMD_AMPDU_ACTION: u8 = 14;
pub const SIP_CMD_SETVIF: u8 = 22;
pub const SIP_CMD_SETSTA: u8 = 23;
pub const SIP_CMD_ROC: u8 = 28;

/// AMPDU_ACTION 的动作号（SIP_AMPDU_*）
pub const SIP_AMPDU_RX_START: u8 = 0;
pub const SIP_AMPDU_RX_STOP: u8 = 1;
pub const SIP_AMPDU_TX_OPERATIONAL: u8 = 2;
pub const SIP_AMPDU_TX_STOP: u8 = 3;

/// RX 重排窗口（RX_START 固定 64）
pub const SIP_RX_AMPDU_WIN_SIZE: u8 = 64;

/// SETVIF / SETSTA 的 set 字段
pub mod set_op {
    pub const REMOVE: u8 = 0;
    pub const ADD: u8 = 1;
    pub const CHANGE: u8 = 2;
}

/// 固件密钥算法（ALG_*）
pub mod key_alg {
    pub const NONE: u8 = 0;
    pub const WEP: u8 = 1;
    pub const TKIP: u8 = 2;
    pub const CCMP: u8 = 3;
    pub const AES_CMAC: u8 = 4;
}

/// 扫描命令中 SSID 最大长度
pub const SIP_SSID_MAX_LEN: usize = 32;
/// 单条扫描命令携带的最大信道数（2.4G 13 信道）
pub const SIP_SCAN_MAX_CHANNELS: usize = 14;

/// sip_cmd_setvif
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetVif {
    pub index: u8,
    pub mac: [u8; 6],
    pub set: u8,
    /// 0 = STA, 1 = AP
    pub op_mode: u8,
    pub is_p2p: u8,
}

/// sip_cmd_setsta
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetSta {
    pub ifidx: u8,
    pub index: u8,
    pub set: u8,
    pub phymode: u8,
    pub mac: [u8; 6],
    pub aid: u16,
    pub ampdu_factor: u8,
    pub ampdu_density: u8,
}

/// sip_cmd_ampdu_action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmpduActionCmd {
    pub action_num: u8,
    pub index: u8,
    pub tid: u8,
    pub win_size: u8,
    pub ssn: u16,
    pub addr: [u8; 6],
}

/// sip_cmd_setkey
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetKey {
    pub bssid_no: u8,
    pub addr: [u8; 6],
    pub alg: u8,
    pub keyidx: u8,
    pub hw_key_idx: u8,
    pub flags: u8,
    pub keylen: u8,
    pub key: [u8; 32],
}

/// sip_cmd_scan；`n_channels == 0` 表示全信道
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scan {
    pub aborted: u8,
    pub ssid_len: u8,
    pub ssid: [u8; SIP_SSID_MAX_LEN],
    pub n_channels: u8,
    /// 信道号（1..14）
    pub channels: [u8; SIP_SCAN_MAX_CHANNELS],
}

/// sip_cmd_config
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    pub center_freq: u16,
    pub chan_type: u8,
    pub idle: u8,
}

/// sip_cmd_bss_info_update；`isassoc` 为 0/1（STA）或 2（AP 启停）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BssInfoUpdate {
    pub bssid: [u8; 6],
    pub isassoc: u16,
    pub beacon_int: u32,
    pub bssid_no: u8,
}

/// sip_cmd_set_wmm_params
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WmmParams {
    pub aci: u8,
    pub aifs: u8,
    pub ecw_min: u8,
    pub ecw_max: u8,
    pub txop_us: u16,
}

/// remain-on-channel；`center_freq == 0 && duration == 0` 表示取消
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Roc {
    pub center_freq: u16,
    pub duration: u32,
}

/// 主机下发给固件的命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SipCmd {
    SetVif(SetVif),
    SetSta(SetSta),
    AmpduAction(AmpduActionCmd),
    SetKey(SetKey),
    Scan(Scan),
    Config(Config),
    BssInfoUpdate(BssInfoUpdate),
    WmmParams(WmmParams),
    Roc(Roc),
}

/// 命令头：[cmd_id u8][pad u8][param_len u16]
pub const SIP_CMD_HDR_LEN: usize = 4;

impl SipCmd {
    pub fn id(&self) -> u8 {
        match self {
            SipCmd::SetVif(_) => SIP_CMD_SETVIF,
            SipCmd::SetSta(_) => SIP_CMD_SETSTA,
            SipCmd::AmpduAction(_) => SIP_CMD_AMPDU_ACTION,
            SipCmd::SetKey(_) => SIP_CMD_SETKEY,
            SipCmd::Scan(_) => SIP_CMD_SCAN,
            SipCmd::Config(_) => SIP_CMD_CONFIG,
            SipCmd::BssInfoUpdate(_) => SIP_CMD_BSS_INFO_UPDATE,
            SipCmd::WmmParams(_) => SIP_CMD_SET_WMM_PARAM,
            SipCmd::Roc(_) => SIP_CMD_ROC,
        }
    }

    /// 序列化到 buf: [header 4 bytes][param]，返回总长度；buf 不足返回 None
    pub fn serialize(&self, buf: &mut [u8]) -> Option<usize> {
        let mut w = Writer::new(buf, SIP_CMD_HDR_LEN);
        match self {
            SipCmd::SetVif(c) => {
                w.u8(c.index)?;
                w.bytes(&c.mac)?;
                w.u8(c.set)?;
                w.u8(c.op_mode)?;
                w.u8(c.is_p2p)?;
            }
            SipCmd::SetSta(c) => {
                w.u8(c.ifidx)?;
                w.u8(c.index)?;
                w.u8(c.set)?;
                w.u8(c.phymode)?;
                w.bytes(&c.mac)?;
                w.u16(c.aid)?;
                w.u8(c.ampdu_factor)?;
                w.u8(c.ampdu_density)?;
            }
            SipCmd::AmpduAction(c) => {
                w.u8(c.action_num)?;
                w.u8(c.index)?;
                w.u8(c.tid)?;
                w.u8(c.win_size)?;
                w.u16(c.ssn)?;
                w.bytes(&c.addr)?;
            }
            SipCmd::SetKey(c) => {
                w.u8(c.bssid_no)?;
                w.bytes(&c.addr)?;
                w.u8(c.alg)?;
                w.u8(c.keyidx)?;
                w.u8(c.hw_key_idx)?;
                w.u8(c.flags)?;
                w.u8(c.keylen)?;
                w.bytes(&c.key)?;
            }
            SipCmd::Scan(c) => {
                w.u8(c.aborted)?;
                w.u8(c.ssid_len)?;
                w.bytes(&c.ssid)?;
                w.u8(c.n_channels)?;
                w.bytes(&c.channels[..c.n_channels as usize])?;
            }
            SipCmd::Config(c) => {
                w.u16(c.center_freq)?;
                w.u8(c.chan_type)?;
                w.u8(c.idle)?;
            }
            SipCmd::BssInfoUpdate(c) => {
                w.bytes(&c.bssid)?;
                w.u16(c.isassoc)?;
                w.u32(c.beacon_int)?;
                w.u8(c.bssid_no)?;
            }
            SipCmd::WmmParams(c) => {
                w.u8(c.aci)?;
                w.u8(c.aifs)?;
                w.u8(c.ecw_min)?;
                w.u8(c.ecw_max)?;
                w.u16(c.txop_us)?;
            }
            SipCmd::Roc(c) => {
                w.u16(c.center_freq)?;
                w.u32(c.duration)?;
            }
        }
        let total = w.off;
        let plen = (total - SIP_CMD_HDR_LEN) as u16;
        buf[0] = self.id();
        buf[1] = 0;
        buf[2..4].copy_from_slice(&plen.to_le_bytes());
        Some(total)
    }
}

impl Scan {
    pub fn new() -> Self {
        Self {
            aborted: 0,
            ssid_len: 0,
            ssid: [0; SIP_SSID_MAX_LEN],
            n_channels: 0,
            channels: [0; SIP_SCAN_MAX_CHANNELS],
        }
    }
}

impl Default for Scan {
    fn default() -> Self {
        Self::new()
    }
}

/// 2.4G 中心频率转信道号（2412 → 1 … 2472 → 13，2484 → 14）
pub fn freq_to_channel(freq: u32) -> Option<u8> {
    match freq {
        2484 => Some(14),
        2412..=2472 if (freq - 2407) % 5 == 0 => Some(((freq - 2407) / 5) as u8),
        _ => None,
    }
}

/// 按顺序写入的小端游标
struct Writer<'a> {
    buf: &'a mut [u8],
    off: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8], off: usize) -> Self {
        Self { buf, off }
    }

    fn bytes(&mut self, b: &[u8]) -> Option<()> {
        let end = self.off + b.len();
        self.buf.get_mut(self.off..end)?.copy_from_slice(b);
        self.off = end;
        Some(())
    }

    fn u8(&mut self, v: u8) -> Option<()> {
        self.bytes(&[v])
    }

    fn u16(&mut self, v: u16) -> Option<()> {
        self.bytes(&v.to_le_bytes())
    }

    fn u32(&mut self, v: u32) -> Option<()> {
        self.bytes(&v.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setvif_layout() {
        let cmd = SipCmd::SetVif(SetVif {
            index: 1,
            mac: [0x02, 0x11, 0x22, 0x33, 0x44, 0x55],
            set: set_op::ADD,
            op_mode: 1,
            is_p2p: 0,
        });
        let mut buf = [0u8; 32];
        let n = cmd.serialize(&mut buf).unwrap();
        assert_eq!(n, SIP_CMD_HDR_LEN + 10);
        assert_eq!(buf[0], SIP_CMD_SETVIF);
        assert_eq!(u16::from_le_bytes([buf[2], buf[3]]), 10);
        assert_eq!(buf[4], 1);
        assert_eq!(&buf[5..11], &[0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(&buf[11..14], &[1, 1, 0]);
    }

    #[test]
    fn ampdu_action_ssn_little_endian() {
        let cmd = SipCmd::AmpduAction(AmpduActionCmd {
            action_num: SIP_AMPDU_RX_START,
            index: 0,
            tid: 5,
            win_size: SIP_RX_AMPDU_WIN_SIZE,
            ssn: 0x0abc,
            addr: [1, 2, 3, 4, 5, 6],
        });
        let mut buf = [0u8; 32];
        let n = cmd.serialize(&mut buf).unwrap();
        assert_eq!(n, SIP_CMD_HDR_LEN + 12);
        assert_eq!(&buf[4..8], &[SIP_AMPDU_RX_START, 0, 5, 64]);
        assert_eq!(&buf[8..10], &[0xbc, 0x0a]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let cmd = SipCmd::SetKey(SetKey {
            bssid_no: 0,
            addr: [0; 6],
            alg: key_alg::CCMP,
            keyidx: 0,
            hw_key_idx: 6,
            flags: 0,
            keylen: 16,
            key: [0; 32],
        });
        let mut buf = [0u8; 16];
        assert_eq!(cmd.serialize(&mut buf), None);
    }

    #[test]
    fn scan_only_writes_used_channels() {
        let mut scan = Scan::new();
        scan.n_channels = 2;
        scan.channels[0] = 1;
        scan.channels[1] = 6;
        let mut buf = [0u8; 64];
        let n = SipCmd::Scan(scan).serialize(&mut buf).unwrap();
        assert_eq!(n, SIP_CMD_HDR_LEN + 2 + SIP_SSID_MAX_LEN + 1 + 2);
    }

    #[test]
    fn channel_numbers() {
        assert_eq!(freq_to_channel(2412), Some(1));
        assert_eq!(freq_to_channel(2437), Some(6));
        assert_eq!(freq_to_channel(2472), Some(13));
        assert_eq!(freq_to_channel(2484), Some(14));
        assert_eq!(freq_to_channel(5180), None);
    }
}
