//! 驱动配置
//!
//! [EspConf] 汇总保活定时器、AMPDU 触发、站点上限等可调参数，默认值即出厂常量；
//! [parse_configfile] 解析 `KEY=value` 形式的配置文件覆盖默认值。

use crate::node::NODE_TABLE_CAPACITY;
use crate::vif::ESP_PUB_MAX_VIF;

/// 每接口最多关联站点数（ESP_PUB_MAX_STA）
pub const ESP_PUB_MAX_STA: usize = 4;
/// null-data 定时器周期（ESP_ND_TIMER_INTERVAL）
pub const ESP_ND_TIMER_INTERVAL_MS: u64 = 1000;
/// 保活倒计时初值（ESP_ND_TIME_REMAIN_MAX）
pub const ESP_ND_TIME_REMAIN_MAX: u32 = 6;
/// 连续无响应上限（ESP_LOSS_COUNT_MAX）
pub const ESP_LOSS_COUNT_MAX: u32 = 3;
/// 触发 TX BA 协商前观察的 QoS 数据帧数
pub const ESP_AMPDU_TRIGGER_CNT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EspConf {
    pub mac_addr: [u8; 6],
    /// P2P 并发时两个接口的地址；非并发时只用 `mac_addr`
    pub vif_addrs: [[u8; 6]; ESP_PUB_MAX_VIF],
    pub p2p_concurrent: bool,
    pub max_sta_per_vif: usize,
    pub nd_timer_interval_ms: u64,
    pub nd_first_expiry_ms: u64,
    pub time_remain_max: u32,
    pub loss_count_max: u32,
    pub ampdu_trigger_cnt: u32,
    pub no_txampdu: bool,
    pub no_rxampdu: bool,
    pub support_bgscan: bool,
    /// 驱动自建帧（null-data）预留的发送头部空间
    pub extra_tx_headroom: usize,
}

impl Default for EspConf {
    fn default() -> Self {
        Self {
            mac_addr: [0; 6],
            vif_addrs: [[0; 6]; ESP_PUB_MAX_VIF],
            p2p_concurrent: false,
            max_sta_per_vif: ESP_PUB_MAX_STA,
            nd_timer_interval_ms: ESP_ND_TIMER_INTERVAL_MS,
            nd_first_expiry_ms: 1000,
            time_remain_max: ESP_ND_TIME_REMAIN_MAX,
            loss_count_max: ESP_LOSS_COUNT_MAX,
            ampdu_trigger_cnt: ESP_AMPDU_TRIGGER_CNT,
            no_txampdu: false,
            no_rxampdu: false,
            support_bgscan: false,
            extra_tx_headroom: 0,
        }
    }
}

impl EspConf {
    /// 以 `mac_addr` 推导接口地址：接口 0 即本机地址；接口 1 为置本地管理位的 P2P 地址，
    /// 不断调整第一个字节直到与接口 0 不同
    pub fn derive_vif_addrs(&mut self) {
        let wlan = self.mac_addr;
        let mut p2p = wlan;
        for idx in 0u8..64 {
            p2p[0] = (wlan[0] | 0x02) ^ (idx << 2);
            if p2p != wlan {
                break;
            }
        }
        self.vif_addrs[0] = wlan;
        self.vif_addrs[1] = p2p;
    }
}

/// 在 file_data 中查找 tag_name 开头的行，返回其后的值（不含换行与行尾 '\r'）
fn find_tag<'a>(file_data: &'a [u8], tag_name: &str) -> Option<&'a [u8]> {
    let tag = tag_name.as_bytes();
    file_data
        .split(|&b| b == b'\n')
        .find(|line| line.starts_with(tag))
        .map(|line| {
            let v = &line[tag.len()..];
            v.strip_suffix(b"\r").unwrap_or(v)
        })
}

/// 解析 00:11:22:33:44:55 格式
fn parse_mac_addr(s: &[u8]) -> Option<[u8; 6]> {
    let mut out = [0u8; 6];
    let mut i = 0;
    let mut byte_idx = 0;
    while byte_idx < 6 && i + 2 <= s.len() {
        let hi = hex_nibble(s[i])?;
        let lo = hex_nibble(s[i + 1])?;
        out[byte_idx] = (hi << 4) | lo;
        byte_idx += 1;
        i += 2;
        if byte_idx < 6 && i < s.len() && s[i] == b':' {
            i += 1;
        }
    }
    if byte_idx == 6 {
        Some(out)
    } else {
        None
    }
}

fn hex_nibble(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn parse_dec(s: &[u8]) -> Option<u64> {
    let digits = s.iter().take_while(|b| b.is_ascii_digit());
    let mut v: u64 = 0;
    let mut n = 0;
    for &d in digits {
        v = v.checked_mul(10)?.checked_add((d - b'0') as u64)?;
        n += 1;
    }
    if n == 0 {
        None
    } else {
        Some(v)
    }
}

fn parse_bool(s: &[u8]) -> Option<bool> {
    match s.first()? {
        b'1' | b'y' | b'Y' => Some(true),
        b'0' | b'n' | b'N' => Some(false),
        _ => None,
    }
}

/// 解析配置文件；缺失或格式错误的项保持原值，越界值被截断到合法范围
pub fn parse_configfile(file_data: &[u8], config: &mut EspConf) {
    if let Some(mac) = find_tag(file_data, "MAC_ADDR=").and_then(parse_mac_addr) {
        config.mac_addr = mac;
    }
    if config.p2p_concurrent || find_tag(file_data, "P2P_CONCURRENT=").and_then(parse_bool) == Some(true) {
        config.p2p_concurrent = true;
    }
    config.derive_vif_addrs();
    if let Some(mac) = find_tag(file_data, "MAC_ADDR1=").and_then(parse_mac_addr) {
        config.vif_addrs[1] = mac;
    }

    macro_rules! parse_num {
        ($tag:expr, $field:ident, $ty:ty, $min:expr, $max:expr) => {
            if let Some(v) = find_tag(file_data, $tag).and_then(parse_dec) {
                config.$field = (v.clamp($min as u64, $max as u64)) as $ty;
            }
        };
    }
    parse_num!("MAX_STA=", max_sta_per_vif, usize, 1, NODE_TABLE_CAPACITY);
    parse_num!("ND_INTERVAL_MS=", nd_timer_interval_ms, u64, 10, 60_000);
    parse_num!("TIME_REMAIN_MAX=", time_remain_max, u32, 1, 255);
    parse_num!("LOSS_COUNT_MAX=", loss_count_max, u32, 0, 255);
    parse_num!("AMPDU_TRIGGER_CNT=", ampdu_trigger_cnt, u32, 1, 0xffff);

    macro_rules! parse_flag {
        ($tag:expr, $field:ident) => {
            if let Some(v) = find_tag(file_data, $tag).and_then(parse_bool) {
                config.$field = v;
            }
        };
    }
    parse_flag!("NO_TXAMPDU=", no_txampdu);
    parse_flag!("NO_RXAMPDU=", no_rxampdu);
    parse_flag!("BGSCAN=", support_bgscan);

    log::debug!(target: "wireless::espmac", "parse_configfile mac={:02x?} max_sta={} p2p={}",
        config.mac_addr, config.max_sta_per_vif, config.p2p_concurrent);
}
