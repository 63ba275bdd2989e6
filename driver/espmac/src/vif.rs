//! 接口生命周期：add / change / remove_interface 与 bss_info_changed
//!
//! 接口下标由地址决定（P2P 并发时为地址在 `vif_addrs` 中的位置，否则恒为 0），
//! AP 接口启用 beacon 时同时启动 beacon 定时器与 null-data 保活。

use ieee80211::mac80211::bss_changed;
use ieee80211::{BssConf, Mac80211Host, Nl80211Iftype, Vif};
use sip::cmd::set_op;
use sip::{BssInfoUpdate, SetVif, SipCmd, SipTransport};

use crate::beacon::BeaconClock;
use crate::config::EspConf;
use crate::epub::{wl_flags, EspPub};
use crate::error::{EspError, EspResult};
use crate::timer::{TimerId, TimerOps};

/// 最大虚拟接口数（ESP_PUB_MAX_VIF）
pub const ESP_PUB_MAX_VIF: usize = 2;

/// BSS_INFO_UPDATE 中 AP 启停使用的 isassoc 值
const BSS_INFO_AP: u16 = 2;

/// 驱动侧接口状态（esp_vif）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EspVif {
    pub index: u8,
    pub addr: [u8; 6],
    pub iftype: Nl80211Iftype,
    pub ap_up: bool,
    /// beacon 间隔（TU），AP 未启用时为 0
    pub beacon_interval: u16,
    pub clock: BeaconClock,
}

impl EspVif {
    fn new(index: u8, vif: &Vif) -> Self {
        Self {
            index,
            addr: vif.addr,
            iftype: vif.iftype,
            ap_up: false,
            beacon_interval: 0,
            clock: BeaconClock::default(),
        }
    }
}

pub struct VifTable {
    slots: [Option<EspVif>; ESP_PUB_MAX_VIF],
    /// 运行保活监测的 AP 接口（master_ifidx, master_addr）
    master: Option<(u8, [u8; 6])>,
}

impl VifTable {
    pub const fn new() -> Self {
        Self {
            slots: [None; ESP_PUB_MAX_VIF],
            master: None,
        }
    }

    /// 位图形式的已用槽位（vif_slot）
    pub fn vif_slot(&self) -> u8 {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .fold(0, |m, (i, _)| m | 1 << i)
    }

    fn insert(&mut self, evif: EspVif) -> EspResult {
        let slot = self
            .slots
            .get_mut(evif.index as usize)
            .ok_or(EspError::NotSupported)?;
        if slot.is_some() {
            return Err(EspError::NotSupported);
        }
        *slot = Some(evif);
        Ok(())
    }

    fn remove_by_addr(&mut self, addr: &[u8; 6]) -> Option<EspVif> {
        let i = self.find_by_addr(addr)?;
        self.slots[i as usize].take()
    }

    pub fn find_by_addr(&self, addr: &[u8; 6]) -> Option<u8> {
        self.slots
            .iter()
            .flatten()
            .find(|v| v.addr == *addr)
            .map(|v| v.index)
    }

    pub fn get(&self, index: u8) -> Option<&EspVif> {
        self.slots.get(index as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, index: u8) -> Option<&mut EspVif> {
        self.slots.get_mut(index as usize)?.as_mut()
    }

    pub fn master(&self) -> Option<(u8, [u8; 6])> {
        self.master
    }

    pub(crate) fn set_master(&mut self, ifidx: u8, addr: [u8; 6]) {
        self.master = Some((ifidx, addr));
    }

    pub(crate) fn clear_master(&mut self) {
        self.master = None;
    }
}

impl Default for VifTable {
    fn default() -> Self {
        Self::new()
    }
}

/// 地址 → 接口下标（getaddr_index），未知地址返回 None
pub fn getaddr_index(addr: &[u8; 6], conf: &EspConf) -> Option<u8> {
    if !conf.p2p_concurrent {
        return Some(0);
    }
    conf.vif_addrs
        .iter()
        .position(|a| a == addr)
        .map(|i| i as u8)
}

/// 接口类型 → 固件 (op_mode, is_p2p)
pub fn iftype_mode(iftype: Nl80211Iftype, p2p: bool) -> EspResult<(u8, u8)> {
    match iftype {
        Nl80211Iftype::Station => Ok((0, p2p as u8)),
        Nl80211Iftype::Ap => Ok((1, p2p as u8)),
        Nl80211Iftype::P2pClient => Ok((0, 1)),
        Nl80211Iftype::P2pGo => Ok((1, 1)),
        _ => Err(EspError::NotSupported),
    }
}

impl<T: SipTransport, H: Mac80211Host, C: TimerOps> EspPub<T, H, C> {
    pub(crate) fn do_add_interface(&self, vif: &Vif) -> EspResult {
        log::debug!(target: "wireless::espmac", "add_interface type={:?} addr={:02x?}", vif.iftype, vif.addr);
        let index = getaddr_index(&vif.addr, &self.conf).ok_or_else(|| {
            log::error!(target: "wireless::espmac", "add_interface unknown addr {:02x?}", vif.addr);
            EspError::NotSupported
        })?;
        let (op_mode, is_p2p) = iftype_mode(vif.iftype, false).map_err(|e| {
            log::error!(target: "wireless::espmac", "add_interface does not support type {:?}", vif.iftype);
            e
        })?;
        self.vifs.lock().insert(EspVif::new(index, vif)).map_err(|e| {
            log::error!(target: "wireless::espmac", "add_interface interface {} already used", index);
            e
        })?;

        let cmd = SipCmd::SetVif(SetVif {
            index,
            mac: vif.addr,
            set: set_op::ADD,
            op_mode,
            is_p2p,
        });
        if let Err(e) = self.send_cmd(cmd) {
            self.vifs.lock().remove_by_addr(&vif.addr);
            return Err(e);
        }
        log::info!(target: "wireless::espmac", "interface {} up type={:?}", index, vif.iftype);
        Ok(())
    }

    pub(crate) fn do_change_interface(&self, vif: &Vif, new_type: Nl80211Iftype, p2p: bool) -> EspResult {
        let index = self.vif_index(vif)?;
        let (op_mode, is_p2p) = iftype_mode(new_type, p2p)?;
        if vif.iftype != new_type {
            log::info!(target: "wireless::espmac", "interface {} type {:?} -> {:?}", index, vif.iftype, new_type);
        }
        if let Some(ev) = self.vifs.lock().get_mut(index) {
            ev.iftype = new_type;
        }
        self.send_cmd(SipCmd::SetVif(SetVif {
            index,
            mac: vif.addr,
            set: set_op::CHANGE,
            op_mode,
            is_p2p,
        }))
    }

    pub(crate) fn do_remove_interface(&self, vif: &Vif) {
        let Some(evif) = self.vifs.lock().remove_by_addr(&vif.addr) else {
            log::debug!(target: "wireless::espmac", "remove_interface {:02x?} not present", vif.addr);
            return;
        };
        if evif.ap_up {
            self.timer.del_timer_sync(TimerId::Beacon(evif.index));
            self.conn_monitor_close(evif.index);
        }
        let cmd = SipCmd::SetVif(SetVif {
            index: evif.index,
            set: set_op::REMOVE,
            ..Default::default()
        });
        // 接口已释放，命令失败只记录
        let _ = self.send_cmd(cmd);
        log::info!(target: "wireless::espmac", "interface {} down", evif.index);
    }

    pub(crate) fn do_bss_info_changed(&self, vif: &Vif, info: &BssConf, changed: u32) -> EspResult {
        let index = self.vif_index(vif)?;
        log::debug!(target: "wireless::espmac", "bss_info_changed changed={:#x} assoc={} bssid={:02x?}",
            changed, info.assoc, info.bssid);

        match vif.iftype {
            Nl80211Iftype::Station | Nl80211Iftype::P2pClient => {
                if changed & bss_changed::BSSID != 0 || (changed & bss_changed::ASSOC != 0 && info.assoc) {
                    *self.bssid.lock() = info.bssid;
                    self.send_bss_info_update(index, &info.bssid, info.assoc as u16, info.beacon_int)
                } else if changed & bss_changed::ASSOC != 0 && !info.assoc {
                    *self.bssid.lock() = [0; 6];
                    self.send_bss_info_update(index, &info.bssid, 0, info.beacon_int)
                } else {
                    Ok(())
                }
            }
            Nl80211Iftype::Ap | Nl80211Iftype::P2pGo => {
                if changed & (bss_changed::BEACON_ENABLED | bss_changed::BEACON_INT) == 0 {
                    return Ok(());
                }
                let ap_up = self.vifs.lock().get(index).map(|v| v.ap_up).unwrap_or(false);
                if info.enable_beacon && !ap_up {
                    self.beacon_start(index, info.beacon_int);
                    self.conn_monitor_open(index);
                    self.send_bss_info_update(index, &info.bssid, BSS_INFO_AP, info.beacon_int)
                } else if !info.enable_beacon && ap_up && !self.is_roc() {
                    self.beacon_stop(index);
                    self.conn_monitor_close(index);
                    self.send_bss_info_update(index, &info.bssid, BSS_INFO_AP, info.beacon_int)
                } else {
                    Ok(())
                }
            }
            other => {
                log::error!(target: "wireless::espmac", "bss_info_changed op mode {:?} unspecified", other);
                Err(EspError::NotSupported)
            }
        }
    }

    /// sip_send_bss_info_update：关联到非零 BSSID 时置 CONNECT，否则清除
    fn send_bss_info_update(&self, index: u8, bssid: &[u8; 6], isassoc: u16, beacon_int: u16) -> EspResult {
        if isassoc == 1 && *bssid != [0; 6] {
            self.set_wl_flag(wl_flags::CONNECT);
        } else if isassoc != BSS_INFO_AP {
            self.clear_wl_flag(wl_flags::CONNECT);
        }
        self.send_cmd(SipCmd::BssInfoUpdate(BssInfoUpdate {
            bssid: *bssid,
            isassoc,
            beacon_int: beacon_int as u32,
            bssid_no: index,
        }))
    }
}
