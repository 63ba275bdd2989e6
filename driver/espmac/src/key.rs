//! 硬件密钥槽位分配
//!
//! - 高区 19 项（硬件下标 6..24）：单播密钥与 WEP 密钥
//! - 低区每接口 2 项（硬件下标 `2 + ifidx * 2 + i`）：组播密钥
//!
//! 协议栈重复下发已占用槽位的密钥时视为覆盖（overlap），只更新对端地址、不动计数。

use core::sync::atomic::Ordering;

use ieee80211::ieee80211::wlan_cipher_suite;
use ieee80211::mac80211::key_flags;
use ieee80211::{KeyConf, Mac80211Host, SetKeyCmd, Sta, Vif};
use sip::cmd::key_alg;
use sip::{SetKey, SipCmd, SipTransport};

use crate::epub::EspPub;
use crate::error::{EspError, EspResult};
use crate::timer::TimerOps;
use crate::vif::ESP_PUB_MAX_VIF;

pub const KEY_HI_MAP_SIZE: usize = 19;
pub const KEY_HI_BASE: u8 = 6;
pub const KEY_LOW_MAP_SIZE: usize = 2;
pub const KEY_LOW_BASE: u8 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeySlot {
    pub used: bool,
    pub mac: [u8; 6],
}

#[derive(Debug, Clone)]
pub struct KeyMap {
    hi_map: [KeySlot; KEY_HI_MAP_SIZE],
    low_map: [[KeySlot; KEY_LOW_MAP_SIZE]; ESP_PUB_MAX_VIF],
    ptk_cnt: i32,
    gtk_cnt: i32,
}

/// 高区还是低区
fn uses_hi_map(key: &KeyConf) -> bool {
    key.flags & key_flags::PAIRWISE != 0 || wlan_cipher_suite::is_wep(key.cipher)
}

impl KeyMap {
    pub const fn new() -> Self {
        Self {
            hi_map: [KeySlot { used: false, mac: [0; 6] }; KEY_HI_MAP_SIZE],
            low_map: [[KeySlot { used: false, mac: [0; 6] }; KEY_LOW_MAP_SIZE]; ESP_PUB_MAX_VIF],
            ptk_cnt: 0,
            gtk_cnt: 0,
        }
    }

    fn slots_mut(&mut self, ifidx: u8, hi: bool) -> EspResult<(&mut [KeySlot], u8)> {
        if hi {
            return Ok((&mut self.hi_map[..], KEY_HI_BASE));
        }
        let low = self
            .low_map
            .get_mut(ifidx as usize)
            .ok_or(EspError::InvalidInput)?;
        Ok((&mut low[..], KEY_LOW_BASE + ifidx * 2))
    }

    /// 安装密钥，写回 `key.hw_key_idx`；返回是否为覆盖
    pub fn install(&mut self, ifidx: u8, key: &mut KeyConf, peer: &[u8; 6]) -> EspResult<bool> {
        let (slots, base) = self.slots_mut(ifidx, uses_hi_map(key))?;
        let cur = key.hw_key_idx.wrapping_sub(base) as usize;
        if let Some(slot) = slots.get_mut(cur).filter(|s| s.used) {
            slot.mac = *peer;
            log::warn!(target: "wireless::espmac", "key slot {} overlap", key.hw_key_idx);
            return Ok(true);
        }
        let i = slots
            .iter()
            .position(|s| !s.used)
            .ok_or(EspError::CapacityExceeded)?;
        slots[i] = KeySlot { used: true, mac: *peer };
        key.hw_key_idx = base + i as u8;
        self.count(key, 1);
        Ok(false)
    }

    /// 释放 `key.hw_key_idx` 指向的槽位
    pub fn remove(&mut self, ifidx: u8, key: &KeyConf) -> EspResult {
        let (slots, base) = self.slots_mut(ifidx, uses_hi_map(key))?;
        let cur = key.hw_key_idx.wrapping_sub(base) as usize;
        let slot = slots
            .get_mut(cur)
            .filter(|s| s.used)
            .ok_or(EspError::NotFound)?;
        *slot = KeySlot::default();
        self.count(key, -1);
        Ok(())
    }

    /// 高区槽位计入 PTK、低区计入 GTK；WEP 密钥两者都计
    fn count(&mut self, key: &KeyConf, delta: i32) {
        let wep = wlan_cipher_suite::is_wep(key.cipher);
        if key.hw_key_idx >= KEY_HI_BASE {
            self.ptk_cnt += delta;
            if wep {
                self.gtk_cnt += delta;
            }
        } else {
            self.gtk_cnt += delta;
            if wep {
                self.ptk_cnt += delta;
            }
        }
    }

    pub fn ptk_cnt(&self) -> i32 {
        self.ptk_cnt
    }

    pub fn gtk_cnt(&self) -> i32 {
        self.gtk_cnt
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new()
    }
}

fn cipher_alg(cipher: u32) -> u8 {
    match cipher {
        wlan_cipher_suite::WEP40 | wlan_cipher_suite::WEP104 => key_alg::WEP,
        wlan_cipher_suite::TKIP => key_alg::TKIP,
        wlan_cipher_suite::CCMP => key_alg::CCMP,
        wlan_cipher_suite::AES_CMAC => key_alg::AES_CMAC,
        _ => key_alg::NONE,
    }
}

impl<T: SipTransport, H: Mac80211Host, C: TimerOps> EspPub<T, H, C> {
    pub(crate) fn do_set_key(&self, cmd: SetKeyCmd, vif: &Vif, sta: Option<&Sta>, key: &mut KeyConf) -> EspResult {
        let ifidx = self.vif_index(vif)?;
        key.flags |= key_flags::GENERATE_IV;
        let bssid = *self.bssid.lock();
        let peer = match sta {
            Some(s) if s.addr != bssid => s.addr,
            _ => bssid,
        };
        log::debug!(target: "wireless::espmac", "set_key {:?} cipher={:#x} keyidx={} peer={:02x?}",
            cmd, key.cipher, key.keyidx, peer);

        let set = cmd == SetKeyCmd::Set;
        {
            let mut keys = self.keys.lock();
            if set {
                keys.install(ifidx, key, &peer)?;
            } else {
                keys.remove(ifidx, key)?;
            }
        }

        let ret = self.send_cmd(SipCmd::SetKey(SetKey {
            bssid_no: ifidx,
            addr: peer,
            alg: if set { cipher_alg(key.cipher) } else { key_alg::NONE },
            keyidx: key.keyidx,
            hw_key_idx: key.hw_key_idx,
            flags: set as u8,
            keylen: key.keylen,
            key: key.key,
        }));
        if ret.is_ok() && key.cipher == wlan_cipher_suite::TKIP {
            self.tkip_key_set.store(true, Ordering::Release);
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EspConf;
    use crate::mock::{sta_vif, test_pub, test_sta};
    use crate::ops::Mac80211Ops;

    const PEER: [u8; 6] = [0x0a, 0, 0, 0, 0, 1];

    fn ptk(cipher: u32) -> KeyConf {
        KeyConf::new(cipher, 0, key_flags::PAIRWISE, &[0x11; 16])
    }

    #[test]
    fn pairwise_keys_use_high_map() {
        let mut m = KeyMap::new();
        let mut a = ptk(wlan_cipher_suite::CCMP);
        let mut b = ptk(wlan_cipher_suite::CCMP);
        assert_eq!(m.install(0, &mut a, &PEER), Ok(false));
        assert_eq!(m.install(1, &mut b, &PEER), Ok(false));
        assert_eq!((a.hw_key_idx, b.hw_key_idx), (6, 7));
        assert_eq!((m.ptk_cnt(), m.gtk_cnt()), (2, 0));

        // 同一槽位再次安装：覆盖，计数不变
        assert_eq!(m.install(0, &mut a, &[9; 6]), Ok(true));
        assert_eq!(m.ptk_cnt(), 2);

        m.remove(0, &a).unwrap();
        assert_eq!(m.remove(0, &a), Err(EspError::NotFound));
        assert_eq!(m.ptk_cnt(), 1);
        let mut c = ptk(wlan_cipher_suite::TKIP);
        m.install(0, &mut c, &PEER).unwrap();
        assert_eq!(c.hw_key_idx, 6);
    }

    #[test]
    fn group_keys_use_per_vif_low_map() {
        let mut m = KeyMap::new();
        let mut keys = [KeyConf::new(wlan_cipher_suite::CCMP, 1, 0, &[0x22; 16]); 3];
        assert_eq!(m.install(1, &mut keys[0], &PEER), Ok(false));
        assert_eq!(m.install(1, &mut keys[1], &PEER), Ok(false));
        assert_eq!((keys[0].hw_key_idx, keys[1].hw_key_idx), (4, 5));
        assert_eq!(m.install(1, &mut keys[2], &PEER), Err(EspError::CapacityExceeded));
        assert_eq!(m.install(0, &mut keys[2], &PEER), Ok(false));
        assert_eq!(keys[2].hw_key_idx, 2);
        assert_eq!((m.ptk_cnt(), m.gtk_cnt()), (0, 3));
        assert_eq!(m.install(2, &mut keys[2], &PEER), Err(EspError::InvalidInput));
    }

    #[test]
    fn wep_counts_both() {
        let mut m = KeyMap::new();
        let mut k = KeyConf::new(wlan_cipher_suite::WEP40, 0, 0, &[0x33; 5]);
        m.install(0, &mut k, &PEER).unwrap();
        assert_eq!(k.hw_key_idx, 6);
        assert_eq!((m.ptk_cnt(), m.gtk_cnt()), (1, 1));
        m.remove(0, &k).unwrap();
        assert_eq!((m.ptk_cnt(), m.gtk_cnt()), (0, 0));
    }

    #[test]
    fn set_key_sends_setkey_and_marks_tkip() {
        let p = test_pub(EspConf::default());
        let vif = sta_vif(p.conf().mac_addr);
        p.add_interface(&vif).unwrap();
        *p.bssid.lock() = PEER;

        let mut key = ptk(wlan_cipher_suite::TKIP);
        p.set_key(SetKeyCmd::Set, &vif, Some(&test_sta(1, 1)), &mut key).unwrap();
        assert_ne!(key.flags & key_flags::GENERATE_IV, 0);
        assert!(p.tkip_key_set.load(Ordering::Acquire));

        let mut gtk = KeyConf::new(wlan_cipher_suite::CCMP, 1, 0, &[0x44; 16]);
        p.set_key(SetKeyCmd::Set, &vif, None, &mut gtk).unwrap();
        p.set_key(SetKeyCmd::Disable, &vif, None, &mut gtk).unwrap();

        let sets: Vec<SetKey> = p
            .sip()
            .cmds()
            .into_iter()
            .filter_map(|c| match c {
                SipCmd::SetKey(k) => Some(k),
                _ => None,
            })
            .collect();
        assert_eq!(sets.len(), 3);
        assert_eq!((sets[0].alg, sets[0].hw_key_idx, sets[0].flags), (key_alg::TKIP, 6, 1));
        assert_eq!(sets[0].addr, test_sta(1, 1).addr);
        assert_eq!((sets[1].alg, sets[1].hw_key_idx, sets[1].addr), (key_alg::CCMP, 2, PEER));
        assert_eq!((sets[2].alg, sets[2].flags), (key_alg::NONE, 0));
        assert_eq!(p.keys.lock().gtk_cnt(), 0);
    }
}
