//! 站表
//!
//! 固定 [NODE_TABLE_CAPACITY] 个槽位，全局占用位图 + 每接口位图，下标取最低空闲位。
//! 站表本身不加锁，由 `EspPub` 以一把 `spin::Mutex` 同时保护站表与各站的 [TxTid]。

use ieee80211::{Sta, WME_NUM_TID};

use crate::ampdu::TxTid;
use crate::error::{EspError, EspResult};
use crate::vif::ESP_PUB_MAX_VIF;

/// 站表槽位数
pub const NODE_TABLE_CAPACITY: usize = 8;

/// 保活状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaState {
    #[default]
    Normal,
    Wait,
    Lost,
}

/// 站点记录（esp_node）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EspNode {
    pub addr: [u8; 6],
    pub aid: u16,
    pub ht_supported: bool,
    pub ifidx: u8,
    pub index: u8,
    pub sta_state: StaState,
    pub loss_count: u32,
    pub time_remain: u32,
    pub tid: [TxTid; WME_NUM_TID],
}

impl EspNode {
    /// 恢复为刚关联时的保活状态
    pub fn reset_liveness(&mut self, time_remain_max: u32) {
        self.sta_state = StaState::Normal;
        self.loss_count = 0;
        self.time_remain = time_remain_max;
    }
}

pub struct NodeTable {
    slots: [Option<EspNode>; NODE_TABLE_CAPACITY],
    map: u32,
    maps: [u32; ESP_PUB_MAX_VIF],
    max_sta_per_vif: usize,
    time_remain_max: u32,
}

impl NodeTable {
    pub fn new(max_sta_per_vif: usize, time_remain_max: u32) -> Self {
        Self {
            slots: [None; NODE_TABLE_CAPACITY],
            map: 0,
            maps: [0; ESP_PUB_MAX_VIF],
            max_sta_per_vif: max_sta_per_vif.min(NODE_TABLE_CAPACITY),
            time_remain_max,
        }
    }

    /// 关联站点，返回分配的下标
    pub fn attach(&mut self, ifidx: u8, sta: &Sta) -> EspResult<u8> {
        let vif_map = *self.maps.get(ifidx as usize).ok_or(EspError::InvalidInput)?;
        if self.find_in(vif_map, &sta.addr).is_some() {
            return Err(EspError::AlreadyExists);
        }
        if vif_map.count_ones() as usize >= self.max_sta_per_vif {
            return Err(EspError::CapacityExceeded);
        }
        let i = (!self.map).trailing_zeros() as usize;
        if i >= NODE_TABLE_CAPACITY {
            return Err(EspError::CapacityExceeded);
        }
        self.map |= 1 << i;
        self.maps[ifidx as usize] |= 1 << i;
        self.slots[i] = Some(EspNode {
            addr: sta.addr,
            aid: sta.aid,
            ht_supported: sta.ht_cap.ht_supported,
            ifidx,
            index: i as u8,
            sta_state: StaState::Normal,
            loss_count: 0,
            time_remain: self.time_remain_max,
            tid: [TxTid::default(); WME_NUM_TID],
        });
        Ok(i as u8)
    }

    /// 解除关联，返回原下标
    pub fn detach(&mut self, ifidx: u8, addr: &[u8; 6]) -> EspResult<u8> {
        let vif_map = *self.maps.get(ifidx as usize).ok_or(EspError::InvalidInput)?;
        let i = self.find_in(vif_map, addr).ok_or(EspError::NotFound)?;
        self.slots[i] = None;
        self.map &= !(1 << i);
        self.maps[ifidx as usize] &= !(1 << i);
        Ok(i as u8)
    }

    fn find_in(&self, mut map: u32, addr: &[u8; 6]) -> Option<usize> {
        while map != 0 {
            let i = map.trailing_zeros() as usize;
            map &= !(1 << i);
            if matches!(&self.slots[i], Some(n) if n.addr == *addr) {
                return Some(i);
            }
        }
        None
    }

    pub fn get_by_addr(&self, addr: &[u8; 6]) -> EspResult<&EspNode> {
        let i = self.find_in(self.map, addr).ok_or(EspError::NotFound)?;
        self.slots[i].as_ref().ok_or(EspError::NotFound)
    }

    pub fn get_by_addr_mut(&mut self, addr: &[u8; 6]) -> EspResult<&mut EspNode> {
        let i = self.find_in(self.map, addr).ok_or(EspError::NotFound)?;
        self.slots[i].as_mut().ok_or(EspError::NotFound)
    }

    /// 只在 `ifidx` 的位图中查找；同一地址可能同时挂在两个接口上
    pub fn get_on_vif_mut(&mut self, ifidx: u8, addr: &[u8; 6]) -> EspResult<&mut EspNode> {
        let vif_map = *self.maps.get(ifidx as usize).ok_or(EspError::InvalidInput)?;
        let i = self.find_in(vif_map, addr).ok_or(EspError::NotFound)?;
        self.slots[i].as_mut().ok_or(EspError::NotFound)
    }

    pub fn get_by_index(&self, index: u8) -> EspResult<&EspNode> {
        if (index as usize) >= NODE_TABLE_CAPACITY || self.map & (1 << index) == 0 {
            return Err(EspError::NotFound);
        }
        self.slots[index as usize].as_ref().ok_or(EspError::NotFound)
    }

    /// 全局占用位图
    #[inline]
    pub fn occupied(&self) -> u32 {
        self.map
    }

    pub fn occupied_on(&self, ifidx: u8) -> u32 {
        self.maps.get(ifidx as usize).copied().unwrap_or(0)
    }

    /// 按下标顺序遍历某接口的站点
    pub fn iter_vif_mut(&mut self, ifidx: u8) -> impl Iterator<Item = &mut EspNode> {
        self.slots
            .iter_mut()
            .flatten()
            .filter(move |n| n.ifidx == ifidx)
    }

    #[inline]
    pub fn time_remain_max(&self) -> u32 {
        self.time_remain_max
    }
}
