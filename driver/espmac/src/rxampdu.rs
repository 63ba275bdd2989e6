//! RX 重排会话登记表
//!
//! 记录固件侧正在进行的接收 BA 会话（站点地址, TID），每对至多一项。
//! 查找与释放是两个独立操作：RX_STOP 先 `find` 再 `release`。

use crate::error::{EspError, EspResult};

/// 最大并发接收 BA 会话数（ESP_PUB_MAX_RXAMPDU）
pub const ESP_PUB_MAX_RXAMPDU: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RxAmpduEntry {
    addr: [u8; 6],
    tid: u8,
}

pub struct RxAmpduRegistry {
    map: u8,
    entries: [Option<RxAmpduEntry>; ESP_PUB_MAX_RXAMPDU],
}

impl RxAmpduRegistry {
    pub const fn new() -> Self {
        Self {
            map: 0,
            entries: [None; ESP_PUB_MAX_RXAMPDU],
        }
    }

    /// 占用第一个空闲槽位；同一 (addr, tid) 已登记时返回原槽位
    pub fn acquire(&mut self, addr: &[u8; 6], tid: u8) -> EspResult<u8> {
        if let Ok(slot) = self.find(addr, tid) {
            return Ok(slot);
        }
        let i = (!self.map).trailing_zeros() as usize;
        if i >= ESP_PUB_MAX_RXAMPDU {
            return Err(EspError::CapacityExceeded);
        }
        self.map |= 1 << i;
        self.entries[i] = Some(RxAmpduEntry { addr: *addr, tid });
        Ok(i as u8)
    }

    /// 纯查询，不改变占用
    pub fn find(&self, addr: &[u8; 6], tid: u8) -> EspResult<u8> {
        let mut map = self.map;
        while map != 0 {
            let i = map.trailing_zeros() as usize;
            map &= !(1 << i);
            if matches!(&self.entries[i], Some(e) if e.tid == tid && e.addr == *addr) {
                return Ok(i as u8);
            }
        }
        Err(EspError::NotFound)
    }

    pub fn release(&mut self, slot: u8) -> EspResult {
        let i = slot as usize;
        if i >= ESP_PUB_MAX_RXAMPDU || self.map & (1 << i) == 0 {
            return Err(EspError::NotFound);
        }
        self.map &= !(1 << i);
        self.entries[i] = None;
        Ok(())
    }

    /// 站点离开时释放其全部会话，返回释放数
    pub fn release_station(&mut self, addr: &[u8; 6]) -> usize {
        let mut released = 0;
        for i in 0..ESP_PUB_MAX_RXAMPDU {
            if matches!(&self.entries[i], Some(e) if e.addr == *addr) {
                self.entries[i] = None;
                self.map &= !(1 << i);
                released += 1;
            }
        }
        released
    }

    #[inline]
    pub fn occupied(&self) -> u8 {
        self.map
    }
}

impl Default for RxAmpduRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(i: u8) -> [u8; 6] {
        [0x02, 0, 0, 0, 0, i]
    }

    #[test]
    fn overflow_keeps_existing_entries() {
        let mut r = RxAmpduRegistry::new();
        for i in 0..ESP_PUB_MAX_RXAMPDU as u8 {
            assert_eq!(r.acquire(&addr(i / 2), i % 2), Ok(i));
        }
        assert_eq!(r.acquire(&addr(9), 0), Err(EspError::CapacityExceeded));
        assert_eq!(r.occupied(), 0xff);
        for i in 0..ESP_PUB_MAX_RXAMPDU as u8 {
            assert_eq!(r.find(&addr(i / 2), i % 2), Ok(i));
        }
    }

    #[test]
    fn find_does_not_release() {
        let mut r = RxAmpduRegistry::new();
        let slot = r.acquire(&addr(1), 3).unwrap();
        assert_eq!(r.find(&addr(1), 3), Ok(slot));
        assert_eq!(r.find(&addr(1), 3), Ok(slot));
        assert_eq!(r.acquire(&addr(1), 3), Ok(slot));
        r.release(slot).unwrap();
        assert_eq!(r.find(&addr(1), 3), Err(EspError::NotFound));
        assert_eq!(r.release(slot), Err(EspError::NotFound));
    }

    #[test]
    fn release_station_drops_all_tids() {
        let mut r = RxAmpduRegistry::new();
        r.acquire(&addr(1), 0).unwrap();
        r.acquire(&addr(2), 0).unwrap();
        r.acquire(&addr(1), 5).unwrap();
        assert_eq!(r.release_station(&addr(1)), 2);
        assert_eq!(r.occupied(), 0b010);
        assert_eq!(r.acquire(&addr(3), 1), Ok(0));
    }
}
