//! TX AMPDU 会话状态机（每站每 TID 一个 [TxTid]）
//!
//! ```text
//! INIT --(观察到 trigger_cnt 个 QoS 帧)--> TRIGGER --TX_START--> PROGRESS --TX_OPERATIONAL--> OPERATIONAL
//!   ^                                                                                   |
//!   +----------- TX_STOP_* (非 WAIT_STOP) <---- WAIT_STOP (驱动请求停止) <--------------+
//!                                  WAIT_STOP --TX_STOP_*--> STOP
//! ```
//!
//! 起始序列号 `ssn` 只在 INIT 时由发送路径写入、只在 TRIGGER 时由 TX_START 读取，
//! 两者都在站表锁内进行。

use ieee80211::ieee80211::next_seq;

use crate::error::{EspError, EspResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TidState {
    #[default]
    Init,
    Trigger,
    Progress,
    Operational,
    WaitStop,
    Stop,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxTid {
    pub ssn: u16,
    pub state: TidState,
    pub cnt: u32,
}

impl TxTid {
    pub fn reset(&mut self) {
        *self = TxTid::default();
    }

    /// 发送路径观察到一帧 QoS 数据（序列号 `seq`）；返回 true 表示刚进入 TRIGGER，
    /// 调用方应在释放锁后请求协议栈发起 BA 协商
    pub fn observe_tx(&mut self, seq: u16, trigger_cnt: u32) -> bool {
        if self.state != TidState::Init {
            return false;
        }
        self.ssn = next_seq(seq);
        self.cnt += 1;
        if self.cnt >= trigger_cnt {
            self.state = TidState::Trigger;
            self.cnt = 0;
            return true;
        }
        false
    }

    /// 协议栈拒绝发起协商时回到 INIT
    pub fn cancel_trigger(&mut self) {
        if self.state == TidState::Trigger {
            self.reset();
        }
    }

    fn abort(&mut self, tid: u8, expected: TidState) -> EspError {
        let found = self.state;
        log::error!(target: "wireless::espmac", "ampdu tid {} expected {:?} found {:?}, abort session", tid, expected, found);
        self.reset();
        EspError::SessionInvariant {
            tid,
            expected,
            found,
        }
    }

    /// TX_START：TRIGGER → PROGRESS，返回捕获的 ssn
    pub fn start(&mut self, tid: u8) -> EspResult<u16> {
        if self.state != TidState::Trigger {
            return Err(self.abort(tid, TidState::Trigger));
        }
        self.state = TidState::Progress;
        Ok(self.ssn)
    }

    /// TX_OPERATIONAL：PROGRESS → OPERATIONAL；INIT 表示会话已被复位
    pub fn operational(&mut self, tid: u8) -> EspResult {
        match self.state {
            TidState::Progress => {
                self.state = TidState::Operational;
                Ok(())
            }
            TidState::Init => {
                log::warn!(target: "wireless::espmac", "ampdu tid {} operational after reset, ignore", tid);
                Err(EspError::NetReset)
            }
            _ => Err(self.abort(tid, TidState::Progress)),
        }
    }

    /// TX_STOP_*：WAIT_STOP → STOP，其余 → INIT
    pub fn stop(&mut self) {
        if self.state == TidState::WaitStop {
            self.state = TidState::Stop;
        } else {
            self.reset();
        }
    }

    /// 驱动主动停止：OPERATIONAL / PROGRESS → WAIT_STOP
    pub fn request_stop(&mut self) -> bool {
        match self.state {
            TidState::Operational | TidState::Progress => {
                self.state = TidState::WaitStop;
                true
            }
            _ => false,
        }
    }
}
