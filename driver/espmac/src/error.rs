//! 驱动核心错误类型

use axerrno::AxError;
use core::fmt;

use crate::ampdu::TidState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EspError {
    /// 站表 / RX 重排表已满
    CapacityExceeded,
    NotFound,
    /// AMPDU 会话在等待 OPERATIONAL 时已被复位（接口并发重置）
    NetReset,
    NotSupported,
    InvalidInput,
    /// 无线关闭时的请求
    PermissionDenied,
    /// 请求过于频繁（后台扫描限速）
    AccessDenied,
    Busy,
    AlreadyExists,
    /// 固件命令通道失败
    Transport(AxError),
    /// AMPDU 会话状态与事件不符；会话已被中止回 INIT
    SessionInvariant {
        tid: u8,
        expected: TidState,
        found: TidState,
    },
}

impl EspError {
    /// 对应的负 errno（供需要 Linux 错误码的上层使用）
    pub fn errno(&self) -> i32 {
        match self {
            EspError::CapacityExceeded => -28, // ENOSPC
            EspError::NotFound => -2,          // ENOENT
            EspError::NetReset => -102,        // ENETRESET
            EspError::NotSupported => -95,     // EOPNOTSUPP
            EspError::InvalidInput => -22,     // EINVAL
            EspError::PermissionDenied => -1,  // EPERM
            EspError::AccessDenied => -13,     // EACCES
            EspError::Busy => -16,             // EBUSY
            EspError::AlreadyExists => -17,    // EEXIST
            EspError::Transport(_) => -5,      // EIO
            EspError::SessionInvariant { .. } => -71, // EPROTO
        }
    }

    /// 是否属于状态跟踪错误（不可恢复类）
    pub fn is_fatal(&self) -> bool {
        matches!(self, EspError::SessionInvariant { .. })
    }
}

impl From<AxError> for EspError {
    fn from(e: AxError) -> Self {
        EspError::Transport(e)
    }
}

impl From<EspError> for i32 {
    fn from(e: EspError) -> Self {
        e.errno()
    }
}

impl fmt::Display for EspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EspError::CapacityExceeded => write!(f, "capacity exceeded"),
            EspError::NotFound => write!(f, "not found"),
            EspError::NetReset => write!(f, "session reset"),
            EspError::NotSupported => write!(f, "not supported"),
            EspError::InvalidInput => write!(f, "invalid input"),
            EspError::PermissionDenied => write!(f, "radio off"),
            EspError::AccessDenied => write!(f, "request too frequent"),
            EspError::Busy => write!(f, "busy"),
            EspError::AlreadyExists => write!(f, "already exists"),
            EspError::Transport(e) => write!(f, "transport: {:?}", e),
            EspError::SessionInvariant {
                tid,
                expected,
                found,
            } => write!(
                f,
                "tid {} expected {:?} found {:?}",
                tid, expected, found
            ),
        }
    }
}

pub type EspResult<T = ()> = Result<T, EspError>;
