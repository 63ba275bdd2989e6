//! # sip: ESP 主机/固件串行接口协议（Serial Interface Protocol）
//!
//! - [cmd]：SIP_CMD_* 命令结构与序列化
//! - [evt]：SIP_EVT_* 事件解析（ROC、扫描结束）
//! - [transport]：[SipTransport]，驱动核心看到的命令与数据通道

#![cfg_attr(not(test), no_std)]

pub mod cmd;
pub mod evt;
pub mod transport;

pub use cmd::{
    AmpduActionCmd, BssInfoUpdate, Config, Roc, Scan, SetKey, SetSta, SetVif, SipCmd, WmmParams,
};
pub use evt::{SipEvtRoc, SipEvtScanDone, SIP_EVT_ROC, SIP_EVT_SCAN_DONE};
pub use transport::SipTransport;
