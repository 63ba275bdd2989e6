//! 主机到固件的传输面
//!
//! 对应 esp_sip.c 中驱动核心调用的 sip_cmd / sip_tx_data_pkt_enqueue / sip_trigger_txq_process。
//! 总线（SDIO/SPI）与信用流控由实现方负责。

use axerrno::AxResult;
use skb::SkBuff;

use crate::cmd::SipCmd;

pub trait SipTransport {
    /// 下发一条控制命令
    fn send_cmd(&self, cmd: &SipCmd) -> AxResult<()>;

    /// 数据帧入发送队列（beacon、null-data、上层数据、缓存组播）
    fn tx_data_pkt_enqueue(&self, skb: SkBuff);

    /// 发送队列中尚未送出的数据帧数
    fn tx_data_pkt_queued(&self) -> usize;

    /// 触发一次发送队列处理
    fn trigger_txq_process(&self);
}
