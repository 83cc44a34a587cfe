// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// 协作式停止信号
///
/// 只会被设置一次；工作循环在每次迭代开始时检查，当前处理中的工作项总会完成。
#[derive(Clone, Debug)]
pub struct StopSignal {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// 请求停止
    pub fn stop(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.receiver.borrow()
    }

    /// 休眠指定时长，收到停止信号时提前返回
    ///
    /// # 返回值
    ///
    /// 如果因停止信号而提前返回则为 true
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_stopped() {
            return true;
        }
        let mut receiver = self.receiver.clone();
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_stopped(),
            _ = receiver.wait_for(|stopped| *stopped) => true,
        }
    }
}
