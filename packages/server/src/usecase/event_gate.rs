//! イベント処理の直列化
//!
//! Connection Handler の 1 ステップ（接続・参加・メッセージ・切断・掃除）は
//! ゲートを保持したまま最後まで実行されます。これにより各ステップは共有状態に対して
//! アトミックになり、同じルームへの通知は処理順に配信キューへ積まれます。
//! ステップ内でブロッキングな外部 I/O を待ってはいけません。

use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct EventGate {
    lock: Mutex<()>,
}

impl EventGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// ゲートに入る（ガードを破棄するまで他のステップは待機する）
    pub async fn enter(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}
