//! MessagePusher trait 定義
//!
//! クライアントへのメッセージ送信（ack の直接送信とブロードキャスト）の抽象化。
//! Connection Handler は送信手段そのものではなく、
//! 「接続 X へ送る」「指定した接続群へ配る」能力だけに依存します。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};

use super::{ConnectionId, MessagePushError, RelayEvent};

/// クライアントごとの送信チャンネル（エンコード済み JSON を流す）
///
/// キューは有限で、溢れた接続は「遅い受信者」として追い出されます。
/// 追い出しは [`PusherReceiver::evicted`] で受信側に通知されます。
#[derive(Debug, Clone)]
pub struct PusherChannel {
    sender: mpsc::Sender<String>,
    evicted: Arc<Notify>,
}

/// [`PusherChannel`] の受信側
#[derive(Debug)]
pub struct PusherReceiver {
    pub messages: mpsc::Receiver<String>,
    pub evicted: Arc<Notify>,
}

/// 容量 `capacity` の送信チャンネルを作成（0 は 1 として扱う）
pub fn pusher_channel(capacity: usize) -> (PusherChannel, PusherReceiver) {
    let (sender, messages) = mpsc::channel(capacity.max(1));
    let evicted = Arc::new(Notify::new());
    (
        PusherChannel {
            sender,
            evicted: evicted.clone(),
        },
        PusherReceiver { messages, evicted },
    )
}

impl PusherChannel {
    /// 待たずにキューへ積む
    pub fn try_send(&self, content: String) -> Result<(), mpsc::error::TrySendError<String>> {
        self.sender.try_send(content)
    }

    /// 受信側へ追い出しを通知
    pub fn evict(&self) {
        self.evicted.notify_one();
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// クライアントの送信チャンネルを登録
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// クライアントの送信チャンネルを登録解除
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 特定のクライアントへエンコード済みのメッセージを送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 複数のクライアントへイベントを配信
    ///
    /// 一部の送信失敗は許容し、実際に配信できた数を返します。
    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &RelayEvent,
    ) -> Result<usize, MessagePushError>;
}
