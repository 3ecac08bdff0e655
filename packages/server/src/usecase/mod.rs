//! UseCase 層
//!
//! Connection Handler の各操作（接続・参加・メッセージ・切断・掃除）と、
//! ヘルスチェック・メトリクスの読み取りを 1 ユースケース 1 構造体で実装します。

mod connect_connection;
mod context;
mod disconnect_connection;
mod error;
mod event_gate;
mod get_health;
mod get_metrics;
mod join_room;
mod report_error;
mod send_message;
mod sweep;

pub use connect_connection::ConnectUseCase;
pub use context::{RelayContext, RelayUseCases};
pub use disconnect_connection::{DisconnectOutcome, DisconnectUseCase};
pub use error::{ConnectError, DisconnectError, JoinRoomError, SendMessageError};
pub use event_gate::EventGate;
pub use get_health::GetHealthUseCase;
pub use get_metrics::{GetMetricsUseCase, MetricsReport};
pub use join_room::{JoinOutcome, JoinRoomUseCase};
pub use report_error::ReportErrorUseCase;
pub use send_message::{SendMessageCommand, SendMessageUseCase, SentMessage};
pub use sweep::{ROOM_SWEEP_BATCH_SIZE, SweepUseCase};
