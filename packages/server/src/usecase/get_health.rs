//! UseCase: ヘルスチェック

use std::sync::Arc;

use crate::domain::{Room, RoomRegistry};

/// ヘルスチェックのユースケース
///
/// 読み取りのみで、ルームの状態を変更しません。
pub struct GetHealthUseCase {
    rooms: Arc<dyn RoomRegistry>,
}

impl GetHealthUseCase {
    pub fn new(rooms: Arc<dyn RoomRegistry>) -> Self {
        Self { rooms }
    }

    /// 現在のルーム一覧（ID 順）を取得
    pub async fn execute(&self) -> Vec<Room> {
        self.rooms.list_rooms().await
    }
}
