//! InMemory Repository 実装
//!
//! HashMap をインメモリ DB として使用します。プロセス再起動をまたいだ永続化は行いません。

pub mod connection;
pub mod room;

pub use connection::InMemoryConnectionRepository;
pub use room::InMemoryRoomRegistry;
