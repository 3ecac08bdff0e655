//! UseCase: ユースケースの外で起きたイベント処理エラーの記録

use std::sync::Arc;

use crate::domain::MetricsRecorder;

/// 不正なフレーム・ハンドラのパニック・遅い受信者の切断など、
/// 個々のユースケースが記録できないエラーをメトリクスに数えます。
pub struct ReportErrorUseCase {
    metrics: Arc<dyn MetricsRecorder>,
}

impl ReportErrorUseCase {
    pub fn new(metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self { metrics }
    }

    pub async fn execute(&self) {
        self.metrics.record_error().await;
    }
}
