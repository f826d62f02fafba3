//! 사이클 통계 구조체.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 태스크 1회 실행 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleStats {
    /// 처리 대상 수 (전략 수, 종목 수)
    pub total: usize,
    /// 정상 처리 수
    pub success: usize,
    /// 에러 수
    pub errors: usize,
    /// 임계값 충족 수
    pub triggered: usize,
    /// 알림 메시지에 포함된 요약 수
    pub notified: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CycleStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            errors = self.errors,
            triggered = self.triggered,
            notified = self.notified,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.3}s", self.elapsed.as_secs_f64()),
            "사이클 완료"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let stats = CycleStats {
            total: 4,
            success: 3,
            errors: 1,
            ..Default::default()
        };
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
        assert_eq!(CycleStats::new().success_rate(), 0.0);
    }
}
