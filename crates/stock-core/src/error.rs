//! 저장소 계층 에러 타입.

use thiserror::Error;

/// 시계열/관계형 저장소 및 시세 클라이언트 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 저장소가 쿼리를 거부함 (문법 오류, 존재하지 않는 측정값 등)
    #[error("쿼리 실패: {0}")]
    Query(String),

    /// 응답 파싱 에러
    #[error("파싱 에러: {0}")]
    Parse(String),

    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),

    /// 기타 에러
    #[error("기타 에러: {0}")]
    Other(String),
}
