use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RayTracingError {
    #[error("solution index {index} out of range, only {count} solution(s) found")]
    SolutionIndexOutOfRange { index: usize, count: usize },
    #[error("point {point} has a non finite coordinate: {value}")]
    NonFiniteCoordinate { point: &'static str, value: f64 },
}
pub type Result<T> = std::result::Result<T, RayTracingError>;
