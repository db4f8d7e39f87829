use serde::Serialize;

pub mod candidate;
pub mod ranking;

/// `{ "data": ... }` envelope for successful JSON responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
