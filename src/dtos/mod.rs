pub mod reservation;
pub mod shop;
pub mod user;

use serde::Serialize;

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<shop::Pagination>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, count: None, pagination: None, data }
    }
}

impl<U> ApiResponse<Vec<U>> {
    pub fn list(data: Vec<U>) -> Self {
        Self { success: true, count: Some(data.len()), pagination: None, data }
    }

    pub fn paginated(data: Vec<U>, pagination: shop::Pagination) -> Self {
        Self { success: true, count: Some(data.len()), pagination: Some(pagination), data }
    }
}

#[derive(Debug, Serialize)]
pub struct Empty {}
