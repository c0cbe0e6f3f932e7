use serde::{Deserialize, Serialize};

use crate::{
    audits::dto::AuditView,
    auth::dto::{Profile, PublicUser},
};

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PageInfo {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
}

impl PageInfo {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page,
            per_page,
            total,
            pages: (total + per_page - 1) / per_page,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<Profile>,
    pub pagination: PageInfo,
}

#[derive(Debug, Serialize)]
pub struct UserAuditsResponse {
    pub user: PublicUser,
    pub audits: Vec<AuditView>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(PageInfo::new(1, 20, 0).pages, 0);
        assert_eq!(PageInfo::new(1, 20, 20).pages, 1);
        assert_eq!(PageInfo::new(2, 20, 41).pages, 3);
    }
}
