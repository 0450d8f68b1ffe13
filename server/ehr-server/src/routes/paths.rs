//! Route path constants
//!
//! Every runtime route is registered from these constants so handlers, tests
//! and clients agree on one spelling.

/// API base path
pub const API: &str = "/api";

pub mod health {
    pub const HEALTH: &str = "/health";
}

pub mod patients {
    pub const SIGNUP: &str = "/api/patients/signup";
    pub const LOGIN: &str = "/api/patients/login";
    pub const ME: &str = "/api/patients/me";
    pub const PASSWORD: &str = "/api/patients/me/password";
}

pub mod doctors {
    pub const SIGNUP: &str = "/api/doctors/signup";
    pub const LOGIN: &str = "/api/doctors/login";
    pub const ME: &str = "/api/doctors/me";
    pub const PASSWORD: &str = "/api/doctors/me/password";
}

pub mod visits {
    pub const VISITS: &str = "/api/visits";
    pub const VISIT_BY_ID: &str = "/api/visits/:visit_id";
}

pub mod reports {
    pub const REPORTS: &str = "/api/reports";
}

pub mod queries {
    pub const QUERIES: &str = "/api/queries";
    pub const REPLY: &str = "/api/queries/:query_id/reply";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_routes_share_base() {
        for path in [
            patients::SIGNUP,
            doctors::ME,
            visits::VISIT_BY_ID,
            reports::REPORTS,
            queries::REPLY,
        ] {
            assert!(path.starts_with(API), "{path}");
        }
        assert!(!health::HEALTH.starts_with(API));
    }
}
