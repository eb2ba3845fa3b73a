// Controller path tables
//
// The same endpoint lives under two prefixes depending on the controller
// platform. Rather than probing the platform up front, every operation
// walks both candidates in a fixed order and lets 404 select the one that
// exists.

/// The platform variants a controller may present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControllerPlatform {
    /// UniFi OS device (UDM, UCG, etc.) -- `/proxy/network/` prefix.
    UnifiOs,
    /// Standalone Network Application -- no prefix.
    ClassicController,
}

impl ControllerPlatform {
    /// Candidate order: newer platform first.
    pub(crate) const ALL: [Self; 2] = [Self::UnifiOs, Self::ClassicController];

    /// Prefix in front of `/api/...` for this platform.
    pub(crate) fn legacy_prefix(self) -> &'static str {
        match self {
            Self::UnifiOs => "/proxy/network",
            Self::ClassicController => "",
        }
    }
}

/// Login endpoints, tried in order.
pub const LOGIN_PATHS: [&str; 3] = [
    "/proxy/network/api/auth/login",
    "/api/auth/login",
    "/api/login",
];

/// Logout endpoints, tried in order.
pub const LOGOUT_PATHS: [&str; 3] = [
    "/proxy/network/api/auth/logout",
    "/api/auth/logout",
    "/api/logout",
];

/// Site-scoped candidates: `{prefix}/api/s/{site}/{suffix}` for every platform.
pub fn site_paths(site: &str, suffix: &str) -> Vec<String> {
    ControllerPlatform::ALL
        .iter()
        .map(|p| format!("{}/api/s/{site}/{suffix}", p.legacy_prefix()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_paths_try_proxy_prefix_first() {
        assert_eq!(
            site_paths("default", "stat/device"),
            vec![
                "/proxy/network/api/s/default/stat/device".to_owned(),
                "/api/s/default/stat/device".to_owned(),
            ]
        );
    }
}
