//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Role resolved from the caller's session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    OperadorLab,
    OperadorCampo,
    Viewer,
    #[default]
    None,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::OperadorLab => "operador_lab",
            Role::OperadorCampo => "operador_campo",
            Role::Viewer => "viewer",
            Role::None => "none",
        }
    }

    /// Unknown role claims resolve to `None`
    pub fn from_claim(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            "operador_lab" => Role::OperadorLab,
            "operador_campo" => Role::OperadorCampo,
            "viewer" => Role::Viewer,
            _ => Role::None,
        }
    }

    pub fn can_view(&self) -> bool {
        !matches!(self, Role::None)
    }

    /// Create, start, complete and cancel production runs
    pub fn can_operate_production(&self) -> bool {
        matches!(self, Role::Admin | Role::OperadorLab | Role::OperadorCampo)
    }

    /// Edit recipes and mixes, record laboratory stock movements
    pub fn can_manage_lab(&self) -> bool {
        matches!(self, Role::Admin | Role::OperadorLab)
    }

    /// Projects, the input catalog and ledger adjustments
    pub fn can_administer(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, 200))
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_claim() {
        assert_eq!(Role::from_claim("operador_lab"), Role::OperadorLab);
        assert_eq!(Role::from_claim("superuser"), Role::None);
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Admin.can_administer());
        assert!(!Role::OperadorLab.can_administer());
        assert!(Role::OperadorCampo.can_operate_production());
        assert!(!Role::OperadorCampo.can_manage_lab());
        assert!(Role::Viewer.can_view());
        assert!(!Role::Viewer.can_operate_production());
        assert!(!Role::None.can_view());
    }

    #[test]
    fn test_pagination_offset() {
        let p = Pagination { page: 3, per_page: 20 };
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 40);

        let p = Pagination { page: 0, per_page: 1000 };
        assert_eq!(p.limit(), 200);
        assert_eq!(p.offset(), 0);
    }
}
