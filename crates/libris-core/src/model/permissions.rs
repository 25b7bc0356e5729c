use serde::{Deserialize, Serialize};

/// Read access to the book catalog
pub const BOOKS_READ: &str = "books:read";

/// Create, update and delete access to the book catalog
pub const BOOKS_WRITE: &str = "books:write";

/// Permission codes held by one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(Vec<String>);

impl Permissions {
    pub fn new(codes: Vec<String>) -> Self {
        Self(codes)
    }

    /// True if `code` is one of the held codes
    pub fn include(&self, code: &str) -> bool {
        self.0.iter().any(|c| c == code)
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_codes(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for Permissions {
    fn from(codes: Vec<String>) -> Self {
        Self(codes)
    }
}

/// Permission codes attached to a user id, as handed to storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissions {
    pub user_id: i64,
    pub codes: Permissions,
}

impl UserPermissions {
    pub fn new(user_id: i64, codes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            user_id,
            codes: Permissions(codes.into_iter().map(Into::into).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include() {
        let perms = Permissions::new(vec![BOOKS_READ.to_string()]);
        assert!(perms.include(BOOKS_READ));
        assert!(!perms.include(BOOKS_WRITE));
        assert!(!Permissions::default().include(BOOKS_READ));
    }

    #[test]
    fn test_json_is_a_flat_list() {
        let perms = Permissions::new(vec![BOOKS_READ.into(), BOOKS_WRITE.into()]);
        assert_eq!(
            serde_json::to_string(&perms).unwrap(),
            r#"["books:read","books:write"]"#
        );
    }

    #[test]
    fn test_user_permissions_new() {
        let up = UserPermissions::new(3, [BOOKS_READ]);
        assert_eq!(up.user_id, 3);
        assert_eq!(up.codes.codes(), &[BOOKS_READ.to_string()]);
    }
}
