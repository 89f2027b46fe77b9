use crate::domain::UserId;

// ============== Authorization ==============

/// Single-admin authorization gate.
///
/// Fails closed: with no configured admin nobody is authorized. Widening this
/// to several admins only means turning `admin` into a set.
#[derive(Clone, Debug, Default)]
pub struct AdminGate {
    admin: Option<String>,
}

impl AdminGate {
    pub fn new(admin: Option<String>) -> Self {
        let admin = admin
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if admin.is_none() {
            tracing::error!("ADMIN_USER_ID is not set; every command will be refused");
        }
        Self { admin }
    }

    pub fn is_configured(&self) -> bool {
        self.admin.is_some()
    }

    pub fn is_admin(&self, user_id: Option<UserId>) -> bool {
        let (Some(admin), Some(user_id)) = (self.admin.as_deref(), user_id) else {
            return false;
        };
        user_id.0.to_string() == admin
    }
}
