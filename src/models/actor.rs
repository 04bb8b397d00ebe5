//! Actor autenticado
//!
//! Identidad que entrega el proveedor de sesión (token Bearer) y que
//! consumen todas las operaciones que mutan estado.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles del sistema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Customer,
    Driver,
    Admin,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Customer => "customer",
            ActorRole::Driver => "driver",
            ActorRole::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(ActorRole::Customer),
            "driver" => Some(ActorRole::Driver),
            "admin" => Some(ActorRole::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: ActorRole) -> Self {
        Self { user_id, role }
    }

    pub fn customer(user_id: Uuid) -> Self {
        Self::new(user_id, ActorRole::Customer)
    }

    pub fn driver(user_id: Uuid) -> Self {
        Self::new(user_id, ActorRole::Driver)
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self::new(user_id, ActorRole::Admin)
    }

    pub fn is_customer(&self) -> bool {
        self.role == ActorRole::Customer
    }

    pub fn is_driver(&self) -> bool {
        self.role == ActorRole::Driver
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_names() {
        for role in [ActorRole::Customer, ActorRole::Driver, ActorRole::Admin] {
            assert_eq!(ActorRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(ActorRole::from_str("livreur"), None);
    }
}
