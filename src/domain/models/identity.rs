#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;

use super::Approach;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub display_name: String,
    /// Raw role claim as issued by the identity provider.
    pub roles: String,
}

impl Identity {
    pub fn role(&self) -> Role {
        return Role::from_claim(&self.roles);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
pub enum Role {
    Lecturer,
    Student,
    NoAccess,
}

impl Role {
    pub fn from_claim(claim: &str) -> Role {
        if claim.contains("Lecturer") {
            return Role::Lecturer;
        }
        if claim.contains("Student") {
            return Role::Student;
        }

        return Role::NoAccess;
    }

    pub fn can_use(&self, approach: Approach) -> bool {
        match self {
            Role::Lecturer => return true,
            Role::Student => return approach == Approach::DocSearch,
            Role::NoAccess => return false,
        }
    }

    pub fn can_delete(&self) -> bool {
        return *self == Role::Lecturer;
    }
}
