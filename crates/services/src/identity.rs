//! Who is playing. Authentication happens elsewhere; services only need the
//! current user's id, if any.

use quiz_core::model::UserId;

pub trait CurrentUser: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// A fixed, already authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedInUser(UserId);

impl SignedInUser {
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self(id)
    }
}

impl CurrentUser for SignedInUser {
    fn current_user_id(&self) -> Option<UserId> {
        Some(self.0)
    }
}

/// Nobody is signed in. Themes can be browsed and played, nothing is recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl CurrentUser for Anonymous {
    fn current_user_id(&self) -> Option<UserId> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_report_their_user() {
        let id = UserId::generate();
        assert_eq!(SignedInUser::new(id).current_user_id(), Some(id));
        assert_eq!(Anonymous.current_user_id(), None);
    }
}
