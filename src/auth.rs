use crate::store::UserId;

/// Where the host learns who is signed in. `None` means no session may run;
/// the host redirects to sign-in instead of starting the evaluator.
pub trait IdentityProvider {
    fn current_user(&self) -> Option<UserId>;
}

/// Identity resolved once at startup, from a CLI override or the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigIdentity {
    username: Option<String>,
}

impl ConfigIdentity {
    pub fn new(username: Option<String>) -> Self {
        Self { username }
    }
}

impl IdentityProvider for ConfigIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
}

/// Allow-list gate in front of screens that need a signed-in user.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    protected: Vec<String>,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            protected: ["play", "history", "profile"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RouteGuard {
    pub fn new<I, S>(protected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            protected: protected.into_iter().map(Into::into).collect(),
        }
    }

    pub fn check(&self, route: &str, identity: &dyn IdentityProvider) -> Access {
        let is_protected = self.protected.iter().any(|p| route.starts_with(p.as_str()));
        if is_protected && identity.current_user().is_none() {
            Access::Denied
        } else {
            Access::Granted
        }
    }
}
