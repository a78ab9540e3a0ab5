use std::fmt;

/// Server-assigned (or locally synthesized) user identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Company {
    pub name: String,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A user record as held by the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub company: Company,
}

impl User {
    /// Company label for display; empty names render as `N/A`.
    pub fn company_label(&self) -> &str {
        if self.company.name.trim().is_empty() {
            "N/A"
        } else {
            &self.company.name
        }
    }

    /// Merge a partial update over this record. `id` is never touched.
    pub fn apply_patch(&mut self, patch: UserPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(company) = patch.company {
            self.company = company;
        }
    }
}

/// Candidate record without identity: the editor's working copy and the
/// payload of create/update requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub company: Company,
}

impl UserDraft {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        company: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            company: Company::new(company),
        }
    }

    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            company: self.company,
        }
    }

    /// Overlay the fields the remote echoed back.
    pub fn merge(mut self, patch: UserPatch) -> Self {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(company) = patch.company {
            self.company = company;
        }
        self
    }

    pub fn into_patch(self) -> UserPatch {
        UserPatch {
            name: Some(self.name),
            email: Some(self.email),
            company: Some(self.company),
        }
    }
}

impl From<&User> for UserDraft {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            company: user.company.clone(),
        }
    }
}

/// Partial update data for a user
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<Company>,
}

impl UserPatch {
    /// Fields set in `other` win.
    pub fn overlay(mut self, other: UserPatch) -> Self {
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.email.is_some() {
            self.email = other.email;
        }
        if other.company.is_some() {
            self.company = other.company;
        }
        self
    }
}

/// What the remote echoes back from create/update: whatever fields it
/// chose to return, and an id it may or may not have assigned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteUser {
    pub id: Option<UserId>,
    pub fields: UserPatch,
}
