use std::fmt;

/// User aggregate entity.
///
/// Represents a registered user as stored by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password_hash: String,
}

/// User unique identifier type, assigned by the directory on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// User fields ready to be persisted; the password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    /// Attach the identifier the directory assigned.
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            phone: self.phone,
            email: self.email,
            password_hash: self.password_hash,
        }
    }
}

/// Command to register a new user
#[derive(Debug)]
pub struct RegisterUserCommand {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
}

impl RegisterUserCommand {
    /// Construct a new register user command.
    ///
    /// # Arguments
    /// * `name` - Display name
    /// * `phone` - Phone number
    /// * `email` - Email address used as login
    /// * `password` - Plain text password (will be hashed by service)
    pub fn new(name: String, phone: String, email: String, password: String) -> Self {
        Self {
            name,
            phone,
            email,
            password,
        }
    }
}

/// Command to log in with email and password
#[derive(Debug)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

/// Successful login: the user and a freshly issued session token
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub token: String,
}
