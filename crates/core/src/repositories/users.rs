use crate::auth::{hash_password, verify_password, Actor};
use crate::models::{Role, User, UserSummary};
use crate::validation::present;
use crate::{CoreContext, HmsError, HmsResult};
use api_shared::{LoginReq, LoginRes, RegisterReq, RegisterRes, RegisteredUser, SessionUser};
use chrono::Utc;
use hms_types::EmailAddress;
use hms_uuid::RecordId;
use std::collections::BTreeMap;

/// Login, registration and account queries.
#[derive(Clone, Debug)]
pub struct UserService {
    ctx: CoreContext,
}

impl UserService {
    pub fn new(ctx: CoreContext) -> Self {
        Self { ctx }
    }

    /// Exchanges a username or email plus password for a bearer token.
    ///
    /// Identifiers containing `@` are looked up by email, anything else by username.
    ///
    /// # Errors
    ///
    /// - [`HmsError::InvalidInput`] (`Missing fields`) if either field is blank.
    /// - [`HmsError::Unauthenticated`] (`Invalid credentials`) for an unknown account or a
    ///   wrong password. The two cases are indistinguishable to the caller.
    pub fn login(&self, req: &LoginReq) -> HmsResult<LoginRes> {
        let missing = || HmsError::InvalidInput("Missing fields".into());
        let identifier = present(&req.username_or_email).ok_or_else(missing)?;
        let password = req
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(missing)?;

        let user = {
            let tables = self.ctx.store().read()?;
            if identifier.contains('@') {
                EmailAddress::parse(identifier)
                    .ok()
                    .and_then(|email| tables.user_by_email(&email))
                    .cloned()
            } else {
                tables.user_by_username(identifier).cloned()
            }
        };

        let invalid = || HmsError::Unauthenticated("Invalid credentials".into());
        let user = user.ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash) {
            tracing::warn!(user_id = %user.id, "login rejected: wrong password");
            return Err(invalid());
        }

        let token = self.ctx.signer().issue(&user)?;
        tracing::info!(user_id = %user.id, role = %user.role, "login succeeded");
        Ok(LoginRes {
            token,
            user: SessionUser {
                email: user.email.map(|e| e.to_string()),
                role: user.role.to_string(),
                username: user.username,
            },
        })
    }

    /// Verifies a bearer token and returns the caller it identifies.
    pub fn authenticate(&self, token: &str) -> HmsResult<Actor> {
        self.ctx.signer().verify(token).map(Actor::from)
    }

    /// Creates an email-identified account with any role.
    pub fn register(&self, req: &RegisterReq) -> HmsResult<RegisterRes> {
        let (Some(email), Some(password), Some(role)) = (
            present(&req.email),
            req.password.as_deref().filter(|p| !p.is_empty()),
            present(&req.role),
        ) else {
            return Err(HmsError::InvalidInput("Missing fields".into()));
        };
        let role: Role = role.parse()?;
        let email = EmailAddress::parse(email)?;
        let password_hash = hash_password(password, self.ctx.cfg().password_iterations());

        let mut tables = self.ctx.store().write()?;
        if tables.user_by_email(&email).is_some() {
            return Err(HmsError::Conflict("User already exists".into()));
        }
        let user = User {
            id: RecordId::new(),
            username: None,
            email: Some(email.clone()),
            password_hash,
            role,
            doctor_id: None,
            patient_id: None,
            created_at: Utc::now(),
        };
        tables.users.put(user.clone())?;
        tracing::info!(user_id = %user.id, %role, "user registered");

        Ok(RegisterRes {
            message: "User registered".into(),
            user: RegisteredUser {
                email: email.to_string(),
                role: role.to_string(),
            },
        })
    }

    /// Ids of doctor records that already have a login account, each mapped to `true`.
    pub fn generated_doctor_credentials(&self) -> HmsResult<BTreeMap<String, bool>> {
        let tables = self.ctx.store().read()?;
        Ok(tables
            .users
            .iter()
            .filter(|u| u.role == Role::Doctor)
            .filter_map(|u| u.doctor_id)
            .map(|id| (id.to_string(), true))
            .collect())
    }

    /// Ids of patient records that already have a login account, each mapped to `true`.
    pub fn generated_patient_credentials(&self) -> HmsResult<BTreeMap<String, bool>> {
        let tables = self.ctx.store().read()?;
        Ok(tables
            .users
            .iter()
            .filter(|u| u.role == Role::Patient)
            .filter_map(|u| u.patient_id)
            .map(|id| (id.to_string(), true))
            .collect())
    }

    /// Accounts newest first, without password hashes.
    pub fn list(&self, limit: Option<usize>) -> HmsResult<Vec<UserSummary>> {
        let tables = self.ctx.store().read()?;
        let mut users: Vec<&User> = tables.users.iter().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(User::summary)
            .collect())
    }
}
