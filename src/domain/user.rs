use crate::domain::user::driving_ports::{LoginError, RegisterUserError};
use crate::external_connections::{
    ExternalConnectivity, TransactableExternalConnectivity, TransactionHandle,
};
use anyhow::Context;
use tracing::{error, info};

/// Data needed to register a new account
#[derive(Debug)]
#[cfg_attr(test, derive(Clone, PartialEq, Eq))]
pub struct CreateUser {
    pub name: String,
    pub login: String,
    pub password: String,
}

/// Login and password supplied by someone trying to sign in
#[cfg_attr(test, derive(Debug, Clone, PartialEq, Eq))]
pub struct UserCredentials {
    pub login: String,
    pub password: String,
}

/// Bearer token handed back after a successful login
#[derive(Debug)]
#[cfg_attr(test, derive(Clone, PartialEq, Eq))]
pub struct UserToken {
    pub token: String,
}

/// Logins are compared without surrounding whitespace and without regard to case
pub fn normalize_login(login: &str) -> String {
    login.trim().to_lowercase()
}

pub mod driven_ports {
    use super::*;

    /// A user row ready to be persisted. The password has already been digested.
    pub struct NewUserRecord<'data> {
        pub name: &'data str,
        pub login: &'data str,
        pub password_digest: &'data str,
    }

    /// The parts of a stored user needed to check a password
    #[derive(Debug, Clone)]
    pub struct StoredCredentials {
        pub user_id: i32,
        pub password_digest: String,
    }

    pub trait UserReader {
        async fn credentials_by_login(
            &self,
            login: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<StoredCredentials>, anyhow::Error>;

        async fn user_id_by_login(
            &self,
            login: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<i32>, anyhow::Error>;
    }

    pub trait UserWriter {
        /// Inserts the user and returns its ID, or `None` when another user already holds the login
        async fn create_user(
            &self,
            user: &NewUserRecord<'_>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<i32>, anyhow::Error>;
    }

    pub trait DetectUser {
        async fn login_exists(
            &self,
            login: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }

    /// One-way password digests
    pub trait PasswordDigest {
        fn digest(&self, password: &str) -> Result<String, anyhow::Error>;
        fn matches(&self, password: &str, digest: &str) -> Result<bool, anyhow::Error>;
    }

    /// Signs bearer tokens identifying a user
    pub trait IssueToken {
        fn issue_token(&self, user_id: i32, login: &str) -> Result<String, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum RegisterUserError {
        #[error("The provided login is already registered.")]
        LoginAlreadyExists,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    #[derive(Debug, Error)]
    pub enum LoginError {
        #[error("Authentication failed: invalid credentials.")]
        InvalidCredentials,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }


    pub trait UserPort {
        async fn register(
            &self,
            new_user: &CreateUser,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            u_detect: &impl driven_ports::DetectUser,
            u_writer: &impl driven_ports::UserWriter,
            hasher: &impl driven_ports::PasswordDigest,
        ) -> Result<i32, RegisterUserError>;

        async fn verify_credentials(
            &self,
            credentials: &UserCredentials,
            ext_cxn: &mut impl ExternalConnectivity,
            u_reader: &impl driven_ports::UserReader,
            hasher: &impl driven_ports::PasswordDigest,
        ) -> Result<(), LoginError>;

        /// Returns 0 when no user has the login
        async fn find_user_id(
            &self,
            login: &str,
            ext_cxn: &mut impl ExternalConnectivity,
            u_reader: &impl driven_ports::UserReader,
        ) -> Result<i32, anyhow::Error>;

        fn issue_token(
            &self,
            user_id: i32,
            login: &str,
            issuer: &impl driven_ports::IssueToken,
        ) -> Result<UserToken, anyhow::Error>;
    }
}

pub struct UserService {}

impl driving_ports::UserPort for UserService {
    async fn register(
        &self,
        new_user: &CreateUser,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        u_detect: &impl driven_ports::DetectUser,
        u_writer: &impl driven_ports::UserWriter,
        hasher: &impl driven_ports::PasswordDigest,
    ) -> Result<i32, RegisterUserError> {
        let login = normalize_login(&new_user.login);
        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting user registration")?;

        let login_taken = u_detect
            .login_exists(&login, &mut txn)
            .await
            .context("Looking up login during registration")?;
        if login_taken {
            info!("Rejected registration for existing login {login}");
            return Err(RegisterUserError::LoginAlreadyExists);
        }

        let password_digest = hasher
            .digest(&new_user.password)
            .context("digesting password for new user")?;
        let record = driven_ports::NewUserRecord {
            name: &new_user.name,
            login: &login,
            password_digest: &password_digest,
        };
        let created_id = u_writer
            .create_user(&record, &mut txn)
            .await
            .context("Trying to create user at service level")?;
        // A concurrent registration can claim the login after the check above
        let Some(user_id) = created_id else {
            info!("Login {login} was claimed while registering");
            return Err(RegisterUserError::LoginAlreadyExists);
        };

        txn.commit().await.context("saving new user")?;
        Ok(user_id)
    }

    async fn verify_credentials(
        &self,
        credentials: &UserCredentials,
        ext_cxn: &mut impl ExternalConnectivity,
        u_reader: &impl driven_ports::UserReader,
        hasher: &impl driven_ports::PasswordDigest,
    ) -> Result<(), LoginError> {
        let login = normalize_login(&credentials.login);
        let stored_result = u_reader.credentials_by_login(&login, ext_cxn).await;
        if let Err(ref port_err) = stored_result {
            error!("Credential lookup failure: {port_err}");
        }

        let Some(stored) = stored_result.context("looking up credentials")? else {
            return Err(LoginError::InvalidCredentials);
        };

        if hasher.matches(&credentials.password, &stored.password_digest)? {
            Ok(())
        } else {
            Err(LoginError::InvalidCredentials)
        }
    }

    async fn find_user_id(
        &self,
        login: &str,
        ext_cxn: &mut impl ExternalConnectivity,
        u_reader: &impl driven_ports::UserReader,
    ) -> Result<i32, anyhow::Error> {
        let user_id = u_reader
            .user_id_by_login(&normalize_login(login), ext_cxn)
            .await
            .context("Looking up user id by login")?;

        Ok(user_id.unwrap_or(0))
    }

    fn issue_token(
        &self,
        user_id: i32,
        login: &str,
        issuer: &impl driven_ports::IssueToken,
    ) -> Result<UserToken, anyhow::Error> {
        let token = issuer
            .issue_token(user_id, &normalize_login(login))
            .context("issuing bearer token")?;

        Ok(UserToken { token })
    }
}
