use super::{Count, NewId};
use crate::domain;
use crate::domain::user::driven_ports::{NewUserRecord, StoredCredentials};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};
use sqlx::{FromRow, query_as};

pub struct DbDetectUser;

impl domain::user::driven_ports::DetectUser for DbDetectUser {
    async fn login_exists(
        &self,
        login: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let user_with_login_count = query_as::<_, Count>(
            "SELECT count(*) AS count FROM todo_user tu WHERE tu.login = $1",
        )
        .bind(login)
        .fetch_one(connection.borrow_connection())
        .await
        .context("Detecting user with login")?;

        Ok(user_with_login_count.count() > 0)
    }
}

pub struct DbReadUsers;

#[derive(FromRow)]
struct CredentialsRow {
    id: i32,
    password_digest: String,
}

impl From<CredentialsRow> for StoredCredentials {
    fn from(value: CredentialsRow) -> Self {
        StoredCredentials {
            user_id: value.id,
            password_digest: value.password_digest,
        }
    }
}

impl domain::user::driven_ports::UserReader for DbReadUsers {
    async fn credentials_by_login(
        &self,
        login: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<StoredCredentials>, Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let credentials = query_as::<_, CredentialsRow>(
            "SELECT tu.id, tu.password_digest FROM todo_user tu WHERE tu.login = $1",
        )
        .bind(login)
        .fetch_optional(cxn_handle.borrow_connection())
        .await
        .context("Fetching credentials by login")?;

        Ok(credentials.map(StoredCredentials::from))
    }

    async fn user_id_by_login(
        &self,
        login: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<i32>, Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let user = query_as::<_, NewId>("SELECT tu.id FROM todo_user tu WHERE tu.login = $1")
            .bind(login)
            .fetch_optional(cxn_handle.borrow_connection())
            .await
            .context("Fetching user id by login")?;

        Ok(user.map(|row| row.id))
    }
}

pub struct DbWriteUsers;

impl domain::user::driven_ports::UserWriter for DbWriteUsers {
    async fn create_user(
        &self,
        user: &NewUserRecord<'_>,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<i32>, Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let insert_result = query_as::<_, NewId>(
            "INSERT INTO todo_user(name, login, password_digest) VALUES ($1, $2, $3) RETURNING todo_user.id",
        )
        .bind(user.name)
        .bind(user.login)
        .bind(user.password_digest)
        .fetch_one(cxn_handle.borrow_connection())
        .await;

        match insert_result {
            Ok(new_user) => Ok(Some(new_user.id)),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(None),
            Err(insert_err) => Err(insert_err).context("Inserting new user"),
        }
    }
}
