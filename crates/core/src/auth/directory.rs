//! [`UserDirectory`] backed by the identity module.

use async_trait::async_trait;
use beacon_domain::{BeaconError, IdentityKind, Module, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use super::ports::{NewUser, UserDirectory};
use crate::dispatch::{JsonParser, RequestDescriptor, RequestDispatcher};

/// Platform user type of an ordinary user account.
const USER_TYPE_USER: i64 = 6;

#[derive(Deserialize)]
struct CreatedUsers {
    #[serde(rename = "Data")]
    data: Vec<CreatedUser>,
}

#[derive(Deserialize)]
struct CreatedUser {
    #[serde(rename = "Id")]
    id: i64,
}

/// Creates users and assigns roles, authenticated as the application.
#[derive(Clone)]
pub struct PlatformUserDirectory {
    dispatcher: RequestDispatcher,
}

impl PlatformUserDirectory {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }
}

fn user_body(company_id: i64, user: &NewUser) -> serde_json::Value {
    let reference = match user.last_name.as_deref() {
        Some(last) if !last.is_empty() => format!("{}.{last}", user.first_name),
        _ => user.first_name.clone(),
    };
    let mut body = json!({
        "CompanyId": company_id,
        "Username": user.username,
        "Password": user.password,
        "FirstName": user.first_name,
        "LockingCount": 0,
        "Reference": reference,
        "IsActive": true,
        "MetaData": "",
        "UserTypeId": USER_TYPE_USER,
    });
    if let (Some(last), Some(map)) = (&user.last_name, body.as_object_mut()) {
        map.insert("LastName".to_owned(), json!(last));
    }
    body
}

#[async_trait]
impl UserDirectory for PlatformUserDirectory {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: &NewUser) -> Result<i64> {
        let company_id = self.dispatcher.config().company_id;
        let descriptor =
            RequestDescriptor::post(Module::Identity, format!("companies/{company_id}/users"))
                .with_json(user_body(company_id, user));

        let created: CreatedUsers = self
            .dispatcher
            .submit_with(IdentityKind::Application, descriptor, JsonParser::new())
            .await?;
        let id = created
            .data
            .first()
            .map(|user| user.id)
            .ok_or_else(|| BeaconError::Parse("user creation returned no data".into()))?;

        info!(user_id = id, "Platform user created");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn assign_role(&self, user_id: i64, role_id: i64) -> Result<()> {
        let project_id = self.dispatcher.config().project_id;
        let descriptor =
            RequestDescriptor::post(Module::Identity, format!("projects/{project_id}/assignrole"))
                .with_query("userid", user_id)
                .with_query("roleid", role_id);

        self.dispatcher.submit(IdentityKind::Application, descriptor).await?;
        info!("Role assigned");
        Ok(())
    }
}
