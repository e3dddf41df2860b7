use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::{QueryCache, QueryKey};
use crate::client::UserApi;
use crate::error::{Result, UsersError};
use crate::form::{Field, Form};
use crate::types::{User, UserFields};

/// Attempts at finding an id that is not already in the cached list.
const MAX_ID_ATTEMPTS: usize = 8;

/// Whether the form is creating a new record or editing an existing one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FormMode {
    #[default]
    Idle,
    Editing(User),
}

/// Outcome of a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Created(User),
    Updated(User),
}

type IdGenerator = Box<dyn FnMut() -> String + Send>;

pub struct UserSync<A, C> {
    api: A,
    cache: C,
    form: Form,
    mode: FormMode,
    new_id: IdGenerator,
}

impl<A: UserApi, C: QueryCache> UserSync<A, C> {
    pub fn new(api: A, cache: C) -> Self {
        Self {
            api,
            cache,
            form: Form::user_form(),
            mode: FormMode::Idle,
            new_id: Box::new(|| Uuid::new_v4().to_string()),
        }
    }

    /// Replace the random id source, mainly for deterministic tests.
    pub fn with_id_generator(mut self, generator: impl FnMut() -> String + Send + 'static) -> Self {
        self.new_id = Box::new(generator);
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn editing(&self) -> Option<&User> {
        match &self.mode {
            FormMode::Editing(user) => Some(user),
            FormMode::Idle => None,
        }
    }

    pub fn set_value(&mut self, field: Field, value: impl Into<String>) {
        self.form.set_value(field, value);
    }

    /// The user list, from cache when fresh, otherwise from the server.
    pub async fn users(&self) -> Result<Vec<User>> {
        let key = QueryKey::users();

        if let Some(entry) = self.cache.read(&key) {
            if !entry.stale {
                match serde_json::from_value(entry.value) {
                    Ok(users) => {
                        debug!("Serving {key} from cache");
                        return Ok(users);
                    }
                    Err(e) => debug!("Cached {key} is malformed ({e}), refetching"),
                }
            }
        }

        let generation = self.cache.generation(&key);
        let users = self.api.list_users().await?;
        self.cache
            .write_if_current(&key, serde_json::to_value(&users)?, generation);
        Ok(users)
    }

    pub async fn find_user(&self, id: &str) -> Result<User> {
        self.users()
            .await?
            .into_iter()
            .find(|u| u.id == id)
            .ok_or_else(|| UsersError::UserNotFound(id.to_string()))
    }

    /// Load a record into the form for editing. Anything typed so far is
    /// overwritten.
    pub fn edit_load(&mut self, user: User) {
        debug!(id = %user.id, "Editing user");
        self.form.load(&user.fields());
        self.mode = FormMode::Editing(user);
    }

    /// Drop unsaved input and leave edit mode.
    pub fn cancel_edit(&mut self) {
        self.form.reset();
        self.mode = FormMode::Idle;
    }

    /// Validate the form, then update the record under edit or create a new
    /// one. Invalid forms never reach the server.
    pub async fn submit(&mut self) -> Result<Submitted> {
        let fields = self.form.handle_submit().map_err(|errors| {
            debug!(invalid = errors.len(), "Form rejected");
            UsersError::Validation(errors)
        })?;

        match self.editing().map(|user| user.id.clone()) {
            Some(id) => self.update(&id, fields).await.map(Submitted::Updated),
            None => self.create(fields).await.map(Submitted::Created),
        }
    }

    pub async fn create(&mut self, fields: UserFields) -> Result<User> {
        let id = self.generate_id()?;
        let user = fields.with_id(id);
        debug!(?user, "Creating user");

        match self.api.create_user(&user).await {
            Ok(created) => {
                info!(id = %user.id, "Created user");
                self.cache.invalidate(&QueryKey::users());
                self.form.reset();
                Ok(created)
            }
            Err(e) => {
                debug!(id = %user.id, error = %e, "Failed to create user");
                Err(e)
            }
        }
    }

    pub async fn update(&mut self, id: &str, fields: UserFields) -> Result<User> {
        debug!(id, ?fields, "Updating user");

        match self.api.update_user(id, &fields).await {
            Ok(updated) => {
                info!(id, "Updated user");
                self.cache
                    .write(&QueryKey::random(), json!({ "value": "Some random data" }));
                self.cache.invalidate(&QueryKey::users());
                self.form.reset();
                self.mode = FormMode::Idle;
                Ok(updated)
            }
            Err(e) => {
                debug!(id, error = %e, "Failed to update user");
                Err(e)
            }
        }
    }

    /// Delete a record. Deleting the record under edit also leaves edit mode.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        debug!(id, "Deleting user");

        match self.api.delete_user(id).await {
            Ok(()) => {
                info!(id, "Deleted user");
                self.cache.invalidate(&QueryKey::users());
                if self.editing().is_some_and(|user| user.id == id) {
                    self.cancel_edit();
                }
                Ok(())
            }
            Err(e) => {
                debug!(id, error = %e, "Failed to delete user");
                Err(e)
            }
        }
    }

    /// A fresh id that does not collide with any cached record.
    fn generate_id(&mut self) -> Result<String> {
        let known: Vec<String> = self
            .cache
            .read(&QueryKey::users())
            .and_then(|entry| serde_json::from_value::<Vec<User>>(entry.value).ok())
            .map(|users| users.into_iter().map(|u| u.id).collect())
            .unwrap_or_default();

        let mut id = (self.new_id)();
        for _ in 1..MAX_ID_ATTEMPTS {
            if !known.contains(&id) {
                break;
            }
            debug!(%id, "Generated id already in use, retrying");
            id = (self.new_id)();
        }

        if known.contains(&id) {
            return Err(UsersError::IdCollision(id));
        }
        Ok(id)
    }
}
