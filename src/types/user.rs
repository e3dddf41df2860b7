use serde::{Deserialize, Serialize};

/// A user record as exchanged with the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub birthday: String,
}

/// The editable fields of a user, without its id.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFields {
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub birthday: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.fname, self.lname)
    }

    pub fn fields(&self) -> UserFields {
        UserFields {
            fname: self.fname.clone(),
            lname: self.lname.clone(),
            email: self.email.clone(),
            birthday: self.birthday.clone(),
        }
    }
}

impl UserFields {
    pub fn with_id(self, id: impl Into<String>) -> User {
        User {
            id: id.into(),
            fname: self.fname,
            lname: self.lname,
            email: self.email,
            birthday: self.birthday,
        }
    }
}
