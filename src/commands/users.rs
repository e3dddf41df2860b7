use colored::Colorize;
use tabled::Tabled;

use crate::cache::{QueryCache, QueryKey};
use crate::cli::{UserCreateArgs, UserEditArgs};
use crate::client::UserApi;
use crate::error::Result;
use crate::form::Field;
use crate::output;
use crate::sync::{Submitted, UserSync};
use crate::types::User;

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Birthday")]
    birthday: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: output::truncate(&user.full_name(), 40),
            email: output::truncate(&user.email, 40),
            birthday: output::format_birthday(&user.birthday),
        }
    }
}

fn compact_line(user: &User) -> String {
    format!("{}  {}  <{}>  {}", user.id, user.full_name(), user.email, user.birthday)
}

pub async fn list<A: UserApi, C: QueryCache>(sync: &UserSync<A, C>, refresh: bool) -> Result<()> {
    if refresh {
        sync.cache().invalidate(&QueryKey::users());
    }

    let users = sync.users().await?;
    output::print_table(&users, |user| UserRow::from(user), compact_line);

    Ok(())
}

pub async fn create<A: UserApi, C: QueryCache>(
    sync: &mut UserSync<A, C>,
    args: UserCreateArgs,
) -> Result<()> {
    sync.set_value(Field::Fname, args.fname);
    sync.set_value(Field::Lname, args.lname);
    sync.set_value(Field::Email, args.email);
    sync.set_value(Field::Birthday, args.birthday);

    report(sync.submit().await?);
    Ok(())
}

/// Load the user into the form, apply the given changes and submit.
pub async fn edit<A: UserApi, C: QueryCache>(
    sync: &mut UserSync<A, C>,
    args: UserEditArgs,
) -> Result<()> {
    let user = sync.find_user(&args.id).await?;
    sync.edit_load(user);

    let changes = [
        (Field::Fname, args.fname),
        (Field::Lname, args.lname),
        (Field::Email, args.email),
        (Field::Birthday, args.birthday),
    ];
    for (field, value) in changes {
        if let Some(value) = value {
            sync.set_value(field, value);
        }
    }

    report(sync.submit().await?);
    Ok(())
}

pub async fn delete<A: UserApi, C: QueryCache>(sync: &mut UserSync<A, C>, id: &str) -> Result<()> {
    sync.delete(id).await?;
    output::print_message(&format!("Deleted user {}", id.bold()));
    Ok(())
}

fn report(submitted: Submitted) {
    let (verb, user) = match &submitted {
        Submitted::Created(user) => ("Created", user),
        Submitted::Updated(user) => ("Updated", user),
    };

    output::print_item(user, |user| {
        println!(
            "{} {} {}",
            verb.green(),
            user.full_name().bold(),
            format!("({})", user.id).bright_black()
        );
    });
}
