use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::types::UserFields;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Fname,
    Lname,
    Email,
    Birthday,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Fname, Field::Lname, Field::Email, Field::Birthday];

    pub fn name(self) -> &'static str {
        match self {
            Field::Fname => "fname",
            Field::Lname => "lname",
            Field::Email => "email",
            Field::Birthday => "birthday",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Fname => "First name",
            Field::Lname => "Last name",
            Field::Email => "Email",
            Field::Birthday => "Birthday",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single validation rule. Each carries the message shown when it fails.
#[derive(Debug, Clone)]
pub enum Rule {
    Required(String),
    Email(String),
    Date(String),
}

impl Rule {
    fn check(&self, value: &str) -> Option<&str> {
        match self {
            Rule::Required(message) if value.is_empty() => Some(message.as_str()),
            // Shape checks only apply to something that was entered
            Rule::Email(message) if !value.is_empty() && !EMAIL_RE.is_match(value) => {
                Some(message.as_str())
            }
            Rule::Date(message)
                if !value.is_empty() && NaiveDate::parse_from_str(value, DATE_FORMAT).is_err() =>
            {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}

/// Per-field validation messages, ordered by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Form {
    values: BTreeMap<Field, String>,
    rules: BTreeMap<Field, Vec<Rule>>,
    errors: FieldErrors,
}

impl Form {
    /// The user form: every field required, plus shape checks on email and
    /// birthday.
    pub fn user_form() -> Self {
        let mut form = Self::default();
        for field in Field::ALL {
            form.register(field, vec![Rule::Required(format!("{} is required", field.label()))]);
        }
        form.register(Field::Email, vec![Rule::Email("Email must be a valid address".into())]);
        form.register(
            Field::Birthday,
            vec![Rule::Date("Birthday must be a date (YYYY-MM-DD)".into())],
        );
        form
    }

    /// Attach rules to a field. Registering the same field again adds to its
    /// existing rules.
    pub fn register(&mut self, field: Field, rules: Vec<Rule>) {
        self.rules.entry(field).or_default().extend(rules);
    }

    pub fn set_value(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn value(&self, field: Field) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn values(&self) -> UserFields {
        UserFields {
            fname: self.value(Field::Fname).trim().to_string(),
            lname: self.value(Field::Lname).trim().to_string(),
            email: self.value(Field::Email).trim().to_string(),
            birthday: self.value(Field::Birthday).trim().to_string(),
        }
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// True when no field holds a value.
    pub fn is_empty(&self) -> bool {
        self.values.values().all(|v| v.is_empty())
    }

    /// Clear values and errors. Registered rules are kept.
    pub fn reset(&mut self) {
        self.values.clear();
        self.errors = FieldErrors::default();
    }

    /// Load all four fields at once, replacing whatever was entered.
    pub fn load(&mut self, fields: &UserFields) {
        self.set_value(Field::Fname, fields.fname.clone());
        self.set_value(Field::Lname, fields.lname.clone());
        self.set_value(Field::Email, fields.email.clone());
        self.set_value(Field::Birthday, fields.birthday.clone());
        self.errors = FieldErrors::default();
    }

    /// Validate every registered field. Only the first failing rule of a
    /// field is reported.
    pub fn handle_submit(&mut self) -> Result<UserFields, FieldErrors> {
        let mut errors = BTreeMap::new();
        for (field, rules) in &self.rules {
            let value = self.value(*field).trim();
            if let Some(message) = rules.iter().find_map(|rule| rule.check(value)) {
                errors.insert(*field, message.to_string());
            }
        }

        self.errors = FieldErrors(errors);
        if self.errors.is_empty() {
            Ok(self.values())
        } else {
            Err(self.errors.clone())
        }
    }
}
