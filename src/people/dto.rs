use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::people::repo_types::{Person, PersonFields};

/// Raw text fields of a person as submitted by a form or the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "ipaddress")]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub convicted: bool,
    #[serde(default)]
    pub socials: Option<Socials>,
}

/// `socials` is accepted as free text or as a list of handles/links.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Socials {
    Text(String),
    List(Vec<String>),
}

impl Socials {
    fn into_stored(self) -> Option<String> {
        match self {
            Socials::Text(text) => non_empty(Some(text)),
            Socials::List(items) if items.is_empty() => None,
            // a Vec<String> always serializes
            Socials::List(items) => serde_json::to_string(&items).ok(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PersonInput {
    pub fn validate(self) -> Result<PersonFields, ValidationError> {
        let name = self.name.trim().to_string();
        let description = self.description.trim().to_string();
        if name.is_empty() || description.is_empty() {
            return Err(ValidationError::new("Name and Description are required."));
        }
        Ok(PersonFields {
            name,
            address: non_empty(self.address),
            phone: non_empty(self.phone),
            email: non_empty(self.email),
            ip_address: non_empty(self.ip_address),
            label: non_empty(self.label),
            description,
            convicted: self.convicted,
            socials: self.socials.and_then(Socials::into_stored),
        })
    }

    /// Sets a text field from a multipart form part. Unknown names are ignored.
    pub fn set_form_field(&mut self, name: &str, value: String) {
        match name {
            "name" => self.name = value,
            "address" => self.address = Some(value),
            "phone" => self.phone = Some(value),
            "email" => self.email = Some(value),
            "ipaddress" | "ip_address" => self.ip_address = Some(value),
            "label" => self.label = Some(value),
            "description" => self.description = value,
            "socials" => self.socials = Some(Socials::Text(value)),
            "convicted" => self.convicted = is_checked(&value),
            _ => {}
        }
    }
}

/// HTML checkbox semantics.
pub fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

#[derive(Debug, Serialize)]
pub struct PeoplePage {
    pub people: Vec<Person>,
}

#[derive(Debug, Serialize)]
pub struct PersonPage {
    pub person: Person,
}

#[derive(Debug, Serialize)]
pub struct AddPersonPage {
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EditPersonPage {
    pub person: Person,
    pub allowed_extensions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_description_are_required() {
        let err = PersonInput {
            name: "  ".into(),
            description: "x".into(),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.0, "Name and Description are required.");

        assert!(PersonInput {
            name: "x".into(),
            ..Default::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn blank_optionals_become_none() {
        let fields = PersonInput {
            name: " Jo ".into(),
            description: "desc".into(),
            phone: Some("   ".into()),
            email: Some(" jo@example.com ".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(fields.name, "Jo");
        assert_eq!(fields.phone, None);
        assert_eq!(fields.email.as_deref(), Some("jo@example.com"));
    }

    #[test]
    fn socials_list_is_stored_as_json() {
        let input: PersonInput = serde_json::from_value(serde_json::json!({
            "name": "A",
            "description": "B",
            "socials": ["@a", "https://example.com/a"],
        }))
        .unwrap();
        let fields = input.validate().unwrap();
        assert_eq!(
            fields.socials.as_deref(),
            Some(r#"["@a","https://example.com/a"]"#)
        );
    }

    #[test]
    fn json_accepts_ipaddress_alias() {
        let input: PersonInput = serde_json::from_value(serde_json::json!({
            "name": "A",
            "description": "B",
            "ipaddress": "10.0.0.1",
            "convicted": true,
            "socials": "@a",
        }))
        .unwrap();
        let fields = input.validate().unwrap();
        assert_eq!(fields.ip_address.as_deref(), Some("10.0.0.1"));
        assert!(fields.convicted);
        assert_eq!(fields.socials.as_deref(), Some("@a"));
    }

    #[test]
    fn form_fields_map_onto_input() {
        let mut input = PersonInput::default();
        input.set_form_field("name", "N".into());
        input.set_form_field("description", "D".into());
        input.set_form_field("convicted", "on".into());
        input.set_form_field("ipaddress", "1.2.3.4".into());
        input.set_form_field("unknown", "ignored".into());
        let fields = input.validate().unwrap();
        assert!(fields.convicted);
        assert_eq!(fields.ip_address.as_deref(), Some("1.2.3.4"));
        assert!(!is_checked("off"));
    }
}
