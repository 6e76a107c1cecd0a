use serde::Serialize;
use sqlx::FromRow;

/// A tracked person together with the paths of its images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub ip_address: Option<String>,
    pub label: Option<String>,
    pub description: String,
    pub convicted: bool,
    pub socials: Option<String>,
    #[sqlx(skip)]
    pub images: Vec<String>,
}

/// Validated field values for inserting or overwriting a person.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFields {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub ip_address: Option<String>,
    pub label: Option<String>,
    pub description: String,
    pub convicted: bool,
    pub socials: Option<String>,
}

impl PersonFields {
    pub(crate) fn into_person(self, id: i64, images: Vec<String>) -> Person {
        Person {
            id,
            name: self.name,
            address: self.address,
            phone: self.phone,
            email: self.email,
            ip_address: self.ip_address,
            label: self.label,
            description: self.description,
            convicted: self.convicted,
            socials: self.socials,
            images,
        }
    }
}
