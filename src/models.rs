use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub id: i64,
    pub url: String,
    pub descripcion: String,
    pub titulo: String,
    pub contenido: String,
    pub categoria: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewLink<'a> {
    pub url: &'a str,
    pub descripcion: &'a str,
    pub titulo: &'a str,
    pub contenido: &'a str,
    pub categoria: &'a str,
    pub user_id: i64,
}

/// Optional filters for listing a user's links. Both apply when present.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LinkFilter {
    pub search: Option<String>,
    pub categoria: Option<String>,
}

impl LinkFilter {
    /// Empty strings count as absent.
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    pub fn categoria(&self) -> Option<&str> {
        self.categoria.as_deref().filter(|s| !s.is_empty())
    }

    pub fn matches(&self, link: &Link) -> bool {
        if let Some(categoria) = self.categoria() {
            if link.categoria != categoria {
                return false;
            }
        }

        match self.search() {
            Some(term) => {
                let term = term.to_lowercase();
                link.descripcion.to_lowercase().contains(&term)
                    || link.titulo.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}
