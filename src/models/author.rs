use serde::{Deserialize, Serialize};

use super::AuthorId;

/// A book author
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
}
