use mongodb::bson::oid::ObjectId;
use serde::{Serialize, Serializer};

/// A stored book record.
///
/// Serialized as `{"_id": "<24 hex>", "title"?, "author"?, "rating"?}`;
/// unset fields are omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    /// Identifier assigned at creation
    #[serde(rename = "_id", serialize_with = "serialize_hex")]
    pub id: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
}

impl Book {
    /// New record holding exactly the fields present in `fields`.
    pub fn new(id: ObjectId, fields: BookFields) -> Self {
        Self {
            id,
            title: fields.title,
            author: fields.author,
            rating: fields.rating,
        }
    }

    /// Overwrite the fields present in `fields`, keeping every other value.
    pub fn merge(&mut self, fields: BookFields) {
        if let Some(title) = fields.title {
            self.title = Some(title);
        }
        if let Some(author) = fields.author {
            self.author = Some(author);
        }
        if let Some(rating) = fields.rating {
            self.rating = Some(rating);
        }
    }
}

fn serialize_hex<S: Serializer>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_hex())
}

/// Field values accepted by create and update; `None` means "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub rating: Option<i64>,
}

impl BookFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.rating.is_none()
    }
}

/// Response body of the list endpoint.
#[derive(Debug, Serialize)]
pub struct BookList {
    pub books: Vec<Book>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_id_as_hex_and_skips_unset_fields() {
        let id = ObjectId::parse_str("60a50065a336a564c657ebd5").unwrap();
        let book = Book::new(
            id,
            BookFields {
                title: Some("Learn X".to_string()),
                ..BookFields::default()
            },
        );

        assert_eq!(
            serde_json::to_value(&book).unwrap(),
            json!({ "_id": "60a50065a336a564c657ebd5", "title": "Learn X" })
        );
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let mut book = Book::new(
            ObjectId::new(),
            BookFields {
                title: Some("Learn X".to_string()),
                author: Some("A".to_string()),
                rating: Some(5),
            },
        );

        book.merge(BookFields {
            rating: Some(0),
            ..BookFields::default()
        });

        assert_eq!(book.title.as_deref(), Some("Learn X"));
        assert_eq!(book.author.as_deref(), Some("A"));
        assert_eq!(book.rating, Some(0));
    }

    #[test]
    fn empty_fields() {
        assert!(BookFields::default().is_empty());
        assert!(!BookFields {
            author: Some(String::new()),
            ..BookFields::default()
        }
        .is_empty());
    }
}
