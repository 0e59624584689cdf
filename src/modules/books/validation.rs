//! Field-type rules applied to create and update payloads.
//!
//! Every field is optional; a field that is present must have the right JSON
//! type. Presence rules belong to the handlers.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use bookshelf_http::error::{AppError, FieldError};
use serde_json::{Map, Value};

use super::models::BookFields;

pub const TITLE_MESSAGE: &str = "Title must be a string";
pub const AUTHOR_MESSAGE: &str = "Author must be a string";
pub const RATING_MESSAGE: &str = "Rating must be a number";

/// Check `payload` against the field rules.
///
/// Unknown keys are ignored. Only a missing key is absent; `null` is a value
/// of the wrong type. On failure every violated rule is reported, in field
/// order.
pub fn validate(payload: &Value) -> Result<BookFields, Vec<FieldError>> {
    let Some(object) = payload.as_object() else {
        return Err(vec![FieldError::new(
            "body",
            "Request body must be a JSON object",
        )
        .with_value(payload.clone())]);
    };

    let mut errors = Vec::new();
    let title = string_field(object, "title", TITLE_MESSAGE, &mut errors);
    let author = string_field(object, "author", AUTHOR_MESSAGE, &mut errors);
    let rating = integer_field(object, "rating", RATING_MESSAGE, &mut errors);

    if errors.is_empty() {
        Ok(BookFields {
            title,
            author,
            rating,
        })
    } else {
        Err(errors)
    }
}

/// Integral numbers only; `5.0` is the integer 5.
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64)
            .map(|n| n as i64)
    })
}

/// Lift form fields into the JSON shape [`validate`] checks.
///
/// Form values are all text, so `rating` becomes a number when it parses as
/// one and stays text otherwise.
pub fn form_payload(form: HashMap<String, String>) -> Value {
    let object = form
        .into_iter()
        .map(|(key, value)| {
            let value = match key.as_str() {
                "rating" => value
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or(Value::String(value)),
                _ => Value::String(value),
            };
            (key, value)
        })
        .collect::<Map<String, Value>>();
    Value::Object(object)
}

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

fn string_field(
    object: &Map<String, Value>,
    field: &str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let value = object.get(field)?;
    match value.as_str() {
        Some(text) => Some(text.to_string()),
        None => {
            errors.push(FieldError::new(field, message).with_value(value.clone()));
            None
        }
    }
}

fn integer_field(
    object: &Map<String, Value>,
    field: &str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<i64> {
    let value = object.get(field)?;
    match as_integer(value) {
        Some(number) => Some(number),
        None => {
            errors.push(FieldError::new(field, message).with_value(value.clone()));
            None
        }
    }
}

/// Extractor that decodes the request body and runs [`validate`] on it.
///
/// `application/x-www-form-urlencoded` bodies go through [`form_payload`];
/// any other body is decoded as JSON whatever its `Content-Type`, and an
/// empty one reads as `{}`. Rule violations are 400 validation errors; a body
/// that cannot be read keeps the status axum gave it (413 when oversized).
#[derive(Debug, Clone)]
pub struct ValidatedBook(pub BookFields);

impl<S> FromRequest<S> for ValidatedBook
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(form) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|rejection| {
                    AppError::rejected(rejection.status(), rejection.body_text())
                })?;
            return validate(&form_payload(form))
                .map(ValidatedBook)
                .map_err(AppError::validation);
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| {
                AppError::rejected(rejection.status(), rejection.body_text())
            })?;

        let payload = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(&bytes).map_err(|err| {
                AppError::validation(vec![FieldError::new(
                    "body",
                    format!("Request body is not valid JSON: {}", err),
                )])
            })?
        };

        validate(&payload)
            .map(ValidatedBook)
            .map_err(AppError::validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields_of(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn accepts_complete_payload() {
        let fields = validate(&json!({ "title": "Learn X", "author": "A", "rating": 5 })).unwrap();
        assert_eq!(
            fields,
            BookFields {
                title: Some("Learn X".to_string()),
                author: Some("A".to_string()),
                rating: Some(5),
            }
        );
    }

    #[test]
    fn empty_payload_passes() {
        assert!(validate(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let fields = validate(&json!({ "isbn": 42 })).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn null_is_a_type_error() {
        let errors =
            validate(&json!({ "title": null, "author": null, "rating": null })).unwrap_err();
        assert_eq!(fields_of(&errors), vec!["title", "author", "rating"]);
        assert_eq!(errors[0].message, TITLE_MESSAGE);
        assert_eq!(errors[0].value, Some(Value::Null));
    }

    #[test]
    fn falsy_values_are_present() {
        let fields = validate(&json!({ "title": "", "rating": 0 })).unwrap();
        assert_eq!(fields.title.as_deref(), Some(""));
        assert_eq!(fields.rating, Some(0));
    }

    #[test]
    fn reports_every_violation() {
        let errors = validate(&json!({ "title": 555, "author": 23, "rating": "five" })).unwrap_err();
        assert_eq!(fields_of(&errors), vec!["title", "author", "rating"]);
        assert_eq!(errors[0].message, TITLE_MESSAGE);
        assert_eq!(errors[1].message, AUTHOR_MESSAGE);
        assert_eq!(errors[2].message, RATING_MESSAGE);
        assert_eq!(errors[2].value, Some(json!("five")));
    }

    #[test]
    fn rating_must_be_an_integer() {
        for rating in [json!(4.5), json!("5"), json!(true), json!(u64::MAX), json!(1e300)] {
            let errors = validate(&json!({ "rating": rating })).unwrap_err();
            assert_eq!(fields_of(&errors), vec!["rating"], "rating {rating} accepted");
        }
        assert_eq!(validate(&json!({ "rating": -3 })).unwrap().rating, Some(-3));
    }

    #[test]
    fn integral_float_rating_is_stored_as_integer() {
        assert_eq!(validate(&json!({ "rating": 5.0 })).unwrap().rating, Some(5));
        let parsed: Value = serde_json::from_str(r#"{ "rating": -2.0 }"#).unwrap();
        assert_eq!(validate(&parsed).unwrap().rating, Some(-2));
    }

    #[test]
    fn form_fields_follow_the_same_rules() {
        let form = HashMap::from([
            ("title".to_string(), "Learn X".to_string()),
            ("author".to_string(), "A".to_string()),
            ("rating".to_string(), " 5 ".to_string()),
        ]);
        let fields = validate(&form_payload(form)).unwrap();
        assert_eq!(fields.title.as_deref(), Some("Learn X"));
        assert_eq!(fields.rating, Some(5));

        let form = HashMap::from([("rating".to_string(), "five".to_string())]);
        let errors = validate(&form_payload(form)).unwrap_err();
        assert_eq!(fields_of(&errors), vec!["rating"]);
        assert_eq!(errors[0].value, Some(json!("five")));
    }

    #[test]
    fn non_object_body_is_rejected() {
        let errors = validate(&json!(["title"])).unwrap_err();
        assert_eq!(fields_of(&errors), vec!["body"]);
    }
}
