use axum::Json;
use axum::extract::{FromRequest, Request};
use bson::{Bson, Document};
use serde_json::{Map, Number, Value};

use crate::error::ApiError;

/// A JSON object request body as a BSON document.
pub struct JsonBody(pub Document);

impl<S: Send + Sync> FromRequest<S> for JsonBody {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Status(rejection.status(), rejection.body_text()))?;
        if !value.is_object() {
            return Err(ApiError::bad_request("request body must be a JSON object"));
        }
        bson::to_document(&value)
            .map(JsonBody)
            .map_err(|e| ApiError::bad_request(e.to_string()))
    }
}

/// Response JSON for a stored document: ids as hex strings, dates as
/// RFC 3339.
pub fn to_json(doc: Document) -> Value {
    bson_to_json(Bson::Document(doc))
}

pub fn docs_to_json(docs: Vec<Document>) -> Value {
    Value::Array(docs.into_iter().map(to_json).collect())
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Double(v) => Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(doc) => Value::Object(
            doc.into_iter()
                .map(|(k, v)| (k, bson_to_json(v)))
                .collect::<Map<_, _>>(),
        ),
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Int32(v) => Value::from(v),
        Bson::Int64(v) => Value::from(v),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or(Value::Null),
        other => other.into_relaxed_extjson(),
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use bson::oid::ObjectId;
    use serde_json::json;

    use super::*;

    #[test]
    fn plain_values_map_directly() {
        let oid = ObjectId::parse_str("5c88fa8cf4afda39709c2955").unwrap();
        let doc = doc! {
            "_id": oid,
            "name": "The Sea Explorer",
            "price": 497.5,
            "duration": 7,
            "ratingsQuantity": 2_i64,
            "secretTour": false,
            "guides": ["a", "b"],
            "startLocation": { "type": "Point", "coordinates": [-80.1, 25.7] },
            "priceDiscount": Bson::Null,
        };
        assert_eq!(
            to_json(doc),
            json!({
                "_id": "5c88fa8cf4afda39709c2955",
                "name": "The Sea Explorer",
                "price": 497.5,
                "duration": 7,
                "ratingsQuantity": 2,
                "secretTour": false,
                "guides": ["a", "b"],
                "startLocation": { "type": "Point", "coordinates": [-80.1, 25.7] },
                "priceDiscount": null,
            })
        );
    }

    #[test]
    fn dates_become_rfc3339() {
        let doc = doc! { "createdAt": bson::DateTime::from_millis(0) };
        assert_eq!(to_json(doc), json!({ "createdAt": "1970-01-01T00:00:00Z" }));
    }
}
