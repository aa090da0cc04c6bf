//! Content negotiation through the request model.

#[cfg(test)]
mod tests {
    use docgate_model::error::DocGateErrorCode;
    use http::Method;
    use serde_json::json;

    use crate::{gateway, resolve};

    const JSON: Option<&'static str> = Some("application/json");

    #[test]
    fn test_should_decode_document_for_patch() {
        let gw = gateway(&[]);
        let mut req = resolve(&gw, Method::PATCH, "/db/coll/1", JSON).unwrap();
        req.set_raw_body(r#"{"$set":{"a":1}}"#);
        let content = req.content().unwrap().content.clone().unwrap();
        assert_eq!(content.into_value(), json!({"$set": {"a": 1}}));
    }

    #[test]
    fn test_should_reject_operators_on_collection_post() {
        let gw = gateway(&[]);
        let mut req = resolve(&gw, Method::POST, "/db/coll", JSON).unwrap();
        req.set_raw_body(r#"{"$set":{"a":1}}"#);
        let err = req.content().unwrap_err();
        assert_eq!(err.code, DocGateErrorCode::BadContent);
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_should_unflatten_put_content() {
        let gw = gateway(&[]);
        let mut req = resolve(&gw, Method::PUT, "/db/coll/1", JSON).unwrap();
        req.set_raw_body(r#"{"a.b.c": 1}"#);
        let content = req.content().unwrap().content.clone().unwrap();
        assert_eq!(content.into_value(), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_should_apply_array_rules() {
        let gw = gateway(&[]);

        let mut req = resolve(&gw, Method::POST, "/db/coll", JSON).unwrap();
        req.set_raw_body(r#"[{"a":1},{"a":2}]"#);
        let content = req.content().unwrap().content.as_ref().unwrap();
        assert_eq!(content.as_array().map(<[_]>::len), Some(2));

        let mut req = resolve(&gw, Method::PUT, "/db/coll/1", JSON).unwrap();
        req.set_raw_body(r#"[{"a":1},{"a":2}]"#);
        assert_eq!(req.content().unwrap_err().code, DocGateErrorCode::BadContent);
    }

    #[test]
    fn test_should_reject_unknown_media_type() {
        let gw = gateway(&[]);
        let mut req = resolve(&gw, Method::POST, "/db/coll", Some("text/csv")).unwrap();
        req.set_raw_body("a,b\n1,2");
        let err = req.content().unwrap_err();
        assert_eq!(err.code, DocGateErrorCode::UnsupportedMediaType);
        assert_eq!(err.status_code, http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_should_decode_form_content() {
        let gw = gateway(&[]);
        let mut req = resolve(
            &gw,
            Method::POST,
            "/db/coll",
            Some("application/x-www-form-urlencoded"),
        )
        .unwrap();
        req.set_raw_body("name=widget&qty=3&tags=%5B%22a%22%5D");
        let content = req.content().unwrap().content.clone().unwrap();
        assert_eq!(
            content.into_value(),
            json!({"name": "widget", "qty": 3, "tags": ["a"]})
        );
    }

    #[test]
    fn test_should_extract_file_upload() {
        let gw = gateway(&[]);
        let mut req = resolve(
            &gw,
            Method::POST,
            "/db/bucket.files",
            Some("multipart/form-data; boundary=B"),
        )
        .unwrap();
        req.set_raw_body(
            "--B\r\nContent-Disposition: form-data; name=\"metadata\"\r\n\r\n{\"k\":\"v\"}\r\n\
             --B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
             Content-Type: text/plain\r\n\r\nhello\r\n--B--\r\n",
        );
        let negotiated = req.content().unwrap();
        let file = negotiated.file.as_ref().unwrap();
        assert_eq!(file.filename, "a.txt");
        assert_eq!(file.data.as_ref(), b"hello");
        assert_eq!(
            negotiated.content.clone().unwrap().into_value(),
            json!({"k": "v"})
        );
    }
}
