//! Mount mapping and classification through the gateway.

#[cfg(test)]
mod tests {
    use docgate_model::error::DocGateErrorCode;
    use docgate_model::resource::ResourceType;
    use http::header::HOST;
    use http::{HeaderMap, HeaderValue, Method, Uri};

    use crate::{gateway, resolve};

    #[test]
    fn test_should_pick_the_longest_mount() {
        let gw = gateway(&[("/", "*"), ("/api", "/shop"), ("/api/legacy", "/old/items")]);

        let req = resolve(&gw, Method::GET, "/api/orders", None).unwrap();
        assert_eq!(req.canonical_uri(), "/shop/orders");
        assert_eq!(req.resource_type(), ResourceType::Collection);

        let req = resolve(&gw, Method::GET, "/api/legacy/42", None).unwrap();
        assert_eq!(req.canonical_uri(), "/old/items/42");
        assert_eq!(req.resource_type(), ResourceType::Document);

        let req = resolve(&gw, Method::GET, "/other/coll", None).unwrap();
        assert_eq!(req.canonical_uri(), "/other/coll");
    }

    #[test]
    fn test_should_round_trip_request_paths() {
        let gw = gateway(&[("/api", "/shop")]);
        for path in ["/api", "/api/orders", "/api/orders/42/", "/api//orders"] {
            let req = resolve(&gw, Method::GET, path, None).unwrap();
            let back = req.request_path_of(req.canonical_uri()).unwrap();
            assert_eq!(back, req.path(), "{path}");
        }
    }

    #[test]
    fn test_should_resolve_templates_and_host_params() {
        let gw = gateway(&[("/{tenant}/*", "/{tenant}"), ("/", "/{host[0]}")]);

        let req = resolve(&gw, Method::GET, "/acme/orders/1", None).unwrap();
        assert_eq!(req.canonical_uri(), "/acme/orders/1");
        assert_eq!(req.db_name(), Some("acme"));

        let uri: Uri = "/orders".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("globex.example.com"));
        let gw = gateway(&[("/", "/{host[0]}")]);
        let req = gw.request(Method::GET, &uri, headers).unwrap();
        assert_eq!(req.canonical_uri(), "/globex/orders");
        assert!(req.mount_context().unwrap().has_parametric_mounts);
    }

    #[test]
    fn test_should_fail_on_unresolvable_template() {
        let gw = gateway(&[("/", "/{tenant}")]);
        let err = resolve(&gw, Method::GET, "/orders", None).unwrap_err();
        assert_eq!(err.code, DocGateErrorCode::MountResolution);
    }

    #[test]
    fn test_should_pass_sessions_through_mounts() {
        let gw = gateway(&[("/api", "/shop")]);
        let req = resolve(&gw, Method::POST, "/_sessions", None).unwrap();
        assert_eq!(req.canonical_uri(), "/_sessions");
        assert_eq!(req.resource_type(), ResourceType::Sessions);
        req.validate().unwrap();
    }

    #[test]
    fn test_should_classify_consistently() {
        let gw = gateway(&[]);
        let cases = [
            ("/db/coll", ResourceType::Collection),
            ("/db/coll/_indexes", ResourceType::CollectionIndexes),
            ("/db/coll/*", ResourceType::BulkDocuments),
            ("/db/coll/id", ResourceType::Document),
            ("/db/coll.files", ResourceType::FilesBucket),
            ("/db/coll/_aggrs", ResourceType::Invalid),
            ("/db/coll/_aggrs/byName", ResourceType::Aggregation),
        ];
        for (path, expected) in cases {
            let first = resolve(&gw, Method::GET, path, None).unwrap();
            let second = resolve(&gw, Method::GET, path, None).unwrap();
            assert_eq!(first.resource_type(), expected, "{path}");
            assert_eq!(first.canonical_uri(), second.canonical_uri());
            assert_eq!(first.resource_type(), second.resource_type());
        }
    }
}
