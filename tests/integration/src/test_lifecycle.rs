//! Buffered content lifecycle against a shared pool.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use docgate_model::error::DocGateErrorCode;
    use http::Method;
    use http_body_util::Full;

    use crate::{gateway, resolve};

    #[tokio::test]
    async fn test_should_return_segments_after_release() {
        let gw = gateway(&[]);
        let mut req = resolve(&gw, Method::POST, "/db/coll", None).unwrap();

        req.buffer_body(Full::new(Bytes::from(vec![b' '; 200])))
            .await
            .unwrap();
        assert_eq!(gw.pool().in_use(), 4);

        req.buffer_body(Full::new(Bytes::from_static(b"{}")))
            .await
            .unwrap();
        assert_eq!(gw.pool().in_use(), 1);

        req.release();
        req.release();
        assert_eq!(gw.pool().in_use(), 0);
    }

    #[tokio::test]
    async fn test_should_reject_oversized_bodies_without_leaking() {
        let gw = gateway(&[]);
        let mut req = resolve(&gw, Method::POST, "/db/coll", None).unwrap();

        let err = req
            .buffer_body(Full::new(Bytes::from(vec![b'x'; 2048])))
            .await
            .unwrap_err();
        assert_eq!(err.code, DocGateErrorCode::ContentTooLarge);
        assert_eq!(gw.pool().in_use(), 0);
        assert_eq!(
            req.buffered_content().unwrap_err().code,
            DocGateErrorCode::ContentUnavailable
        );
    }

    #[tokio::test]
    async fn test_should_release_segments_when_request_drops() {
        let gw = gateway(&[]);
        {
            let mut req = resolve(&gw, Method::PUT, "/db/coll/1", None).unwrap();
            req.buffer_body(Full::new(Bytes::from_static(br#"{"a":1}"#)))
                .await
                .unwrap();
            assert!(req.content().is_ok());
            assert_eq!(gw.pool().in_use(), 1);
        }
        assert_eq!(gw.pool().in_use(), 0);
    }

    #[tokio::test]
    async fn test_should_fail_when_pool_is_exhausted() {
        let gw = gateway(&[]);
        let mut held = Vec::new();
        for _ in 0..4 {
            let mut req = resolve(&gw, Method::POST, "/db/coll", None).unwrap();
            req.buffer_body(Full::new(Bytes::from(vec![b' '; 512])))
                .await
                .unwrap();
            held.push(req);
        }
        assert_eq!(gw.pool().available(), 0);

        let mut req = resolve(&gw, Method::POST, "/db/coll", None).unwrap();
        let err = req
            .buffer_body(Full::new(Bytes::from_static(b"{}")))
            .await
            .unwrap_err();
        assert_eq!(err.code, DocGateErrorCode::PoolExhausted);

        held.clear();
        req.buffer_body(Full::new(Bytes::from_static(b"{}")))
            .await
            .unwrap();
        assert_eq!(gw.pool().in_use(), 1);
    }
}
