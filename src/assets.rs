pub(crate) async fn service_worker() -> axum::response::Response {
    const SW_JS_CONTENT: &str = include_str!("../static/sw.js");
    axum::response::Response::builder()
        .status(200)
        .header("content-type", "application/javascript")
        .header("cache-control", "public, max-age=3600, immutable")
        .body(SW_JS_CONTENT.into())
        .unwrap()
}
