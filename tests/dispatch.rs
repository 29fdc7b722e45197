//! End-to-end dispatch pipeline tests: router match → parameter binding →
//! handler call, without a socket. The server boundary adds only transport
//! concerns on top of what is exercised here.

use bytes::Bytes;
use vico::{Binder, Error, Method, Params, Request, Response, Router};

async fn echo_params(_req: Request, params: Params) -> Response {
    let mut out = String::new();
    for (key, value) in params.iter() {
        let rendered = match value {
            vico::Value::Text(s) => s.clone(),
            vico::Value::File(f) => format!("<file {}>", f.filename()),
            vico::Value::List(items) => format!("<list of {}>", items.len()),
            vico::Value::Map(map) => format!("<map of {}>", map.len()),
        };
        out.push_str(&format!("{key}={rendered};"));
    }
    Response::text(out)
}

/// Runs a request through the same steps the server boundary performs.
async fn run(
    router: &Router,
    binder: &Binder,
    req: Request,
) -> Result<Option<Vec<u8>>, Error> {
    let Some(matched) = router.dispatch(req.method(), req.path()) else {
        return Ok(None);
    };
    let params = binder.bind(&req, matched.captures())?;
    let resp = matched.call(req, params).await;
    Ok(Some(resp.body().to_vec()))
}

#[tokio::test]
async fn capture_beats_query_param_end_to_end() {
    let router = Router::new().get("/hello/:name", echo_params).unwrap();
    let req = Request::new(Method::Get, "/hello/Alice", "name=Bob", Vec::new(), Bytes::new());

    let body = run(&router, &Binder::new(), req).await.unwrap().unwrap();
    assert_eq!(body, b"name=Alice;");
}

#[tokio::test]
async fn unmatched_path_is_a_miss_not_an_error() {
    let router = Router::new().get("/hello/:name", echo_params).unwrap();
    let req = Request::new(Method::Get, "/goodbye", "", Vec::new(), Bytes::new());

    assert!(run(&router, &Binder::new(), req).await.unwrap().is_none());
}

#[tokio::test]
async fn first_registration_wins_for_overlapping_routes() {
    async fn literal(_req: Request, _params: Params) -> Response {
        Response::text("literal")
    }
    async fn capture(_req: Request, _params: Params) -> Response {
        Response::text("capture")
    }

    let router = Router::new()
        .get("/users/me", literal).unwrap()
        .get("/users/:id", capture).unwrap();

    let req = Request::new(Method::Get, "/users/me", "", Vec::new(), Bytes::new());
    let body = run(&router, &Binder::new(), req).await.unwrap().unwrap();
    assert_eq!(body, b"literal");

    let req = Request::new(Method::Get, "/users/7", "", Vec::new(), Bytes::new());
    let body = run(&router, &Binder::new(), req).await.unwrap().unwrap();
    assert_eq!(body, b"capture");
}

#[tokio::test]
async fn multipart_upload_flows_through_the_pipeline() {
    let router = Router::new().post("/upload", echo_params).unwrap();
    let body = concat!(
        "--B\r\n",
        "Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n",
        "Content-Type: image/png\r\n",
        "\r\n",
        "PNGDATA\r\n",
        "--B--\r\n",
    );
    let req = Request::new(
        Method::Post,
        "/upload",
        "",
        vec![(
            "content-type".to_owned(),
            "multipart/form-data; boundary=B".to_owned(),
        )],
        body.to_owned(),
    );

    let out = run(&router, &Binder::new(), req).await.unwrap().unwrap();
    assert_eq!(out, b"avatar=<file me.png>;");
}

#[tokio::test]
async fn oversized_body_fails_before_any_handler_runs() {
    let router = Router::new().post("/upload", echo_params).unwrap();
    let req = Request::new(
        Method::Post,
        "/upload",
        "",
        vec![(
            "content-type".to_owned(),
            "application/x-www-form-urlencoded".to_owned(),
        )],
        "field=0123456789",
    );

    let err = run(&router, &Binder::with_body_limit(8), req).await.unwrap_err();
    assert!(matches!(err, Error::PayloadTooLarge { limit: 8 }));
}

#[tokio::test]
async fn form_body_and_query_merge_in_one_tree() {
    let router = Router::new().post("/upload", echo_params).unwrap();
    let req = Request::new(
        Method::Post,
        "/upload",
        "page=2",
        vec![(
            "content-type".to_owned(),
            "application/x-www-form-urlencoded".to_owned(),
        )],
        "colors[]=red&colors[]=blue&user[name]=Bob",
    );

    let out = run(&router, &Binder::new(), req).await.unwrap().unwrap();
    assert_eq!(out, b"page=2;colors=<list of 2>;user=<map of 1>;");
}
