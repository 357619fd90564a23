//! HTML pages for humans: a landing page and a manual upload form.

use actix_web::HttpResponse;

pub const PROGRAM_NAME: &str = "Hotword Training Server";

/// `GET /`
pub async fn index() -> HttpResponse {
    html(format!(
        r#"<html>
    <head>
        <title>{name} v{version}</title>
    </head>
    <body>
        <h1>{name} v{version}</h1>
        <ul>
            <li><a href="/test">Testing</a></li>
            <li><a href="/health">Health</a></li>
        </ul>
    </body>
</html>
"#,
        name = PROGRAM_NAME,
        version = env!("CARGO_PKG_VERSION"),
    ))
}

/// `GET /test` - posts the selected files to `/train`.
pub async fn upload_form() -> HttpResponse {
    html(format!(
        r#"<html>
    <head>
        <title>Testing - {name} v{version}</title>
    </head>
    <body>
        <form action="/train" enctype="multipart/form-data" method="post">
            <input name="files" type="file" accept="audio/wav" multiple>
            <input type="submit">
        </form>
    </body>
</html>
"#,
        name = PROGRAM_NAME,
        version = env!("CARGO_PKG_VERSION"),
    ))
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}
