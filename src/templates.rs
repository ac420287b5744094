//! Server-rendered pages.

use crate::fields::{escape_html, TITLE_MAX_LENGTH};

fn layout(title: &str, body: &str, script: Option<&str>) -> String {
    let script = script
        .map(|name| {
            format!(
                "<script src=\"/static/common.js\"></script>\n<script src=\"/static/{}\"></script>",
                name
            )
        })
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
<main>
{body}
</main>
{script}
</body>
</html>
"#,
        title = escape_html(title),
        body = body,
        script = script,
    )
}

pub fn home_page() -> String {
    let body = format!(
        r#"<h1>easypub</h1>
<form id="publish">
<input name="title" placeholder="Title" maxlength="{max}" required>
<textarea name="content" placeholder="Write something..." required></textarea>
<button type="submit">Publish</button>
</form>
<section id="result" hidden></section>"#,
        max = TITLE_MAX_LENGTH
    );
    layout("easypub", &body, Some("index.js"))
}

/// `content` is already sanitized and inserted as is.
pub fn read_page(title: &str, content: &str) -> String {
    let body = format!(
        "<article>\n<h1>{}</h1>\n{}\n</article>",
        escape_html(title),
        content
    );
    layout(title, &body, None)
}

pub fn admin_page(slug: &str, title: &str, content: &str) -> String {
    let body = format!(
        r#"<h1>{title}</h1>
<form id="admin" data-slug="{slug}">
<input name="secret" type="password" placeholder="Secret" required>
<textarea name="content">{content}</textarea>
<button type="submit" name="action" value="update">Update</button>
<button type="submit" name="action" value="delete">Delete</button>
</form>
<section id="result" hidden></section>"#,
        title = escape_html(title),
        slug = escape_html(slug),
        content = escape_html(content),
    );
    layout(title, &body, Some("admin.js"))
}
