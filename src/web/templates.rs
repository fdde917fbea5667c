use chrono::{Datelike, Utc};

use crate::web::{flash::Flash, forms::FormErrors};

const SITE_NAME: &str = "Snapshelf";

const BASE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; min-height: 100vh; display: flex; flex-direction: column; }
        header { background: #ffffff; padding: 1.25rem 1.5rem; border-bottom: 1px solid #e2e8f0; }
        .header-bar { display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 1rem; max-width: 960px; margin: 0 auto; }
        .brand { font-size: 1.35rem; font-weight: 700; color: #0f172a; text-decoration: none; }
        nav { display: flex; gap: 0.75rem; align-items: center; flex-wrap: wrap; }
        nav a { color: #1d4ed8; text-decoration: none; font-weight: 600; padding: 0.4rem 0.8rem; border-radius: 999px; }
        nav a:hover { background: #e0f2fe; }
        nav span { color: #475569; font-size: 0.95rem; }
        .logout-form button { padding: 0.4rem 0.9rem; border-radius: 999px; background: #e2e8f0; color: #0f172a; margin: 0; }
        .logout-form button:hover { background: #cbd5e1; }
        main { flex: 1; padding: 2rem 1.5rem; max-width: 960px; margin: 0 auto; width: 100%; box-sizing: border-box; }
        .panel { background: #ffffff; border-radius: 12px; border: 1px solid #e2e8f0; padding: 1.5rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.08); }
        .panel h1, .panel h2 { margin-top: 0; }
        label { display: block; margin-top: 1rem; font-weight: 600; color: #0f172a; }
        input { width: 100%; padding: 0.75rem; margin-top: 0.5rem; border-radius: 8px; border: 1px solid #cbd5f5; background: #f8fafc; color: #0f172a; box-sizing: border-box; }
        input:focus { outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.12); }
        button { margin-top: 1.5rem; padding: 0.85rem 1.2rem; border: none; border-radius: 8px; background: #2563eb; color: #ffffff; font-weight: 600; cursor: pointer; transition: background 0.15s ease; }
        button:hover { background: #1d4ed8; }
        .field-errors { margin: 0.4rem 0 0; padding: 0; list-style: none; color: #b91c1c; font-size: 0.9rem; }
        .flash { padding: 1rem 1.25rem; border-radius: 10px; margin-bottom: 1.5rem; font-weight: 600; border: 1px solid transparent; }
        .flash.success { background: #ecfdf3; border-color: #bbf7d0; color: #166534; }
        .flash.danger { background: #fef2f2; border-color: #fecaca; color: #b91c1c; }
        .gallery { display: grid; gap: 1rem; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); padding: 0; list-style: none; }
        .gallery li { background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; overflow: hidden; }
        .gallery img { display: block; width: 100%; height: 160px; object-fit: cover; background: #f1f5f9; }
        .gallery a { display: block; padding: 0.6rem 0.8rem; color: #1d4ed8; text-decoration: none; word-break: break-all; font-size: 0.9rem; }
        .note { color: #475569; font-size: 0.95rem; line-height: 1.6; }
        .app-footer { margin-top: 3rem; text-align: center; font-size: 0.85rem; color: #94a3b8; }
        @media (max-width: 768px) {
            header { padding: 1rem; }
            main { padding: 1.5rem 1rem; }
            .header-bar { flex-direction: column; align-items: flex-start; }
        }
"#;

pub struct PageLayout<'a> {
    pub title: &'a str,
    pub viewer: Option<&'a str>,
    pub flash: Option<Flash>,
    pub body_html: String,
}

pub fn render_layout(layout: PageLayout<'_>) -> String {
    let PageLayout {
        title,
        viewer,
        flash,
        body_html,
    } = layout;

    let account_html = match viewer {
        Some(username) => format!(
            r#"<span>Signed in as <strong>{username}</strong></span>
                <form class="logout-form" method="post" action="/logout"><button type="submit">Log out</button></form>"#,
            username = escape_html(username),
        ),
        None => r#"<a href="/login">Log in</a>"#.to_string(),
    };

    let flash_html = flash.map(render_flash).unwrap_or_default();
    let footer = render_footer();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title} · {site}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
{styles}
    </style>
</head>
<body>
    <header>
        <div class="header-bar">
            <a class="brand" href="/">{site}</a>
            <nav>
                <a href="/">Home</a>
                <a href="/about/">About</a>
                <a href="/upload">Upload</a>
                <a href="/files">Files</a>
                {account_html}
            </nav>
        </div>
    </header>
    <main>
        {flash_html}
{body_html}
        {footer}
    </main>
</body>
</html>"#,
        title = escape_html(title),
        site = SITE_NAME,
        styles = BASE_STYLES,
        account_html = account_html,
        flash_html = flash_html,
        body_html = body_html,
        footer = footer,
    )
}

fn render_flash(flash: Flash) -> String {
    format!(
        r#"<div class="flash {category}">{message}</div>"#,
        category = flash.category(),
        message = flash.message(),
    )
}

pub fn render_home_page(viewer: Option<&str>, flash: Option<Flash>) -> String {
    render_layout(PageLayout {
        title: "Home",
        viewer,
        flash,
        body_html: format!(
            r#"        <section class="panel">
            <h1>Welcome to {site}</h1>
            <p class="note">Upload JPG or PNG images and browse everything that has been shared so far. Browsing the gallery requires an account.</p>
            <p><a href="/upload">Upload an image →</a></p>
        </section>"#,
            site = SITE_NAME,
        ),
    })
}

pub fn render_about_page(viewer: Option<&str>, owner: &str) -> String {
    render_layout(PageLayout {
        title: "About",
        viewer,
        flash: None,
        body_html: format!(
            r#"        <section class="panel">
            <h1>About</h1>
            <p class="note">{site} is maintained by {owner}. It keeps a single shared folder of images that signed-in members can browse.</p>
        </section>"#,
            site = SITE_NAME,
            owner = escape_html(owner),
        ),
    })
}

#[derive(Default)]
pub struct LoginPage<'a> {
    pub viewer: Option<&'a str>,
    pub flash: Option<Flash>,
    pub username: &'a str,
    pub errors: Option<&'a FormErrors>,
    pub error_message: Option<&'a str>,
}

pub fn render_login_page(page: LoginPage<'_>) -> String {
    let alert = page
        .error_message
        .map(|message| {
            format!(
                r#"<div class="flash danger">{}</div>"#,
                escape_html(message)
            )
        })
        .unwrap_or_default();

    let body_html = format!(
        r#"        <section class="panel">
            <h1>Log in</h1>
            {alert}
            <form method="post" action="/login">
                <label for="username">Username</label>
                <input id="username" name="username" value="{username}" required>
                {username_errors}
                <label for="password">Password</label>
                <input id="password" type="password" name="password" required>
                {password_errors}
                <button type="submit">Log in</button>
            </form>
        </section>"#,
        alert = alert,
        username = escape_html(page.username),
        username_errors = field_errors(page.errors, "username"),
        password_errors = field_errors(page.errors, "password"),
    );

    render_layout(PageLayout {
        title: "Log in",
        viewer: page.viewer,
        flash: page.flash,
        body_html,
    })
}

pub struct UploadPage<'a> {
    pub viewer: Option<&'a str>,
    pub flash: Option<Flash>,
    pub errors: Option<&'a FormErrors>,
}

pub fn render_upload_page(page: UploadPage<'_>) -> String {
    let body_html = format!(
        r#"        <section class="panel">
            <h1>Upload an image</h1>
            <form method="post" action="/upload" enctype="multipart/form-data">
                <label for="file">Upload Image</label>
                <input id="file" type="file" name="file" accept=".jpg,.png" required>
                {file_errors}
                <button type="submit">Upload</button>
            </form>
            <p class="note">Only .jpg and .png files are accepted. A file with the same name replaces the earlier one.</p>
        </section>"#,
        file_errors = field_errors(page.errors, "file"),
    );

    render_layout(PageLayout {
        title: "Upload",
        viewer: page.viewer,
        flash: page.flash,
        body_html,
    })
}

pub fn render_files_page(viewer: &str, flash: Option<Flash>, image_files: &[String]) -> String {
    let listing = if image_files.is_empty() {
        r#"<p class="note">No images have been uploaded yet.</p>"#.to_string()
    } else {
        let items = image_files
            .iter()
            .map(|name| {
                let name = escape_html(name);
                format!(
                    r#"<li><img src="/uploads/{name}" alt="{name}" loading="lazy"><a href="/uploads/{name}">{name}</a></li>"#
                )
            })
            .collect::<String>();
        format!(r#"<ul class="gallery">{items}</ul>"#)
    };

    render_layout(PageLayout {
        title: "Files",
        viewer: Some(viewer),
        flash,
        body_html: format!(
            r#"        <section class="panel">
            <h1>Uploaded images</h1>
            {listing}
        </section>"#
        ),
    })
}

pub fn render_not_found_page() -> String {
    render_layout(PageLayout {
        title: "Page not found",
        viewer: None,
        flash: None,
        body_html: r#"        <section class="panel">
            <h1>404 - Page not found</h1>
            <p class="note">The page you were looking for does not exist.</p>
            <p><a href="/">Back to the home page</a></p>
        </section>"#
            .to_string(),
    })
}

pub fn render_server_error_page() -> String {
    render_layout(PageLayout {
        title: "Server error",
        viewer: None,
        flash: None,
        body_html: r#"        <section class="panel">
            <h1>Something went wrong</h1>
            <p class="note">The request could not be completed. Please try again later.</p>
        </section>"#
            .to_string(),
    })
}

fn field_errors(errors: Option<&FormErrors>, field: &str) -> String {
    let Some(messages) = errors.map(|errors| errors.for_field(field)) else {
        return String::new();
    };
    if messages.is_empty() {
        return String::new();
    }

    let items = messages
        .iter()
        .map(|message| format!("<li>{}</li>", escape_html(message)))
        .collect::<String>();
    format!(r#"<ul class="field-errors">{items}</ul>"#)
}

pub fn render_footer() -> String {
    let current_year = Utc::now().year();
    format!(
        r#"<footer class="app-footer">© {year} {site}</footer>"#,
        year = current_year,
        site = SITE_NAME,
    )
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn login_page_shows_field_errors_and_keeps_username() {
        let mut errors = FormErrors::default();
        errors.add("password", "This field is required.");

        let html = render_login_page(LoginPage {
            username: "<alice>",
            errors: Some(&errors),
            ..LoginPage::default()
        });

        assert!(html.contains(r#"value="&lt;alice&gt;""#));
        assert!(html.contains("<li>This field is required.</li>"));
    }

    #[test]
    fn layout_switches_account_controls() {
        let anonymous = render_home_page(None, None);
        assert!(anonymous.contains(r#"href="/login""#));

        let signed_in = render_home_page(Some("bob"), Some(Flash::Uploaded));
        assert!(signed_in.contains("Signed in as <strong>bob</strong>"));
        assert!(signed_in.contains("File successfully uploaded!"));
    }

    #[test]
    fn files_page_links_each_image() {
        let html = render_files_page("bob", None, &["a.png".to_string()]);
        assert!(html.contains(r#"<img src="/uploads/a.png""#));

        let empty = render_files_page("bob", None, &[]);
        assert!(empty.contains("No images have been uploaded yet."));
    }
}
