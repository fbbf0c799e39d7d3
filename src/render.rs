//! Server-side HTML for the detection page.

use std::fmt::Write as _;

use crate::diagnosis::{DiagnosisResult, NO_DISEASE_SENTINEL};
use crate::page::{Page, ViewState};

pub const NO_PRECAUTIONS: &str = "No precautions available";

const STYLE: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            background: linear-gradient(135deg, #56ab2f 0%, #a8e063 100%);
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            padding: 20px;
        }

        .container {
            background: white;
            border-radius: 20px;
            box-shadow: 0 20px 60px rgba(0,0,0,0.3);
            max-width: 672px;
            width: 100%;
            padding: 40px;
        }

        h1 { color: #333; margin-bottom: 24px; font-size: 1.6em; }
        h2 { color: #333; margin-bottom: 12px; font-size: 1.2em; }

        label { display: block; color: #333; font-weight: 600; margin-bottom: 8px; }

        input[type="file"] {
            width: 100%;
            padding: 10px;
            border: 2px dashed #56ab2f;
            border-radius: 10px;
            background: #f6fbf2;
            margin-bottom: 20px;
        }

        .preview {
            aspect-ratio: 16 / 9;
            margin-bottom: 20px;
        }

        .preview img {
            width: 100%;
            height: 100%;
            object-fit: cover;
            border-radius: 10px;
            box-shadow: 0 4px 15px rgba(0,0,0,0.1);
        }

        button {
            width: 100%;
            padding: 12px;
            border: none;
            border-radius: 10px;
            background: #2f7d1f;
            color: white;
            font-size: 1em;
            font-weight: 600;
            cursor: pointer;
        }

        button:disabled { background: #9bbf92; cursor: not-allowed; }

        .result {
            background: #f6fbf2;
            border-radius: 10px;
            padding: 20px;
            margin-top: 20px;
            line-height: 1.6;
        }

        .result ul { padding-left: 20px; list-style: disc; }

        .error {
            background: #fee;
            border: 2px solid #fcc;
            color: #c33;
            padding: 15px;
            border-radius: 10px;
            margin-bottom: 20px;
        }
"#;

const SCRIPT: &str = r#"
        document.getElementById('image-upload').addEventListener('change', (e) => {
            if (e.target.files.length > 0) {
                e.target.form.submit();
            }
        });

        document.getElementById('detect-form').addEventListener('submit', () => {
            const button = document.getElementById('detect-button');
            button.disabled = true;
            button.textContent = 'Detecting...';
        });
"#;

/// Minimal escaping for text and double-quoted attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_page(page: &Page, notice: Option<&str>) -> String {
    let mut body = String::new();

    if let Some(notice) = notice {
        let _ = write!(body, r#"<div class="error" role="alert">{}</div>"#, escape_html(notice));
    }

    body.push_str(
        r#"<form action="/upload" method="post" enctype="multipart/form-data">
            <label for="image-upload">Upload Crop Image</label>
            <input id="image-upload" name="image" type="file" accept="image/*">
        </form>"#,
    );

    if let Some(image) = page.image() {
        let _ = write!(
            body,
            r#"<div class="preview"><img src="{}" alt="Uploaded crop" width="640" height="360"></div>"#,
            escape_html(&image.data_url())
        );
    }

    let state = page.view_state();
    let label = if state == ViewState::Detecting { "Detecting..." } else { "Detect" };
    let disabled = if page.can_detect() { "" } else { " disabled" };
    let _ = write!(
        body,
        r#"<form id="detect-form" action="/detect" method="post"><button id="detect-button" type="submit"{disabled}>{label}</button></form>"#
    );

    match (state, page.result()) {
        (ViewState::ResultPositive, Some(result)) => body.push_str(&render_positive(result)),
        (ViewState::ResultNegative, Some(_)) => body.push_str(&render_negative()),
        _ => {}
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Crop Disease Detection</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
        <h1>Crop Disease Detection</h1>
        {body}
    </div>
    <script>{SCRIPT}</script>
</body>
</html>
"#
    )
}

fn render_positive(result: &DiagnosisResult) -> String {
    let items = match result.precautions.as_list() {
        Some(list) => list
            .iter()
            .map(|item| format!("<li>{}</li>", escape_html(item)))
            .collect::<String>(),
        None => format!("<li>{NO_PRECAUTIONS}</li>"),
    };

    format!(
        r#"<section class="result" id="result-positive">
            <h2>Detection Results</h2>
            <p><strong>Disease:</strong> {}</p>
            <p><strong>Cause:</strong> {}</p>
            <div><strong>Precautions:</strong><ul>{items}</ul></div>
        </section>"#,
        escape_html(result.disease.as_deref().unwrap_or_default()),
        escape_html(result.cause.as_deref().unwrap_or_default()),
    )
}

fn render_negative() -> String {
    format!(
        r#"<section class="result" id="result-negative">
            <h2>Detection Results</h2>
            <p>{}</p>
        </section>"#,
        NO_DISEASE_SENTINEL
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::parse_reply;
    use crate::encoder::encode_image;

    fn page_with_reply(reply: &str) -> Page {
        let mut page = Page::new();
        page.select_image(encode_image(b"leaf", Some("image/jpeg")));
        page.begin_detect();
        page.finish_detect(parse_reply(reply));
        page
    }

    #[test]
    fn idle_page_has_disabled_detect_and_no_result() {
        let html = render_page(&Page::new(), None);
        assert!(html.contains(r#"accept="image/*""#));
        assert!(html.contains(r#"type="submit" disabled>Detect<"#));
        assert!(!html.contains("<img"));
        assert!(!html.contains("Detection Results"));
    }

    #[test]
    fn ready_page_shows_preview_and_enabled_detect() {
        let mut page = Page::new();
        page.select_image(encode_image(b"leaf", Some("image/jpeg")));
        let html = render_page(&page, None);
        assert!(html.contains(r#"src="data:image/jpeg;base64,bGVhZg==""#));
        assert!(html.contains(r#"type="submit">Detect<"#));
    }

    #[test]
    fn detecting_page_hides_result_and_disables_button() {
        let mut page = page_with_reply(r#"{"disease": "Rust", "cause": "Fungus", "precautions": []}"#);
        page.begin_detect();
        let html = render_page(&page, None);
        assert!(html.contains(r#"disabled>Detecting...<"#));
        assert!(!html.contains("Detection Results"));
    }

    #[test]
    fn positive_result_lists_every_precaution() {
        let page = page_with_reply(
            r#"{"disease": "Early blight", "cause": "Alternaria solani", "precautions": ["Mulch", "Water at the base"]}"#,
        );
        let html = render_page(&page, None);
        assert!(html.contains("<strong>Disease:</strong> Early blight"));
        assert!(html.contains("<strong>Cause:</strong> Alternaria solani"));
        assert!(html.contains("<ul><li>Mulch</li><li>Water at the base</li></ul>"));
        assert!(!html.contains("result-negative"));
    }

    #[test]
    fn sentinel_renders_negative_panel_only() {
        let page = page_with_reply(
            r#"{"disease": "No crop disease detected.", "cause": "Something odd", "precautions": ["Ignore me"]}"#,
        );
        let html = render_page(&page, None);
        assert!(html.contains("result-negative"));
        assert!(!html.contains("result-positive"));
        assert!(!html.contains("Ignore me"));
    }

    #[test]
    fn non_array_precautions_fall_back() {
        let page = page_with_reply(r#"{"disease": "Smut", "cause": "Fungus", "precautions": "Burn residue"}"#);
        let html = render_page(&page, None);
        assert!(html.contains("<ul><li>No precautions available</li></ul>"));
        assert!(!html.contains("Burn residue"));
    }

    #[test]
    fn non_string_precautions_in_an_array_still_render() {
        let page = page_with_reply(r#"{"disease": "Wilt", "cause": 7, "precautions": ["Prune", 3]}"#);
        let html = render_page(&page, None);
        assert!(html.contains("<strong>Cause:</strong> 7"));
        assert!(html.contains("<ul><li>Prune</li><li>3</li></ul>"));
    }

    #[test]
    fn model_text_is_escaped() {
        let page = page_with_reply(r#"{"disease": "<script>x</script>", "cause": "a & b", "precautions": ["\"q\""]}"#);
        let html = render_page(&page, None);
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(html.contains("<li>&quot;q&quot;</li>"));
    }

    #[test]
    fn notice_is_rendered_as_alert() {
        let html = render_page(&Page::new(), Some("Failed to detect crop disease."));
        assert!(html.contains(r#"<div class="error" role="alert">Failed to detect crop disease.</div>"#));
    }
}
