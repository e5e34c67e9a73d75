//! HTML rendering for share pages.
//!
//! The page carries Open Graph tags pointing at the composite image so link
//! previews look right, then boots the client application. Rendering is pure;
//! all dynamic values are escaped by [maud](https://maud.lambda.xyz/).

pub mod components;

use maud::{DOCTYPE, Markup, PreEscaped, html};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::config::Config;
use crate::share::SharePage;
use components::{OpenGraphData, PAGE_CSS, analytics_bootstrap, bundle_loader, open_graph_tags};

/// Characters escaped when an id is placed back into a URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Render the share page for a stored composite.
pub fn render_share_page(page: &SharePage, config: &Config) -> Markup {
    let canonical = format!(
        "{}/share/{}",
        config.base_url,
        utf8_percent_encode(&page.image_id, PATH_SEGMENT)
    );
    let image = page.image_url.as_str();

    let og = OpenGraphData {
        url: &canonical,
        og_type: "website",
        title: &config.site_name,
        description: &config.site_description,
        image,
        image_width: page.width,
        image_height: page.height,
    };

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (config.site_name) }
                meta name="description" content=(config.site_description);
                link rel="canonical" href=(canonical);

                (open_graph_tags(&og))

                style { (PreEscaped(PAGE_CSS)) }
                (analytics_bootstrap(&config.analytics))
            }
            body {
                noscript { "You need to enable JavaScript to run this app." }
                div id="root" {
                    div class="boot" {
                        img src=(image) alt=(config.site_name) width=(page.width) height=(page.height);
                    }
                }
                (bundle_loader(&config.bundle_path))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;

    fn page() -> SharePage {
        SharePage {
            image_id: "abc123".to_string(),
            image_url: Url::parse("memory://blobs/thumbnail/overlay_abc123").unwrap(),
            width: 450,
            height: 800,
        }
    }

    #[test]
    fn page_has_open_graph_tags() {
        let config = Config {
            base_url: "https://peeq.app".to_string(),
            ..Config::default()
        };
        let html = render_share_page(&page(), &config).into_string();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<meta property="og:url" content="https://peeq.app/share/abc123">"#));
        assert!(html.contains(
            r#"<meta property="og:image" content="memory://blobs/thumbnail/overlay_abc123">"#
        ));
        assert!(html.contains(r#"<meta property="og:image:width" content="450">"#));
        assert!(html.contains(r#"<meta property="og:image:height" content="800">"#));
        assert!(html.contains(r#"<meta property="og:title" content="Peeq">"#));
        assert!(html.contains(r#"<div id="root">"#));
        assert!(html.contains("/static/js/main.js"));
    }

    #[test]
    fn query_strings_are_attribute_escaped() {
        let mut page = page();
        page.image_url = Url::parse(
            "https://firebasestorage.googleapis.com/v0/b/b/o/thumbnail%2Foverlay_abc123?alt=media&token=t",
        )
        .unwrap();
        let html = render_share_page(&page, &Config::default()).into_string();
        assert!(html.contains("overlay_abc123?alt=media&amp;token=t"));
    }

    #[test]
    fn canonical_url_reencodes_image_id() {
        let mut page = page();
        page.image_id = "a b/c".to_string();
        let html = render_share_page(&page, &Config::default()).into_string();
        assert!(html.contains(r#"<link rel="canonical" href="http://localhost:8080/share/a%20b%2Fc">"#));
    }

    #[test]
    fn site_text_is_escaped() {
        let config = Config {
            site_name: "<Peeq & Co>".to_string(),
            ..Config::default()
        };
        let html = render_share_page(&page(), &config).into_string();
        assert!(html.contains("&lt;Peeq &amp; Co&gt;"));
        assert!(!html.contains("<Peeq & Co>"));
    }
}
