use crate::extract::assets::{background_refs, scan_refs};
use crate::results::AssetKind;

#[test]
fn test_img_src_and_srcset_candidates() {
    let html = r#"<body>
        <img src="/hero.jpg" alt="Hero"
             srcset="/hero-480.jpg 480w, /hero-960.jpg 960w">
        <img data-src="/lazy.png" alt="">
    </body>"#;
    let refs = scan_refs(html);

    let urls: Vec<&str> = refs.iter().map(|r| r.original_url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["/hero.jpg", "/hero-480.jpg", "/hero-960.jpg", "/lazy.png"]
    );
    assert!(refs.iter().all(|r| r.kind == AssetKind::Image));
    assert_eq!(refs[0].alt_text.as_deref(), Some("Hero"));
    // srcset candidates inherit the img's alt
    assert_eq!(refs[1].alt_text.as_deref(), Some("Hero"));
    // Empty alt stays absent
    assert_eq!(refs[3].alt_text, None);
}

#[test]
fn test_inline_svg_is_self_contained() {
    let html = r#"<body>
        <svg viewBox="0 0 10 10"><circle r="4"/></svg>
        <svg><use href='#icon'/></svg>
    </body>"#;
    let refs = scan_refs(html);

    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].kind, AssetKind::Svg);
    assert_eq!(refs[0].original_url, "inline:svg:0");
    assert!(refs[0].inline_markup.as_deref().unwrap().contains("circle"));
    assert_eq!(refs[1].original_url, "inline:svg:1");
}

#[test]
fn test_nested_svg_not_double_counted() {
    let html = r#"<body><svg><svg x="1"></svg></svg></body>"#;
    let refs = scan_refs(html);
    assert_eq!(refs.len(), 1);
}

#[test]
fn test_imgs_without_source_are_ignored() {
    let refs = scan_refs(r#"<body><img alt="broken"><img src=""></body>"#);
    assert!(refs.is_empty());
}

#[test]
fn test_background_url_parsing() {
    let values = vec![
        r#"url("https://cdn.example/bg.jpg")"#.to_string(),
        r#"url('/tile.png')"#.to_string(),
        "url(/plain.gif)".to_string(),
        // Layered backgrounds contribute every url
        r#"url("/a.png"), url("/b.png")"#.to_string(),
        "linear-gradient(red, blue)".to_string(),
    ];
    let refs = background_refs(&values);

    let urls: Vec<&str> = refs.iter().map(|r| r.original_url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://cdn.example/bg.jpg",
            "/tile.png",
            "/plain.gif",
            "/a.png",
            "/b.png"
        ]
    );
    assert!(refs.iter().all(|r| r.kind == AssetKind::Background));
}
