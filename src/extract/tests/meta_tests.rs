use crate::extract::meta;

#[test]
fn test_full_head_extraction() {
    let html = r#"<html lang="en-US"><head>
        <title> Acme Widgets </title>
        <meta name="description" content="Widgets for everyone">
        <meta name="keywords" content="widgets, gears , sprockets,">
        <meta name="author" content="Acme Inc">
        <link rel="canonical" href="https://acme.example/">
        <link rel="icon" href="/favicon.ico">
        <meta property="og:title" content="Acme">
        <meta property="og:image" content="https://acme.example/og.png">
        <meta name="twitter:card" content="summary">
    </head><body></body></html>"#;

    let section = meta::extract(html);

    assert_eq!(section.title.as_deref(), Some("Acme Widgets"));
    assert_eq!(section.description.as_deref(), Some("Widgets for everyone"));
    assert_eq!(section.keywords, vec!["widgets", "gears", "sprockets"]);
    assert_eq!(section.author.as_deref(), Some("Acme Inc"));
    assert_eq!(section.language.as_deref(), Some("en-US"));
    assert_eq!(section.canonical.as_deref(), Some("https://acme.example/"));
    assert_eq!(section.favicon.as_deref(), Some("/favicon.ico"));

    assert_eq!(section.opengraph.get("title").unwrap(), "Acme");
    assert_eq!(
        section.opengraph.get("image").unwrap(),
        "https://acme.example/og.png"
    );
    assert_eq!(section.twitter.get("card").unwrap(), "summary");
}

#[test]
fn test_missing_fields_stay_absent() {
    let section = meta::extract("<html><head></head><body></body></html>");

    assert_eq!(section.title, None);
    assert_eq!(section.description, None);
    assert_eq!(section.language, None);
    assert_eq!(section.canonical, None);
    assert!(section.keywords.is_empty());
    assert!(section.opengraph.is_empty());
    assert!(section.twitter.is_empty());
}

#[test]
fn test_language_meta_tag_beats_html_attribute() {
    let html = r#"<html lang="de"><head>
        <meta name="language" content="fr">
    </head><body></body></html>"#;
    let section = meta::extract(html);
    assert_eq!(section.language.as_deref(), Some("fr"));
}

#[test]
fn test_empty_title_is_none_not_empty_string() {
    let section = meta::extract("<html><head><title>  </title></head><body></body></html>");
    assert_eq!(section.title, None);
}

#[test]
fn test_social_prefixes_match_case_insensitively() {
    let html = r#"<head>
        <meta property="OG:Title" content="Acme">
        <meta name="Twitter:Card" content="summary">
    </head>"#;
    let section = meta::extract(html);
    assert_eq!(section.opengraph.get("title").unwrap(), "Acme");
    assert_eq!(section.twitter.get("card").unwrap(), "summary");
}

#[test]
fn test_first_og_tag_wins_on_duplicates() {
    let html = r#"<head>
        <meta property="og:title" content="First">
        <meta property="og:title" content="Second">
    </head>"#;
    let section = meta::extract(html);
    assert_eq!(section.opengraph.get("title").unwrap(), "First");
}
