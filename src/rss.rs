use crate::config::Config;
use crate::models::Language;
use crate::posts::Post;
use chrono::{TimeZone, Utc};
use rss::{CategoryBuilder, ChannelBuilder, GuidBuilder, ItemBuilder};

fn format_rss_date(post: &Post) -> String {
    Utc.from_utc_datetime(&post.published).to_rfc2822()
}

/// Feed of the newest posts as a `lang` reader sees them.
pub fn generate_rss(posts: &[Post], config: &Config, lang: Language) -> String {
    let items: Vec<_> = posts
        .iter()
        .take(15)
        .map(|p| {
            let link = format!(
                "{}{}/{}/posts/{}.html",
                config.base_url, config.base, lang, p.slug
            );
            let categories = p
                .tags
                .iter()
                .map(|t| CategoryBuilder::default().name(t.clone()).build())
                .collect::<Vec<_>>();
            ItemBuilder::default()
                .title(Some(p.title.clone()))
                .link(Some(link.clone()))
                .guid(Some(GuidBuilder::default().value(link).permalink(true).build()))
                .description(Some(p.description.clone()))
                .categories(categories)
                .pub_date(Some(format_rss_date(p)))
                .build()
        })
        .collect();

    ChannelBuilder::default()
        .title(config.site.title.clone())
        .link(format!("{}{}/{}/", config.base_url, config.base, lang))
        .description(config.site.description.clone())
        .language(Some(lang.code().to_string()))
        .items(items)
        .build()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    #[test]
    fn feed_links_point_at_language_pages() {
        let post = Post {
            title: "Привіт".into(),
            date: "2024-05-01".into(),
            tags: vec!["rust".into()],
            slug: "hello".into(),
            description: "Перший".into(),
            reading_time: "3 хв".into(),
            language: Language::Ua,
            variant: Some(Language::Ua),
            published: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            source: PathBuf::new(),
            body: String::new(),
        };
        let mut config = Config::default();
        config.base_url = "https://blog.example".into();

        let xml = generate_rss(&[post], &config, Language::Ua);
        assert!(xml.contains("<link>https://blog.example/ua/posts/hello.html</link>"));
        assert!(xml.contains("<language>ua</language>"));
        assert!(xml.contains("May 2024 00:00:00 +0000"));
        assert!(xml.contains("<category>rust</category>"));
    }
}
