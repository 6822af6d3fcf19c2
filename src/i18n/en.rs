use serde_json::{json, Value};

pub fn dictionary() -> Value {
    json!({
        "header": {
            "tagline": "Insights on modern web development",
        },
        "nav": {
            "home": "Home",
            "about": "About",
            "contacts": "Contacts",
        },
        "blog": {
            "read-more": "Read more",
            "reading-time": "min read",
            "no-posts": "No posts found",
            "search-results": "Search results",
        },
        "search": {
            "title": "Search",
            "placeholder": "Search articles...",
            "no-results": "No articles found",
        },
        "tags": {
            "title": "Tags",
            "all": "All tags",
        },
        "buttons": {
            "toggle-theme": "Toggle theme",
            "toggle-language": "Toggle language",
            "back-to-home": "Back to home",
        },
        "error": {
            "page-not-found": "Page not found",
            "something-went-wrong": "Something went wrong",
            "go-back": "Go back",
        },
        "footer": {
            "copyright": "All rights reserved",
        },
    })
}
