use crate::build::{perform_build, process_html, Defaults};
use crate::config::Config;
use crate::highlight::Highlighter;
use crate::models::Language;
use crate::pages::{self, PageError};
use crate::prefs::Preference;
use crate::site::Site;
use anyhow::Result;
use axum::{
    Router,
    extract::{
        Path as UrlPath, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use console::style;
use notify::{recommended_watcher, RecursiveMode, Result as NotifyResult, Watcher};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast, mpsc};
use tower_http::services::ServeDir;

#[derive(Clone)]
struct AppState {
    site: Arc<RwLock<Arc<Site>>>,
    defaults: Defaults,
    reload: broadcast::Sender<()>,
}

#[derive(Debug, Deserialize)]
struct LangQuery {
    lang: Option<String>,
}

/// `?lang=` first, then the `blog-language` cookie, then the stored preference.
fn request_language(query: &LangQuery, headers: &HeaderMap, fallback: Language) -> Language {
    if let Some(lang) = query.lang.as_deref().and_then(|l| l.parse().ok()) {
        return lang;
    }
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == Language::STORAGE_KEY)
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(fallback)
}

fn respond(state: &AppState, site: &Site, rendered: Result<String, PageError>, lang: Language) -> Response {
    let minify = site.config.build.minify_html;
    match rendered {
        Ok(html) => Html(process_html(html, minify, true)).into_response(),
        Err(PageError::NotFound(what)) => {
            let message = PageError::NotFound(what).to_string();
            match pages::render_not_found(site, &message, lang, state.defaults.theme) {
                Ok(html) => (StatusCode::NOT_FOUND, Html(process_html(html, minify, true))).into_response(),
                Err(_) => (StatusCode::NOT_FOUND, message).into_response(),
            }
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn home(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    headers: HeaderMap,
) -> Response {
    let site = state.site.read().await.clone();
    let lang = request_language(&query, &headers, state.defaults.language);
    let rendered = pages::render_home(&site, lang, state.defaults.theme);
    respond(&state, &site, rendered, lang)
}

async fn language_home(State(state): State<AppState>, UrlPath(lang): UrlPath<String>) -> Response {
    let site = state.site.read().await.clone();
    let rendered = match lang.parse::<Language>() {
        Ok(lang) => pages::render_home(&site, lang, state.defaults.theme),
        Err(_) => Err(PageError::NotFound(lang)),
    };
    respond(&state, &site, rendered, state.defaults.language)
}

async fn language_post(
    State(state): State<AppState>,
    UrlPath((lang, file)): UrlPath<(String, String)>,
) -> Response {
    let site = state.site.read().await.clone();
    let slug = file.strip_suffix(".html").unwrap_or(&file);
    let (rendered, lang) = match lang.parse::<Language>() {
        Ok(lang) => (pages::render_post(&site, slug, lang, state.defaults.theme), lang),
        Err(_) => (Err(PageError::NotFound(slug.to_string())), state.defaults.language),
    };
    respond(&state, &site, rendered, lang)
}

async fn language_tag(
    State(state): State<AppState>,
    UrlPath((lang, file)): UrlPath<(String, String)>,
) -> Response {
    let site = state.site.read().await.clone();
    let tag = file.strip_suffix(".html").unwrap_or(&file);
    let (rendered, lang) = match lang.parse::<Language>() {
        Ok(lang) => (pages::render_tag(&site, tag, lang, state.defaults.theme), lang),
        Err(_) => (Err(PageError::NotFound(tag.to_string())), state.defaults.language),
    };
    respond(&state, &site, rendered, lang)
}

/// Language-neutral post link; the reader's language picks the variant.
async fn post(
    State(state): State<AppState>,
    UrlPath(slug): UrlPath<String>,
    Query(query): Query<LangQuery>,
    headers: HeaderMap,
) -> Response {
    let site = state.site.read().await.clone();
    let lang = request_language(&query, &headers, state.defaults.language);
    let rendered = pages::render_post(&site, &slug, lang, state.defaults.theme);
    respond(&state, &site, rendered, lang)
}

async fn tag(
    State(state): State<AppState>,
    UrlPath(tag): UrlPath<String>,
    Query(query): Query<LangQuery>,
    headers: HeaderMap,
) -> Response {
    let site = state.site.read().await.clone();
    let lang = request_language(&query, &headers, state.defaults.language);
    let rendered = pages::render_tag(&site, &tag, lang, state.defaults.theme);
    respond(&state, &site, rendered, lang)
}

async fn live(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let rx = state.reload.subscribe();
    ws.on_upgrade(move |socket| forward_reloads(socket, rx))
}

async fn forward_reloads(mut socket: WebSocket, mut rx: broadcast::Receiver<()>) {
    while rx.recv().await.is_ok() {
        if socket.send(Message::Text("reload".into())).await.is_err() {
            break;
        }
    }
}

fn router(state: AppState, output_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/posts/{slug}", get(post))
        .route("/tags/{tag}", get(tag))
        .route("/{lang}/", get(language_home))
        .route("/{lang}/posts/{file}", get(language_post))
        .route("/{lang}/tags/{file}", get(language_tag))
        .route("/__lystok/live", get(live))
        .fallback_service(ServeDir::new(output_dir))
        .with_state(state)
}

/// Serve the site and rebuild it whenever its sources change.
pub async fn serve(
    config: Config,
    highlighter: Arc<Highlighter>,
    defaults: Defaults,
    port: u16,
    verbose: bool,
) -> Result<()> {
    // initial build
    let site = perform_build(&config, &highlighter, defaults, verbose, true).await?;
    let (reload, _) = broadcast::channel(16);
    let state = AppState {
        site: Arc::new(RwLock::new(Arc::new(site))),
        defaults,
        reload: reload.clone(),
    };

    // watcher: signal the rebuild task on any content change
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = recommended_watcher(move |res: NotifyResult<notify::Event>| {
        if let Ok(event) = res {
            if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                let _ = tx.send(());
            }
        }
    })?;
    for dir in [
        &config.posts_dir,
        &config.templates_dir,
        &config.i18n_dir,
        &config.static_dir,
        &config.sass_dir,
    ] {
        if dir.exists() {
            watcher.watch(dir, RecursiveMode::Recursive)?;
        }
    }

    let rebuild_state = state.clone();
    let rebuild_config = config.clone();
    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            // collapse bursts of events into one rebuild
            while rx.try_recv().is_ok() {}
            match perform_build(&rebuild_config, &highlighter, defaults, verbose, true).await {
                Ok(site) => {
                    *rebuild_state.site.write().await = Arc::new(site);
                    let _ = rebuild_state.reload.send(());
                    println!("{} rebuilt", style("success").cyan());
                }
                // keep serving the last good site
                Err(e) => eprintln!("{} {:#}", style("error").red(), e),
            }
        }
    });

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!("{}", style(format!(" Listening at http://{}", addr)).yellow());

    let app = router(state, &config.output_dir);
    axum::serve(listener, app).await?;
    drop(watcher);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::HighlightSettings;
    use crate::models::Theme;
    use crate::site::fixtures::project;
    use axum::http::HeaderValue;

    async fn state(root: &std::path::Path) -> AppState {
        let config = project(root);
        let highlighter = Highlighter::new(HighlightSettings::from(&config.build));
        let site = Site::load(config, &highlighter).await.unwrap();
        AppState {
            site: Arc::new(RwLock::new(Arc::new(site))),
            defaults: Defaults { language: Language::En, theme: Theme::Dark },
            reload: broadcast::channel(4).0,
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn query(lang: Option<&str>) -> LangQuery {
        LangQuery {
            lang: lang.map(str::to_string),
        }
    }

    #[test]
    fn query_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("blog-language=en"));
        assert_eq!(
            request_language(&query(Some("ua")), &headers, Language::En),
            Language::Ua
        );
    }

    #[test]
    fn cookie_is_read_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; blog-language=UA"),
        );
        assert_eq!(request_language(&query(None), &headers, Language::En), Language::Ua);
    }

    #[test]
    fn invalid_values_fall_back() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("blog-language=fr"));
        assert_eq!(
            request_language(&query(Some("xx")), &headers, Language::Ua),
            Language::Ua
        );
    }

    #[tokio::test]
    async fn missing_post_is_a_rendered_404() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path()).await;
        let response = post(
            State(state),
            UrlPath("ghost".to_string()),
            Query(query(None)),
            HeaderMap::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let html = body_text(response).await;
        assert!(html.contains("Could not find ghost"));
        assert!(html.contains("lystok-live-reload"));
    }

    #[tokio::test]
    async fn neutral_post_route_follows_cookie_language() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path()).await;
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("blog-language=ua"));
        let response = post(
            State(state),
            UrlPath("hello".to_string()),
            Query(query(None)),
            headers,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Привіт"));
        assert!(html.contains("class=\"dark\""));
    }

    #[tokio::test]
    async fn unknown_language_segment_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path()).await;
        let response = language_home(State(state), UrlPath("fr".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
