use crate::highlight::{self, HighlightError, Highlighter};
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};

/// Compiles a markdown post body into Tera template source.
///
/// Prose and raw HTML pass through, so posts may use template expressions
/// such as `{{ site.title }}`. Code (fenced and inline) is neutralized so its
/// braces are never evaluated; fenced blocks are highlighted when a
/// highlighter is given.
pub async fn compile_post(
    md: &str,
    highlighter: Option<&Highlighter>,
) -> Result<String, HighlightError> {
    let parsed: Vec<Event> = Parser::new_ext(md, Options::all()).collect();

    let mut events = Vec::new();
    let mut temp_code = String::new();
    let mut in_code_block = false;
    let mut current_lang: Option<String> = None;

    for event in parsed {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                temp_code.clear();
                current_lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split(|c: char| c.is_whitespace() || c == ',')
                        .next()
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
            }
            Event::End(TagEnd::CodeBlock) if in_code_block => {
                in_code_block = false;
                let markup = match highlighter {
                    Some(h) => h.highlight(&temp_code, current_lang.as_deref()).await?,
                    None => highlight::plain_block(&temp_code),
                };
                events.push(Event::Html(highlight::embed(&markup).into()));
            }
            Event::Text(text) if in_code_block => temp_code.push_str(&text),
            Event::Code(code) => {
                let inline = format!(
                    "<code>{}</code>",
                    tera::escape_html(&code).replace('{', "&#123;")
                );
                events.push(Event::InlineHtml(CowStr::from(inline)));
            }
            _ => {
                if !in_code_block {
                    events.push(event);
                }
            }
        }
    }

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());
    Ok(html_output)
}

/// Strips Markdown syntax to produce clean plain text for search indexing.
pub fn strip_markdown(md: &str) -> String {
    let parser = Parser::new(md);
    let mut plain_text = String::new();

    for event in parser {
        match event {
            Event::Text(text) | Event::Code(text) => {
                plain_text.push_str(&text);
                plain_text.push(' ');
            }
            _ => {}
        }
    }
    plain_text.trim().to_string()
}
