//! # sb-ui
//!
//! Askama templates for the blog pages and HTML rendering of post bodies.

use askama::Template;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sb_core::models::{Comment, ContentBlock, Post, ViewSnapshot};

/// Everything but RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Link to a post page. The result is a URL, not HTML; templates escape it.
pub fn post_href(id: &str) -> String {
    format!("/blog/{}", utf8_percent_encode(id, PATH_SEGMENT))
}

/// Renders one body block. Unknown blocks render as nothing.
pub fn render_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::H1(heading) => format!("<h1>{}</h1>", text(heading)),
        ContentBlock::H2(heading) => format!("<h2>{}</h2>", text(heading)),
        ContentBlock::H3(heading) => format!("<h3>{}</h3>", text(heading)),
        ContentBlock::Paragraph(body) => format!("<p>{}</p>", text(body)),
        ContentBlock::List(items) => {
            let items: String = items
                .iter()
                .map(|item| format!("<li>{}</li>", text(item)))
                .collect();
            format!("<ul>{items}</ul>")
        }
        ContentBlock::DescList(items) => {
            let items: String = items
                .iter()
                .map(|item| format!("<dt>{}</dt><dd>{}</dd>", text(&item.term), text(&item.details)))
                .collect();
            format!("<dl>{items}</dl>")
        }
        ContentBlock::Image(image) => {
            let caption = image.caption.as_deref().unwrap_or_default();
            let figcaption = if caption.is_empty() {
                String::new()
            } else {
                format!("<figcaption>{}</figcaption>", text(caption))
            };
            format!(
                "<figure><img src=\"{}\" alt=\"{}\">{figcaption}</figure>",
                attr(&image.url),
                attr(caption)
            )
        }
        ContentBlock::Unknown { .. } => String::new(),
    }
}

pub fn render_blocks(blocks: &[ContentBlock]) -> String {
    blocks.iter().map(render_block).collect()
}

pub struct CommentView {
    pub id: String,
    pub name: String,
    pub photo_url: String,
    pub text: String,
    pub date: String,
    pub edited: bool,
}

impl From<&Comment> for CommentView {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id.clone(),
            name: comment.name.clone(),
            photo_url: comment.photo_url.clone().unwrap_or_default(),
            text: comment.comment.clone(),
            date: comment.date.clone(),
            edited: comment.is_edited(),
        }
    }
}

pub struct PostLink {
    pub href: String,
    pub title: String,
    pub date: String,
    pub description: String,
}

impl From<&Post> for PostLink {
    fn from(post: &Post) -> Self {
        Self {
            href: post_href(&post.id),
            title: post.title.clone(),
            date: post.date.clone(),
            description: post.description.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub found: bool,
    pub title: String,
    pub date: String,
    pub author: String,
    pub category: String,
    pub image: String,
    pub body_html: String,
    pub prev_href: String,
    pub next_href: String,
    pub comments: Vec<CommentView>,
    pub related: Vec<PostLink>,
}

impl PostTemplate {
    pub fn from_view(view: &ViewSnapshot) -> Self {
        let Some(post) = &view.current_post else {
            return Self {
                found: false,
                title: "Post not found".into(),
                date: String::new(),
                author: String::new(),
                category: String::new(),
                image: String::new(),
                body_html: String::new(),
                prev_href: String::new(),
                next_href: String::new(),
                comments: Vec::new(),
                related: Vec::new(),
            };
        };

        Self {
            found: true,
            title: post.title.clone(),
            date: post.date.clone(),
            author: post.author.clone().unwrap_or_default(),
            category: post.category.clone().unwrap_or_default(),
            image: post.image.clone().unwrap_or_default(),
            body_html: render_blocks(&post.content),
            prev_href: view.prev_post_id.as_deref().map(post_href).unwrap_or_default(),
            next_href: view.next_post_id.as_deref().map(post_href).unwrap_or_default(),
            comments: view.comments.iter().map(CommentView::from).collect(),
            related: view.related_posts.iter().map(PostLink::from).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub title: String,
    pub posts: Vec<PostLink>,
}

impl IndexTemplate {
    pub fn new(posts: &[Post]) -> Self {
        Self {
            title: "Serene Spa Journal".into(),
            posts: posts.iter().map(PostLink::from).collect(),
        }
    }
}
