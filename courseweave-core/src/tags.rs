//! Tokenizer for the bracket-tag mini-language embedded in step bodies.
//!
//! A body is plain HTML interspersed with tags such as `[target name="x"]`,
//! `[glossary term="x"]...[/glossary]` or `[clear]`. The scanner splits it
//! into untouched HTML passages and recognised tags in one left-to-right
//! pass. Bracketed text that does not parse as a known tag stays HTML.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagName {
    Target,
    Glossary,
    Img,
    Anim,
    Applet,
    Local,
    Link,
    Ref,
    Clear,
    Prev,
    Next,
}

impl TagName {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "target" => Some(TagName::Target),
            "glossary" => Some(TagName::Glossary),
            "img" => Some(TagName::Img),
            "anim" => Some(TagName::Anim),
            "applet" => Some(TagName::Applet),
            "local" => Some(TagName::Local),
            "link" => Some(TagName::Link),
            "ref" => Some(TagName::Ref),
            "clear" => Some(TagName::Clear),
            "prev" => Some(TagName::Prev),
            "next" => Some(TagName::Next),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TagName::Target => "target",
            TagName::Glossary => "glossary",
            TagName::Img => "img",
            TagName::Anim => "anim",
            TagName::Applet => "applet",
            TagName::Local => "local",
            TagName::Link => "link",
            TagName::Ref => "ref",
            TagName::Clear => "clear",
            TagName::Prev => "prev",
            TagName::Next => "next",
        }
    }

    /// Tags that may carry a body up to a matching `[/name]`
    pub fn is_paired(&self) -> bool {
        matches!(self, TagName::Glossary | TagName::Local | TagName::Link)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    pub name: TagName,
    pub attrs: Vec<(&'a str, &'a str)>,
    /// Body of a paired tag; `None` for the short form
    pub body: Option<&'a str>,
    /// The full source text of the tag, body and close tag included
    pub raw: &'a str,
}

impl<'a> Tag<'a> {
    /// Attribute value, with surrounding whitespace trimmed; empty counts as absent
    pub fn attr(&self, key: &str) -> Option<&'a str> {
        self.attrs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Body with surrounding whitespace trimmed; empty counts as absent
    pub fn trimmed_body(&self) -> Option<&'a str> {
        self.body.map(str::trim).filter(|b| !b.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'a> {
    Html(&'a str),
    Tag(Tag<'a>),
}

/// Split `input` into HTML passages and bracket tags
pub fn parse(input: &str) -> Vec<Node<'_>> {
    let mut nodes = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(offset) = input[pos..].find('[') {
        let start = pos + offset;
        let Some(open) = parse_open(input, start) else {
            pos = start + 1;
            continue;
        };

        if start > text_start {
            nodes.push(Node::Html(&input[text_start..start]));
        }

        let mut end = open.end;
        let mut body = None;
        if open.name.is_paired() && !open.self_closing {
            let close = format!("[/{}]", open.name.as_str());
            if let Some(close_at) = input[open.end..].find(&close) {
                body = Some(&input[open.end..open.end + close_at]);
                end = open.end + close_at + close.len();
            }
        }

        nodes.push(Node::Tag(Tag {
            name: open.name,
            attrs: open.attrs,
            body,
            raw: &input[start..end],
        }));
        text_start = end;
        pos = end;
    }

    if text_start < input.len() {
        nodes.push(Node::Html(&input[text_start..]));
    }

    nodes
}

struct OpenTag<'a> {
    name: TagName,
    attrs: Vec<(&'a str, &'a str)>,
    self_closing: bool,
    /// Byte offset just past the closing `]`
    end: usize,
}

fn parse_open(input: &str, start: usize) -> Option<OpenTag<'_>> {
    let bytes = input.as_bytes();
    let mut i = start + 1;

    let name_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    let name = TagName::from_str(&input[name_start..i])?;

    let mut attrs = Vec::new();
    loop {
        let before_ws = i;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match *bytes.get(i)? {
            b']' => {
                return Some(OpenTag {
                    name,
                    attrs,
                    self_closing: false,
                    end: i + 1,
                })
            }
            b'/' if bytes.get(i + 1) == Some(&b']') => {
                return Some(OpenTag {
                    name,
                    attrs,
                    self_closing: true,
                    end: i + 2,
                })
            }
            _ => {}
        }

        // Attributes must be separated from the name and from each other
        if i == before_ws {
            return None;
        }

        let key_start = i;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'-'))
        {
            i += 1;
        }
        if i == key_start {
            return None;
        }
        let key = &input[key_start..i];

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i)? != &b'=' {
            return None;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let quote = *bytes.get(i)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let value_start = i + 1;
        let value_len = input[value_start..].find(quote as char)?;
        attrs.push((key, &input[value_start..value_start + value_len]));
        i = value_start + value_len + 1;
    }
}
