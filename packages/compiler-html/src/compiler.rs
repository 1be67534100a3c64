use genui_evaluator::{Value, VNode, VirtualDomDocument};
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors that can occur during HTML compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Invalid tag name `{0}`")]
    InvalidTag(String),

    #[error("Invalid attribute name `{name}` on <{tag}>")]
    InvalidAttribute { tag: String, name: String },
}

/// Options for HTML compilation
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Wrap the output in a full `<!DOCTYPE html>` page
    pub full_document: bool,
    /// Page title when `full_document` is set
    pub title: String,
    /// Emit `data-node-id` for element ids
    pub node_ids: bool,
    /// Emit `data-layout-id` for animation hints
    pub layout_ids: bool,
    /// Pretty print HTML
    pub pretty: bool,
    /// Indentation string
    pub indent: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            full_document: false,
            title: "genui".to_string(),
            node_ids: true,
            layout_ids: false,
            pretty: true,
            indent: "  ".to_string(),
        }
    }
}

impl CompileOptions {
    /// Single-line fragment without ids, for embedding or comparison
    pub fn compact() -> Self {
        Self {
            node_ids: false,
            pretty: false,
            ..Self::default()
        }
    }
}

struct Context<'a> {
    options: &'a CompileOptions,
    depth: usize,
    buffer: String,
}

impl<'a> Context<'a> {
    fn new(options: &'a CompileOptions) -> Self {
        Self {
            options,
            depth: 0,
            buffer: String::new(),
        }
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn add_line(&mut self, text: &str) {
        self.start_line();
        self.add(text);
        self.end_line();
    }

    fn start_line(&mut self) {
        if self.options.pretty {
            for _ in 0..self.depth {
                self.buffer.push_str(&self.options.indent);
            }
        }
    }

    fn end_line(&mut self) {
        if self.options.pretty {
            self.add("\n");
        }
    }

    fn indent(&mut self) {
        self.depth += 1;
    }

    fn dedent(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
        }
    }

    fn get_output(self) -> String {
        self.buffer
    }
}

/// Compile a rendered virtual DOM to HTML
#[instrument(skip_all, fields(nodes = document.nodes.len()))]
pub fn compile_to_html(
    document: &VirtualDomDocument,
    options: &CompileOptions,
) -> Result<String, CompileError> {
    let mut ctx = Context::new(options);

    if options.full_document {
        ctx.add_line("<!DOCTYPE html>");
        ctx.add_line("<html>");
        ctx.indent();
        compile_head(&mut ctx);
        ctx.add_line("<body>");
        ctx.indent();
    }

    for node in &document.nodes {
        compile_node(node, &mut ctx)?;
    }

    if options.full_document {
        ctx.dedent();
        ctx.add_line("</body>");
        ctx.dedent();
        ctx.add_line("</html>");
    }

    let output = ctx.get_output();
    debug!(bytes = output.len(), "Compiled HTML");
    Ok(output)
}

fn compile_head(ctx: &mut Context) {
    ctx.add_line("<head>");
    ctx.indent();
    ctx.add_line("<meta charset=\"UTF-8\">");
    ctx.add_line("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">");
    let title = format!("<title>{}</title>", escape_html(&ctx.options.title));
    ctx.add_line(&title);
    ctx.dedent();
    ctx.add_line("</head>");
}

fn compile_node(node: &VNode, ctx: &mut Context) -> Result<(), CompileError> {
    match node {
        VNode::Element {
            tag,
            id,
            attributes,
            children,
            animation,
            ..
        } => {
            let mut attrs = Vec::new();
            if ctx.options.node_ids {
                if let Some(id) = id {
                    attrs.push(("data-node-id".to_string(), Some(id.clone())));
                }
            }
            if ctx.options.layout_ids {
                if let Some(hint) = animation {
                    attrs.push(("data-layout-id".to_string(), Some(hint.layout_id.clone())));
                }
            }
            for (name, value) in attributes {
                if let Some(attr) = compile_attribute(name, value) {
                    attrs.push(attr);
                }
            }
            compile_tag(tag, &attrs, children, ctx)
        }

        VNode::Text { content } => {
            ctx.add_line(&escape_html(content));
            Ok(())
        }

        VNode::Native {
            component,
            id,
            props,
            children,
            ..
        } => {
            let mut attrs = vec![("data-native-component".to_string(), Some(component.clone()))];
            if ctx.options.node_ids {
                if let Some(id) = id {
                    attrs.push(("data-node-id".to_string(), Some(id.clone())));
                }
            }
            let props: serde_json::Map<String, serde_json::Value> = props
                .iter()
                .filter(|(_, value)| !value.is_undefined() && !value.is_function())
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect();
            if !props.is_empty() {
                attrs.push((
                    "data-props".to_string(),
                    Some(serde_json::Value::Object(props).to_string()),
                ));
            }
            compile_tag("div", &attrs, children, ctx)
        }

        VNode::Error { message, node_id } => {
            let mut attrs = vec![("class".to_string(), Some("genui-error".to_string()))];
            if let Some(id) = node_id {
                attrs.push(("data-node-id".to_string(), Some(id.clone())));
            }
            compile_tag("div", &attrs, &[VNode::text(message.clone())], ctx)
        }
    }
}

fn compile_tag(
    name: &str,
    attributes: &[(String, Option<String>)],
    children: &[VNode],
    ctx: &mut Context,
) -> Result<(), CompileError> {
    if !is_valid_name(name) {
        return Err(CompileError::InvalidTag(name.to_string()));
    }

    ctx.start_line();
    ctx.add(&format!("<{}", name));
    for (attr_name, value) in attributes {
        if !is_valid_attribute_name(attr_name) {
            return Err(CompileError::InvalidAttribute {
                tag: name.to_string(),
                name: attr_name.clone(),
            });
        }
        ctx.add(" ");
        ctx.add(attr_name);
        if let Some(value) = value {
            ctx.add("=\"");
            ctx.add(&escape_html(value));
            ctx.add("\"");
        }
    }

    if is_void_element(name) {
        ctx.add(">");
        ctx.end_line();
        return Ok(());
    }

    ctx.add(">");

    if children.iter().all(|child| matches!(child, VNode::Text { .. })) {
        for child in children {
            if let VNode::Text { content } = child {
                ctx.add(&escape_html(content));
            }
        }
    } else {
        ctx.end_line();
        ctx.indent();
        for child in children {
            compile_node(child, ctx)?;
        }
        ctx.dedent();
        ctx.start_line();
    }

    ctx.add(&format!("</{}>", name));
    ctx.end_line();
    Ok(())
}

/// Maps one rendered attribute to its HTML form; `None` drops it.
/// A `None` value is a bare boolean attribute.
fn compile_attribute(name: &str, value: &Value) -> Option<(String, Option<String>)> {
    let html_name = match name {
        "className" => "class".to_string(),
        "htmlFor" => "for".to_string(),
        other => other.to_string(),
    };

    match value {
        Value::Undefined | Value::Null | Value::Function(_) => None,
        Value::Boolean(false) => None,
        Value::Boolean(true) => Some((html_name, None)),
        Value::Object(_) if name == "style" => {
            let css = style_to_css(value);
            (!css.is_empty()).then(|| (html_name, Some(css)))
        }
        Value::Object(_) | Value::Array(_) => Some((html_name, Some(value.to_json().to_string()))),
        other => Some((html_name, Some(other.to_display_string()))),
    }
}

/// Serializes a style object as an inline CSS declaration list
pub fn style_to_css(style: &Value) -> String {
    let Value::Object(fields) = style else {
        return String::new();
    };
    fields
        .borrow()
        .iter()
        .filter(|(_, value)| !value.is_nullish() && !value.is_function())
        .map(|(property, value)| {
            let css_value = match value {
                Value::Number(n) if !is_unitless(property) && *n != 0.0 => {
                    format!("{}px", value.to_display_string())
                }
                Value::Number(_) => value.to_display_string(),
                other => other.to_display_string(),
            };
            format!("{}: {}", kebab_case(property), css_value)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// `backgroundColor` -> `background-color`; vendor prefixes (`WebkitUserSelect`) gain a leading dash
fn kebab_case(property: &str) -> String {
    if property.starts_with("--") {
        return property.to_string();
    }
    let mut out = String::with_capacity(property.len() + 4);
    for (i, ch) in property.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 || property.len() > 1 {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn is_unitless(property: &str) -> bool {
    matches!(
        property,
        "opacity"
            | "zIndex"
            | "flex"
            | "flexGrow"
            | "flexShrink"
            | "fontWeight"
            | "lineHeight"
            | "order"
            | "zoom"
            | "aspectRatio"
            | "gridRow"
            | "gridColumn"
    )
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '>' | '/' | '=' | '<'))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "img"
            | "input"
            | "br"
            | "hr"
            | "meta"
            | "link"
            | "area"
            | "base"
            | "col"
            | "embed"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("backgroundColor"), "background-color");
        assert_eq!(kebab_case("WebkitUserSelect"), "-webkit-user-select");
        assert_eq!(kebab_case("--brand-color"), "--brand-color");
        assert_eq!(kebab_case("color"), "color");
    }

    #[test]
    fn test_names() {
        assert!(is_valid_name("my-widget"));
        assert!(!is_valid_name("1div"));
        assert!(!is_valid_name("div onload"));
        assert!(is_valid_attribute_name("data-rank"));
        assert!(!is_valid_attribute_name("on\"x"));
    }
}
