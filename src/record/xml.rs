//! XML-side field access and rendering helpers.

use roxmltree::Node;

use crate::codec::{Literal, first_ref, parse_refs, search_model};
use crate::error::{Error, Result};
use crate::record::RecordKind;

/// A `<record>` node seen as a bag of `<field name="...">` children.
pub(crate) struct RecordNode<'a, 'input> {
    node: Node<'a, 'input>,
    kind: RecordKind,
    id: String,
}

impl<'a, 'input> RecordNode<'a, 'input> {
    pub fn new(node: Node<'a, 'input>, kind: RecordKind) -> Self {
        let id = node.attribute("id").unwrap_or_default().to_string();
        Self { node, kind, id }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn field(&self, name: &str) -> Option<Node<'a, 'input>> {
        self.node.children().find(|child| {
            child.is_element()
                && child.tag_name().name() == "field"
                && child.attribute("name") == Some(name)
        })
    }

    pub fn missing(&self, field: &str) -> Error {
        Error::MissingField {
            kind: self.kind.label(),
            id: self.id.clone(),
            field: field.to_string(),
        }
    }

    fn malformed(&self, field: &str, reason: impl ToString) -> Error {
        Error::MalformedExpression {
            kind: self.kind.label(),
            id: self.id.clone(),
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn require(&self, name: &str) -> Result<Node<'a, 'input>> {
        self.field(name).ok_or_else(|| self.missing(name))
    }

    /// Text of a field, `None` when the field is absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.field(name).map(|f| f.text().unwrap_or_default().to_string())
    }

    pub fn required_text(&self, name: &str) -> Result<String> {
        self.text(name).ok_or_else(|| self.missing(name))
    }

    fn eval(&self, name: &str, field: Node<'_, '_>) -> Result<Option<Literal>> {
        field
            .attribute("eval")
            .map(|expr| Literal::parse(expr).map_err(|e| self.malformed(name, e)))
            .transpose()
    }

    /// Boolean flag. `None` when the field is absent; a field without an
    /// `eval` attribute reads as false.
    pub fn flag(&self, name: &str) -> Result<Option<bool>> {
        let Some(field) = self.field(name) else {
            return Ok(None);
        };
        Ok(Some(self.eval(name, field)?.is_some_and(|v| v.truthy())))
    }

    /// Tri-state flag: absent field gives `None`, `eval="None"` gives
    /// `Some(None)`.
    pub fn tri_state(&self, name: &str) -> Result<Option<Option<bool>>> {
        let Some(field) = self.field(name) else {
            return Ok(None);
        };
        Ok(Some(match self.eval(name, field)? {
            None => Some(false),
            Some(Literal::None) => None,
            Some(value) => Some(value.truthy()),
        }))
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        let field = self.require(name)?;
        match self.eval(name, field)? {
            Some(Literal::Int(i)) => Ok(i),
            Some(Literal::Bool(b)) => Ok(i64::from(b)),
            Some(other) => Err(self.malformed(name, format!("expected an integer, found {}", other))),
            None => field
                .text()
                .unwrap_or_default()
                .trim()
                .parse()
                .map_err(|_| self.malformed(name, "expected an integer")),
        }
    }

    /// Model name from the field's `search` attribute, `None` when there is
    /// no such field or attribute.
    pub fn model(&self, name: &str) -> Result<Option<String>> {
        let Some(search) = self.field(name).and_then(|f| f.attribute("search")) else {
            return Ok(None);
        };
        if search.is_empty() {
            return Ok(None);
        }
        search_model(search).map(Some).ok_or_else(|| Error::MalformedSearch {
            kind: self.kind.label(),
            id: self.id.clone(),
        })
    }

    /// Reference held by a field, either as `ref="..."` or inside `eval`.
    pub fn reference(&self, name: &str) -> Result<Option<String>> {
        let Some(field) = self.field(name) else {
            return Ok(None);
        };
        if let Some(id) = field.attribute("ref").filter(|r| !r.is_empty()) {
            return Ok(Some(id.to_string()));
        }
        field
            .attribute("eval")
            .and_then(first_ref)
            .map(Some)
            .ok_or_else(|| self.malformed(name, "no reference to extract"))
    }

    pub fn required_reference(&self, name: &str) -> Result<String> {
        self.reference(name)?.ok_or_else(|| self.missing(name))
    }

    /// Ids listed by a relational command expression.
    pub fn references(&self, name: &str) -> Vec<String> {
        self.field(name)
            .and_then(|f| f.attribute("eval"))
            .map(parse_refs)
            .unwrap_or_default()
    }
}

/// Python-style rendering of a boolean, as eval attributes expect.
pub(crate) fn py_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Line-oriented builder for a `<record>` block.
#[derive(Default)]
pub(crate) struct XmlLines {
    lines: Vec<String>,
}

impl XmlLines {
    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    pub fn line_if(&mut self, cond: bool, line: impl FnOnce() -> String) -> &mut Self {
        if cond {
            self.lines.push(line());
        }
        self
    }

    /// Joined block, terminated by a newline.
    pub fn finish(&mut self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}
