use std::fmt::Write;

use cstgrammar::{Span, Spanned};
use csttable::{FieldId, Language, SymbolId};

use crate::{lex_api::Lexeme, parser::ParseError};

/// A node in a concrete syntax tree. Leaves are tokens (including extras such as comments, and
/// zero-width "missing" tokens inserted by error recovery); interior nodes are visible
/// nonterminals, aliased nonterminals, and `ERROR` nodes.
///
/// Every byte of the input is covered by exactly one leaf, either as the leaf's text or as the
/// padding before it (see [Node::full_span]), apart from the padding after the last token, which
/// is recorded in [Tree::trailing_padding].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    symbol: SymbolId,
    alias: Option<SymbolId>,
    field: Option<FieldId>,
    padding_start: usize,
    span: Span,
    children: Vec<Node>,
    production_id: u16,
    extra: bool,
    missing: bool,
    has_error: bool,
}

impl Node {
    /// A leaf for `lexeme`. Faulty lexemes become "missing" leaves.
    pub(crate) fn leaf(lexeme: Lexeme, extra: bool) -> Self {
        Node {
            symbol: lexeme.symbol(),
            alias: None,
            field: None,
            padding_start: lexeme.padding_start(),
            span: lexeme.span(),
            children: Vec::new(),
            production_id: 0,
            extra,
            missing: lexeme.faulty(),
            has_error: lexeme.faulty() || lexeme.symbol() == SymbolId::ERROR,
        }
    }

    /// An interior node of kind `symbol`. If `children` is empty the node is zero-width at
    /// `empty_at`.
    pub(crate) fn interior(
        symbol: SymbolId,
        production_id: u16,
        children: Vec<Node>,
        empty_at: usize,
    ) -> Self {
        let (padding_start, span) = match (children.first(), children.last()) {
            (Some(first), Some(last)) => (
                first.padding_start,
                Span::new(first.span.start(), last.span.end()),
            ),
            _ => (empty_at, Span::empty_at(empty_at)),
        };
        let has_error = symbol == SymbolId::ERROR || children.iter().any(|c| c.has_error);
        Node {
            symbol,
            alias: None,
            field: None,
            padding_start,
            span,
            children,
            production_id,
            extra: false,
            missing: false,
            has_error,
        }
    }

    /// An `ERROR` node wrapping `children`, which must not be empty.
    pub(crate) fn error(children: Vec<Node>) -> Self {
        debug_assert!(!children.is_empty());
        let at = children.first().map(|c| c.padding_start).unwrap_or(0);
        let mut n = Node::interior(SymbolId::ERROR, 0, children, at);
        n.extra = true;
        n
    }

    pub(crate) fn set_alias(&mut self, alias: SymbolId) {
        self.alias = Some(alias);
    }

    pub(crate) fn set_field(&mut self, field: FieldId) {
        self.field = Some(field);
    }

    pub(crate) fn set_extra(&mut self, extra: bool) {
        self.extra = extra;
    }

    /// Take this node's children, leaving it empty.
    pub(crate) fn take_children(&mut self) -> Vec<Node> {
        std::mem::take(&mut self.children)
    }

    /// Replace this node's children, recalculating its extent.
    pub(crate) fn set_children(&mut self, children: Vec<Node>) {
        if let (Some(first), Some(last)) = (children.first(), children.last()) {
            self.padding_start = first.padding_start;
            self.span = Span::new(first.span.start(), last.span.end());
        }
        self.has_error =
            self.is_error() || self.missing || children.iter().any(|c| c.has_error);
        self.children = children;
    }

    /// The public symbol this node is reported as: that of its alias if it has one, otherwise
    /// that of its grammar symbol.
    pub fn kind_id(&self, lang: &Language) -> SymbolId {
        lang.public_symbol(self.alias.unwrap_or(self.symbol))
    }

    /// The grammar symbol this node was built from, ignoring any alias.
    pub fn grammar_symbol(&self) -> SymbolId {
        self.symbol
    }

    pub fn kind<'a>(&self, lang: &'a Language) -> &'a str {
        lang.symbol_name(self.kind_id(lang))
    }

    pub fn is_named(&self, lang: &Language) -> bool {
        lang.symbol_metadata(self.kind_id(lang)).named
    }

    pub fn is_visible(&self, lang: &Language) -> bool {
        self.alias.is_some() || lang.symbol_metadata(self.kind_id(lang)).visible
    }

    /// Is this node an extra (e.g. a comment, or an `ERROR` node which recovery inserted)?
    pub fn is_extra(&self) -> bool {
        self.extra
    }

    pub fn is_error(&self) -> bool {
        self.symbol == SymbolId::ERROR
    }

    /// Is this a zero-width token inserted by error recovery?
    pub fn is_missing(&self) -> bool {
        self.missing
    }

    /// Does this node, or any node below it, contain an error?
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn field(&self) -> Option<FieldId> {
        self.field
    }

    pub fn field_name<'a>(&self, lang: &'a Language) -> Option<&'a str> {
        self.field.and_then(|f| lang.field_name(f))
    }

    pub fn production_id(&self) -> u16 {
        self.production_id
    }

    /// The span of this node's text, excluding the padding before it.
    pub fn span(&self) -> Span {
        self.span
    }

    /// The span of this node's text including the padding before it.
    pub fn full_span(&self) -> Span {
        Span::new(self.padding_start, self.span.end())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn named_children<'a>(&'a self, lang: &'a Language) -> impl Iterator<Item = &'a Node> {
        self.children.iter().filter(move |c| c.is_named(lang))
    }

    /// Return the first child with field `name`.
    pub fn child_by_field_name(&self, lang: &Language, name: &str) -> Option<&Node> {
        let f = lang.field_id_for_name(name)?;
        self.children.iter().find(|c| c.field == Some(f))
    }

    pub fn children_by_field_name<'a>(
        &'a self,
        lang: &Language,
        name: &str,
    ) -> impl Iterator<Item = &'a Node> {
        let f = lang.field_id_for_name(name);
        self.children
            .iter()
            .filter(move |c| f.is_some() && c.field == f)
    }

    /// Iterate over the leaves below this node in input order.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }

    /// Return this node as an S-expression. Only named nodes, `ERROR` nodes, and missing nodes
    /// are shown, prefixed by their field name if they have one.
    pub fn to_sexp(&self, lang: &Language) -> String {
        let mut s = String::new();
        self.write_sexp(lang, &mut s);
        s
    }

    fn write_sexp(&self, lang: &Language, s: &mut String) {
        let shown = self.is_error() || self.missing || (self.is_named(lang) && self.is_visible(lang));
        if !shown {
            for c in &self.children {
                c.write_sexp(lang, s);
            }
            return;
        }
        if !s.is_empty() {
            s.push(' ');
        }
        if let Some(f) = self.field_name(lang) {
            s.push_str(f);
            s.push_str(": ");
        }
        s.push('(');
        if self.missing {
            s.push_str("MISSING ");
            if self.is_named(lang) {
                s.push_str(self.kind(lang));
            } else {
                write!(s, "\"{}\"", self.kind(lang).escape_default()).ok();
            }
        } else {
            s.push_str(self.kind(lang));
        }
        for c in &self.children {
            c.write_sexp(lang, s);
        }
        s.push(')');
    }

    /// Return a pretty-printed version of this node.
    pub fn pp(&self, lang: &Language, input: &str) -> String {
        let mut st = vec![(0, self)]; // Stack of (indent level, node) pairs
        let mut s = String::new();
        while let Some((indent, e)) = st.pop() {
            for _ in 0..indent {
                s.push(' ');
            }
            if let Some(f) = e.field_name(lang) {
                s.push_str(f);
                s.push_str(": ");
            }
            if e.missing {
                s.push_str("MISSING ");
            }
            if e.children.is_empty() && (e.is_error() || lang.is_token(e.symbol)) {
                match &input[e.span.start()..e.span.end()] {
                    "" => s.push_str(&format!("{}\n", e.kind(lang))),
                    text => s.push_str(&format!("{} {}\n", e.kind(lang), text)),
                }
            } else {
                s.push_str(&format!("{}\n", e.kind(lang)));
                for x in e.children.iter().rev() {
                    st.push((indent + 1, x));
                }
            }
        }
        s
    }
}

impl Spanned for Node {
    fn span(&self) -> Span {
        self.span
    }
}

/// An iterator over the leaves of a [Node], in input order.
pub struct Leaves<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        while let Some(n) = self.stack.pop() {
            if n.children.is_empty() {
                // Empty nonterminals cover no input.
                if n.missing || !n.full_span().is_empty() {
                    return Some(n);
                }
                continue;
            }
            self.stack.extend(n.children.iter().rev());
        }
        None
    }
}

/// The result of a parse: a tree, the errors recovered from while building it, and the padding
/// which followed the last token.
#[derive(Clone, Debug)]
pub struct Tree {
    root: Node,
    errors: Vec<ParseError>,
    trailing_padding: Span,
}

impl Tree {
    pub(crate) fn new(root: Node, errors: Vec<ParseError>, trailing_padding: Span) -> Self {
        Tree {
            root,
            errors,
            trailing_padding,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The errors encountered (and recovered from) while parsing, in input order.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn trailing_padding(&self) -> Span {
        self.trailing_padding
    }

    /// Does the tree contain an `ERROR` or missing node?
    pub fn has_error(&self) -> bool {
        self.root.has_error()
    }

    /// Rebuild the text of `input` from the tree's leaves. For a tree parsed from `input` this
    /// returns `input` unchanged.
    pub fn text(&self, input: &str) -> String {
        let mut s = String::with_capacity(input.len());
        for l in self.root.leaves() {
            let sp = l.full_span();
            s.push_str(&input[sp.start()..sp.end()]);
        }
        s.push_str(&input[self.trailing_padding.start()..self.trailing_padding.end()]);
        s
    }

    pub fn to_sexp(&self, lang: &Language) -> String {
        self.root.to_sexp(lang)
    }

    pub fn pp(&self, lang: &Language, input: &str) -> String {
        self.root.pp(lang, input)
    }
}
