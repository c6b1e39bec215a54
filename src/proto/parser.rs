use crate::error::ParseError;
use crate::position::SourcePos;
use crate::proto::ast::*;
use crate::proto::lexer::{LexError, Lexer, Token, TokenKind};
use std::path::{Path, PathBuf};

/// Parses the code as a protobuf file. The path is only used for context in
/// errors.
pub fn parse_proto(path: &Path, code: &str) -> Result<FileNode, ParseError> {
    let tokens = Lexer::new(code)
        .tokenize()
        .map_err(|LexError { pos, message }| syntax_error(path, pos, message))?;

    let file = Parser {
        path,
        source: code,
        tokens: &tokens,
        index: 0,
    }
    .file()?;

    tracing::trace!(path = %path.display(), decls = file.decls.len(), "parsed proto source");
    Ok(file)
}

fn syntax_error(path: &Path, pos: SourcePos, message: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        path: PathBuf::from(path),
        line: pos.line,
        column: pos.col,
        message: message.into(),
    }
}

type PResult<T> = Result<T, ParseError>;

struct Parser<'a> {
    path: &'a Path,
    source: &'a str,
    tokens: &'a [Token],
    index: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.index)
    }

    fn peek_at(&self, ahead: usize) -> Option<&'a Token> {
        self.tokens.get(self.index + ahead)
    }

    fn next(&mut self) -> PResult<&'a Token> {
        let token = self.tokens.get(self.index).ok_or_else(|| self.eof_error())?;
        self.index += 1;
        Ok(token)
    }

    fn eof_error(&self) -> ParseError {
        let pos = self.tokens.last().map(|t| t.end).unwrap_or(SourcePos::new(1, 1));
        syntax_error(self.path, pos, "unexpected end of file")
    }

    fn unexpected(&self, token: &Token, expected: &str) -> ParseError {
        syntax_error(
            self.path,
            token.start,
            format!("expected {expected}, found {}", token.kind),
        )
    }

    fn is_symbol(&self, symbol: char) -> bool {
        matches!(self.peek(), Some(Token { kind: TokenKind::Symbol(s), .. }) if *s == symbol)
    }

    fn is_ident(&self, ident: &str) -> bool {
        matches!(self.peek(), Some(Token { kind: TokenKind::Ident(i), .. }) if i == ident)
    }

    /// `keyword` starts a declaration rather than naming a field type.
    fn is_declaration(&self, keyword: &str) -> bool {
        self.is_ident(keyword)
            && !matches!(self.peek_at(2), Some(Token { kind: TokenKind::Symbol('='), .. }))
    }

    fn symbol(&mut self, symbol: char) -> PResult<&'a Token> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Symbol(s) if s == symbol => Ok(token),
            _ => Err(self.unexpected(token, &format!("`{symbol}`"))),
        }
    }

    fn eat_symbol(&mut self, symbol: char) -> Option<&'a Token> {
        if self.is_symbol(symbol) {
            self.index += 1;
            return self.tokens.get(self.index - 1);
        }
        None
    }

    fn ident(&mut self) -> PResult<(&'a Token, String)> {
        let token = self.next()?;
        match &token.kind {
            TokenKind::Ident(ident) => Ok((token, ident.clone())),
            _ => Err(self.unexpected(token, "identifier")),
        }
    }

    fn keyword(&mut self, keyword: &str) -> PResult<&'a Token> {
        let (token, ident) = self.ident()?;
        if ident != keyword {
            return Err(self.unexpected(token, &format!("`{keyword}`")));
        }
        Ok(token)
    }

    /// `ident { "." ident }`
    fn full_ident(&mut self) -> PResult<(&'a Token, String)> {
        let (first, mut name) = self.ident()?;
        while self.is_symbol('.') {
            self.index += 1;
            let (_, part) = self.ident()?;
            name.push('.');
            name.push_str(&part);
        }
        Ok((first, name))
    }

    /// Message or enum type reference, optionally fully qualified with a leading dot.
    fn type_name(&mut self) -> PResult<(&'a Token, String)> {
        if let Some(dot) = self.eat_symbol('.') {
            let (_, name) = self.full_ident()?;
            return Ok((dot, format!(".{name}")));
        }
        self.full_ident()
    }

    fn string(&mut self) -> PResult<(&'a Token, String)> {
        let token = self.next()?;
        let TokenKind::Str(first) = &token.kind else {
            return Err(self.unexpected(token, "string literal"));
        };
        let mut value = first.clone();
        // Adjacent string literals are concatenated.
        while let Some(Token { kind: TokenKind::Str(next), .. }) = self.peek() {
            value.push_str(next);
            self.index += 1;
        }
        Ok((token, value))
    }

    fn field_number(&mut self) -> PResult<u32> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Int(value) => u32::try_from(value)
                .map_err(|_| syntax_error(self.path, token.start, "field number out of range")),
            _ => Err(self.unexpected(token, "field number")),
        }
    }

    fn previous_end(&self) -> SourcePos {
        self.tokens
            .get(self.index.wrapping_sub(1))
            .map(|t| t.end)
            .unwrap_or(SourcePos::new(1, 1))
    }

    fn span_from(&self, start: &Token) -> Span {
        Span::new(start.start, self.previous_end())
    }

    fn file(&mut self) -> PResult<FileNode> {
        let mut decls = Vec::new();
        while let Some(token) = self.peek() {
            let decl = match &token.kind {
                TokenKind::Symbol(';') => {
                    self.index += 1;
                    FileElement::Empty(self.span_from(token))
                }
                TokenKind::Ident(ident) => match ident.as_str() {
                    "syntax" | "edition" => FileElement::Syntax(self.syntax()?),
                    "package" => FileElement::Package(self.package()?),
                    "import" => FileElement::Import(self.import()?),
                    "option" => FileElement::Option(self.option_statement()?),
                    "message" => FileElement::Message(self.message()?),
                    "enum" => FileElement::Enum(self.enumeration()?),
                    "service" => FileElement::Service(self.service()?),
                    "extend" => FileElement::Extend(self.extend()?),
                    _ => return Err(self.unexpected(token, "top-level declaration")),
                },
                _ => return Err(self.unexpected(token, "top-level declaration")),
            };
            decls.push(decl);
        }

        let span = match (self.tokens.first(), self.tokens.last()) {
            (Some(first), Some(last)) => Some(Span::new(first.start, last.end)),
            _ => None,
        };
        Ok(FileNode { span, decls })
    }

    fn syntax(&mut self) -> PResult<SyntaxNode> {
        let (start, keyword) = self.ident()?;
        self.symbol('=')?;
        let (_, value) = self.string()?;
        self.symbol(';')?;
        Ok(SyntaxNode {
            span: self.span_from(start),
            keyword,
            value,
        })
    }

    fn package(&mut self) -> PResult<PackageNode> {
        let start = self.keyword("package")?;
        let (_, name) = self.full_ident()?;
        self.symbol(';')?;
        Ok(PackageNode {
            span: self.span_from(start),
            name,
        })
    }

    fn import(&mut self) -> PResult<ImportNode> {
        let start = self.keyword("import")?;
        let modifier = if self.is_ident("weak") {
            self.index += 1;
            Some(ImportModifier::Weak)
        } else if self.is_ident("public") {
            self.index += 1;
            Some(ImportModifier::Public)
        } else {
            None
        };
        let (_, path) = self.string()?;
        self.symbol(';')?;
        Ok(ImportNode {
            span: self.span_from(start),
            modifier,
            path,
        })
    }

    /// `option name = constant ;`
    fn option_statement(&mut self) -> PResult<OptionNode> {
        let start = self.keyword("option")?;
        let (name, value) = self.option_body()?;
        self.symbol(';')?;
        Ok(OptionNode {
            span: self.span_from(start),
            name,
            value,
        })
    }

    /// `name = constant`, shared by option statements and `[...]` field options.
    fn option_body(&mut self) -> PResult<(String, String)> {
        let name = self.option_name()?;
        self.symbol('=')?;
        let value = self.constant()?;
        Ok((name, value))
    }

    fn option_name(&mut self) -> PResult<String> {
        let mut name = String::new();
        loop {
            if self.eat_symbol('(').is_some() {
                let (_, inner) = self.type_name()?;
                self.symbol(')')?;
                name.push('(');
                name.push_str(&inner);
                name.push(')');
            } else {
                let (_, part) = self.ident()?;
                name.push_str(&part);
            }
            if self.eat_symbol('.').is_none() {
                return Ok(name);
            }
            name.push('.');
        }
    }

    /// A constant, returned as its source text.
    fn constant(&mut self) -> PResult<String> {
        let first = self.peek().ok_or_else(|| self.eof_error())?;
        match &first.kind {
            TokenKind::Symbol('{') => self.aggregate(),
            TokenKind::Symbol('-' | '+') => {
                self.index += 1;
                let token = self.next()?;
                match token.kind {
                    TokenKind::Int(_) | TokenKind::Float(_) => {}
                    TokenKind::Ident(ref i) if i == "inf" || i == "nan" => {}
                    _ => return Err(self.unexpected(token, "number")),
                }
                Ok(self.source[first.byte_start..token.byte_end].to_string())
            }
            TokenKind::Str(_) => {
                self.string()?;
                Ok(self.source[first.byte_start..self.tokens[self.index - 1].byte_end].to_string())
            }
            TokenKind::Int(_) | TokenKind::Float(_) => {
                self.index += 1;
                Ok(self.source[first.byte_start..first.byte_end].to_string())
            }
            TokenKind::Ident(_) => {
                let (_, name) = self.full_ident()?;
                Ok(name)
            }
            _ => Err(self.unexpected(first, "constant")),
        }
    }

    /// Text-format aggregate value, kept verbatim.
    fn aggregate(&mut self) -> PResult<String> {
        let open = self.symbol('{')?;
        let mut depth = 1usize;
        while depth > 0 {
            let token = self.next()?;
            match token.kind {
                TokenKind::Symbol('{') => depth += 1,
                TokenKind::Symbol('}') => depth -= 1,
                _ => {}
            }
        }
        Ok(self.source[open.byte_start..self.tokens[self.index - 1].byte_end].to_string())
    }

    /// Optional `[ name = value, ... ]` after a field or enum value.
    fn field_options(&mut self) -> PResult<Vec<OptionNode>> {
        let mut options = Vec::new();
        if self.eat_symbol('[').is_none() {
            return Ok(options);
        }
        loop {
            let start = self.peek().ok_or_else(|| self.eof_error())?;
            let (name, value) = self.option_body()?;
            options.push(OptionNode {
                span: self.span_from(start),
                name,
                value,
            });
            if self.eat_symbol(',').is_none() {
                break;
            }
        }
        self.symbol(']')?;
        Ok(options)
    }

    /// Skips a `reserved` or `extensions` statement up to its `;`.
    fn skip_statement(&mut self) -> PResult<Span> {
        let start = self.next()?;
        while self.eat_symbol(';').is_none() {
            self.next()?;
        }
        Ok(self.span_from(start))
    }

    fn message(&mut self) -> PResult<MessageNode> {
        let start = self.keyword("message")?;
        let (_, name) = self.ident()?;
        let open = self.symbol('{')?;
        let mut elements = Vec::new();

        loop {
            let token = self.peek().ok_or_else(|| self.eof_error())?;
            if let TokenKind::Symbol('}') = token.kind {
                self.index += 1;
                return Ok(MessageNode {
                    span: self.span_from(start),
                    name,
                    open_brace: open.start,
                    close_brace: token.start,
                    elements,
                });
            }
            elements.push(self.message_element()?);
        }
    }

    fn message_element(&mut self) -> PResult<MessageElement> {
        if let Some(semi) = self.eat_symbol(';') {
            return Ok(MessageElement::Empty(self.span_from(semi)));
        }
        if self.is_ident("option") {
            return Ok(MessageElement::Option(self.option_statement()?));
        }
        if self.is_declaration("message") {
            return Ok(MessageElement::Message(self.message()?));
        }
        if self.is_declaration("enum") {
            return Ok(MessageElement::Enum(self.enumeration()?));
        }
        if self.is_declaration("oneof") {
            return Ok(MessageElement::OneOf(self.oneof()?));
        }
        if self.is_declaration("extend") {
            return Ok(MessageElement::Extend(self.extend()?));
        }
        if self.is_declaration("reserved") {
            return Ok(MessageElement::Reserved(self.skip_statement()?));
        }
        if self.is_declaration("extensions") {
            return Ok(MessageElement::Extensions(self.skip_statement()?));
        }
        if self.is_ident("map")
            && matches!(self.peek_at(1), Some(Token { kind: TokenKind::Symbol('<'), .. }))
        {
            return Ok(MessageElement::MapField(self.map_field()?));
        }
        Ok(MessageElement::Field(self.field(true)?))
    }

    /// `[label] type name = number [options] ;`
    fn field(&mut self, allow_label: bool) -> PResult<FieldNode> {
        let start = self.peek().ok_or_else(|| self.eof_error())?;
        let label = match &start.kind {
            TokenKind::Ident(ident) if allow_label => match ident.as_str() {
                "optional" => Some(FieldLabel::Optional),
                "required" => Some(FieldLabel::Required),
                "repeated" => Some(FieldLabel::Repeated),
                _ => None,
            },
            _ => None,
        };
        // A label is only a label when a type follows it.
        let label = label.filter(|_| {
            !matches!(self.peek_at(2), Some(Token { kind: TokenKind::Symbol('='), .. }))
        });
        if label.is_some() {
            self.index += 1;
        }

        let (_, field_type) = self.type_name()?;
        let (_, name) = self.ident()?;
        self.symbol('=')?;
        let tag = self.field_number()?;
        let options = self.field_options()?;
        self.symbol(';')?;

        Ok(FieldNode {
            span: self.span_from(start),
            label,
            field_type,
            name,
            tag,
            options,
        })
    }

    /// `map < key , value > name = number [options] ;`
    fn map_field(&mut self) -> PResult<MapFieldNode> {
        let start = self.keyword("map")?;
        self.symbol('<')?;
        let (_, key_type) = self.ident()?;
        self.symbol(',')?;
        let (_, value_type) = self.type_name()?;
        self.symbol('>')?;
        let (_, name) = self.ident()?;
        self.symbol('=')?;
        let tag = self.field_number()?;
        let options = self.field_options()?;
        self.symbol(';')?;

        Ok(MapFieldNode {
            span: self.span_from(start),
            key_type,
            value_type,
            name,
            tag,
            options,
        })
    }

    fn oneof(&mut self) -> PResult<OneOfNode> {
        let start = self.keyword("oneof")?;
        let (_, name) = self.ident()?;
        let open = self.symbol('{')?;
        let mut elements = Vec::new();

        loop {
            let token = self.peek().ok_or_else(|| self.eof_error())?;
            match &token.kind {
                TokenKind::Symbol('}') => {
                    self.index += 1;
                    return Ok(OneOfNode {
                        span: self.span_from(start),
                        name,
                        open_brace: open.start,
                        close_brace: token.start,
                        elements,
                    });
                }
                TokenKind::Symbol(';') => {
                    self.index += 1;
                    elements.push(OneOfElement::Empty(self.span_from(token)));
                }
                TokenKind::Ident(ident) if ident == "option" => {
                    elements.push(OneOfElement::Option(self.option_statement()?));
                }
                _ => elements.push(OneOfElement::Field(self.field(false)?)),
            }
        }
    }

    fn enumeration(&mut self) -> PResult<EnumNode> {
        let start = self.keyword("enum")?;
        let (_, name) = self.ident()?;
        self.symbol('{')?;
        let mut elements = Vec::new();

        loop {
            let token = self.peek().ok_or_else(|| self.eof_error())?;
            match &token.kind {
                TokenKind::Symbol('}') => {
                    self.index += 1;
                    return Ok(EnumNode {
                        span: self.span_from(start),
                        name,
                        close_brace: token.start,
                        elements,
                    });
                }
                TokenKind::Symbol(';') => {
                    self.index += 1;
                    elements.push(EnumElement::Empty(self.span_from(token)));
                }
                TokenKind::Ident(ident) if ident == "option" => {
                    elements.push(EnumElement::Option(self.option_statement()?));
                }
                TokenKind::Ident(ident)
                    if ident == "reserved" && self.is_declaration("reserved") =>
                {
                    elements.push(EnumElement::Reserved(self.skip_statement()?));
                }
                _ => elements.push(EnumElement::Value(self.enum_value()?)),
            }
        }
    }

    fn enum_value(&mut self) -> PResult<EnumValueNode> {
        let (start, name) = self.ident()?;
        self.symbol('=')?;
        let negative = self.eat_symbol('-').is_some();
        let token = self.next()?;
        let TokenKind::Int(value) = token.kind else {
            return Err(self.unexpected(token, "enum value number"));
        };
        let number = i64::try_from(value)
            .map_err(|_| syntax_error(self.path, token.start, "enum value out of range"))?;
        let options = self.field_options()?;
        self.symbol(';')?;

        Ok(EnumValueNode {
            span: self.span_from(start),
            name,
            number: if negative { -number } else { number },
            options,
        })
    }

    fn service(&mut self) -> PResult<ServiceNode> {
        let start = self.keyword("service")?;
        let (_, name) = self.ident()?;
        let open = self.symbol('{')?;
        let mut elements = Vec::new();

        loop {
            let token = self.peek().ok_or_else(|| self.eof_error())?;
            match &token.kind {
                TokenKind::Symbol('}') => {
                    self.index += 1;
                    return Ok(ServiceNode {
                        span: self.span_from(start),
                        name,
                        open_brace: open.start,
                        close_brace: token.start,
                        elements,
                    });
                }
                TokenKind::Symbol(';') => {
                    self.index += 1;
                    elements.push(ServiceElement::Empty(self.span_from(token)));
                }
                TokenKind::Ident(ident) if ident == "option" => {
                    elements.push(ServiceElement::Option(self.option_statement()?));
                }
                TokenKind::Ident(ident) if ident == "rpc" => {
                    elements.push(ServiceElement::Rpc(self.rpc()?));
                }
                _ => return Err(self.unexpected(token, "`rpc`, `option` or `}`")),
            }
        }
    }

    /// `rpc Name ( [stream] Request ) returns ( [stream] Response ) ( ";" | "{" ... "}" )`
    fn rpc(&mut self) -> PResult<RpcNode> {
        let start = self.keyword("rpc")?;
        let (_, name) = self.ident()?;
        let input = self.rpc_type()?;
        self.keyword("returns")?;
        let output = self.rpc_type()?;

        let mut options = Vec::new();
        if self.eat_symbol('{').is_some() {
            loop {
                if self.eat_symbol('}').is_some() {
                    break;
                }
                if self.eat_symbol(';').is_some() {
                    continue;
                }
                options.push(self.option_statement()?);
            }
            // A trailing `;` after the body is allowed.
            self.eat_symbol(';');
        } else {
            self.symbol(';')?;
        }

        Ok(RpcNode {
            span: self.span_from(start),
            name,
            input,
            output,
            options,
        })
    }

    fn rpc_type(&mut self) -> PResult<RpcType> {
        self.symbol('(')?;
        let stream = self.is_ident("stream")
            && !matches!(self.peek_at(1), Some(Token { kind: TokenKind::Symbol(')' | '.'), .. }));
        if stream {
            self.index += 1;
        }
        let (_, name) = self.type_name()?;
        self.symbol(')')?;
        Ok(RpcType { stream, name })
    }

    fn extend(&mut self) -> PResult<ExtendNode> {
        let start = self.keyword("extend")?;
        let (_, extendee) = self.type_name()?;
        self.symbol('{')?;
        let mut fields = Vec::new();

        loop {
            let token = self.peek().ok_or_else(|| self.eof_error())?;
            match token.kind {
                TokenKind::Symbol('}') => {
                    self.index += 1;
                    return Ok(ExtendNode {
                        span: self.span_from(start),
                        extendee,
                        close_brace: token.start,
                        fields,
                    });
                }
                TokenKind::Symbol(';') => self.index += 1,
                _ => fields.push(self.field(true)?),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(code: &str) -> FileNode {
        parse_proto(Path::new("test.proto"), code).unwrap()
    }

    #[test]
    fn parses_header() {
        let file = parse(
            "syntax = \"proto3\";\npackage cosmonaut.mars.mars;\n\nimport public \"a.proto\";\noption go_package = \"x/types\";\n",
        );
        let package = file.package().unwrap();
        assert_eq!(package.name, "cosmonaut.mars.mars");
        assert_eq!(package.span.start, SourcePos::new(2, 1));
        assert_eq!(package.span.end, SourcePos::new(2, 29));

        let imports: Vec<_> = file.imports().collect();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].path, "a.proto");
        assert_eq!(imports[0].modifier, Some(ImportModifier::Public));
    }

    #[test]
    fn parses_message_with_everything() {
        let file = parse(
            r#"message Params {
  option (gogoproto.goproto_stringer) = false;
  reserved 2, 15, 9 to 11;
  repeated string names = 1 [(gogoproto.nullable) = false, deprecated = true];
  map<string, Coin> balances = 3;
  message Nested { uint64 id = 1; }
  enum Kind { KIND_UNSPECIFIED = 0; KIND_A = 1 [(x) = "y"]; }
  oneof choice {
    string text = 4;
    bytes raw = 7;
  }
  .cosmos.base.Coin fee = 5;
  optional int32 optional = 6;
}
"#,
        );
        let FileElement::Message(message) = &file.decls[0] else {
            panic!("expected message");
        };
        assert_eq!(message.name, "Params");
        assert_eq!(message.highest_field_number(), 7);
        assert_eq!(message.oneofs().count(), 1);
        assert_eq!(message.close_brace, SourcePos::new(14, 1));

        let fee = message
            .elements
            .iter()
            .find_map(|e| match e {
                MessageElement::Field(f) if f.name == "fee" => Some(f),
                _ => None,
            })
            .unwrap();
        assert_eq!(fee.field_type, ".cosmos.base.Coin");
        assert_eq!(fee.label, None);
    }

    #[test]
    fn parses_service() {
        let file = parse(
            r#"service Query {
  rpc Params(QueryParamsRequest) returns (QueryParamsResponse) {
    option (google.api.http).get = "/mars/params";
  }
  rpc Watch(stream Ping) returns (stream Pong);
}"#,
        );
        let FileElement::Service(service) = &file.decls[0] else {
            panic!("expected service");
        };
        assert_eq!(service.elements.len(), 2);
        let ServiceElement::Rpc(params) = &service.elements[0] else {
            panic!("expected rpc");
        };
        assert_eq!(params.options[0].name, "(google.api.http).get");
        assert_eq!(params.options[0].value, "\"/mars/params\"");
        let ServiceElement::Rpc(watch) = &service.elements[1] else {
            panic!("expected rpc");
        };
        assert!(watch.input.stream && watch.output.stream);
    }

    #[test]
    fn aggregate_option_value_is_verbatim() {
        let file = parse("option (my_opt) = { a: 1 b { c: \"d\" } };\n");
        let FileElement::Option(option) = &file.decls[0] else {
            panic!("expected option");
        };
        assert_eq!(option.value, "{ a: 1 b { c: \"d\" } }");
    }

    #[test]
    fn empty_file_has_no_span() {
        let file = parse("// only a comment\n");
        assert!(file.span.is_none());
        assert!(file.decls.is_empty());
    }

    #[test]
    fn missing_semicolon_is_error() {
        let err =
            parse_proto(Path::new("bad.proto"), "syntax = \"proto3\"\npackage a;").unwrap_err();
        match err {
            ParseError::Syntax { line, column, message, .. } => {
                assert_eq!((line, column), (2, 1));
                assert!(message.contains("`;`"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unclosed_message_is_error() {
        let err =
            parse_proto(Path::new("bad.proto"), "message A {\n  string a = 1;\n").unwrap_err();
        assert!(err.to_string().contains("unexpected end of file"));
    }

    #[test]
    fn walk_is_preorder() {
        let file = parse("message A { message B { int32 x = 1; } int32 y = 2; }\nmessage C {}\n");
        let mut names = Vec::new();
        walk(&file, &mut |node| match node {
            NodeRef::Message(m) => names.push(m.name.clone()),
            NodeRef::Field(f) => names.push(f.name.clone()),
            _ => {}
        });
        assert_eq!(names, ["A", "B", "x", "y", "C"]);
    }
}
