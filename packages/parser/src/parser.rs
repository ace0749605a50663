use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, unquote, Token};
use std::ops::Range;

/// Recursive-descent parser for Trellis markup
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    /// Parse a complete document: instructions followed by at most one root element
    pub fn parse_document(&mut self) -> ParseResult<Document> {
        let mut doc = Document::new();

        while !self.is_at_end() {
            match self.peek() {
                Some((Token::InstructionOpen, _)) => {
                    if doc.root.is_some() {
                        return Err(ParseError::invalid_syntax(
                            self.peek_span(),
                            "Processing instructions must precede the root element",
                        ));
                    }
                    doc.instructions.push(self.parse_instruction()?);
                }
                Some((Token::LAngle, _)) => {
                    if doc.root.is_some() {
                        return Err(ParseError::invalid_syntax(
                            self.peek_span(),
                            "Document has more than one root element",
                        ));
                    }
                    doc.root = Some(self.parse_element()?);
                }
                _ => {
                    return Err(ParseError::unexpected_token(
                        self.peek_span(),
                        "'<' or '<?'",
                        Self::format_token(self.peek()),
                    ));
                }
            }
        }

        Ok(doc)
    }

    /// Parse `<?target data?>`; data is kept verbatim
    fn parse_instruction(&mut self) -> ParseResult<Instruction> {
        let start = self.peek_span().start;
        self.expect(Token::InstructionOpen)?;

        let (target, target_span) = match self.peek() {
            Some((Token::Name(name), span)) => (name.to_string(), span.clone()),
            _ => {
                return Err(ParseError::unexpected_token(
                    self.peek_span(),
                    "instruction target",
                    Self::format_token(self.peek()),
                ))
            }
        };
        self.advance();

        while !self.check(Token::InstructionClose) {
            if self.is_at_end() {
                return Err(ParseError::unexpected_eof(self.source.len(), "'?>'"));
            }
            self.advance();
        }

        let close = self.peek_span();
        self.expect(Token::InstructionClose)?;

        let data = self.source[target_span.end..close.start].trim().to_string();

        Ok(Instruction {
            target,
            data,
            span: Span::new(start, close.end),
        })
    }

    /// Parse an element with its attributes and child elements
    fn parse_element(&mut self) -> ParseResult<Element> {
        let start = self.peek_span().start;
        self.expect(Token::LAngle)?;
        let name = self.expect_name()?;

        let mut attributes: Vec<Attribute> = Vec::new();
        while let Some((Token::Name(attr), span)) = self.peek() {
            let attr_name = attr.to_string();
            let attr_start = span.start;
            if attributes.iter().any(|a| a.name == attr_name) {
                return Err(ParseError::invalid_syntax(
                    span.clone(),
                    format!("Duplicate attribute '{}'", attr_name),
                ));
            }
            self.advance();
            self.expect(Token::Equals)?;
            let value = self.expect_string()?;
            attributes.push(Attribute {
                name: attr_name,
                value,
                span: Span::new(attr_start, self.current_pos()),
            });
        }

        if self.match_token(Token::SelfClose) {
            return Ok(Element {
                name,
                attributes,
                children: Vec::new(),
                span: Span::new(start, self.current_pos()),
            });
        }

        self.expect(Token::RAngle)?;

        let mut children = Vec::new();
        while !self.check(Token::CloseTagOpen) {
            if self.is_at_end() {
                return Err(ParseError::unexpected_eof(
                    self.source.len(),
                    format!("'</{}>'", name),
                ));
            }
            if !self.check(Token::LAngle) {
                return Err(ParseError::unexpected_token(
                    self.peek_span(),
                    "child element",
                    Self::format_token(self.peek()),
                ));
            }
            children.push(self.parse_element()?);
        }

        let close_start = self.peek_span();
        self.expect(Token::CloseTagOpen)?;
        let closing = self.expect_name()?;
        if closing != name {
            return Err(ParseError::invalid_syntax(
                close_start.start..self.current_pos(),
                format!("Mismatched closing tag: expected '</{}>', found '</{}>'", name, closing),
            ));
        }
        self.expect(Token::RAngle)?;

        Ok(Element {
            name,
            attributes,
            children,
            span: Span::new(start, self.current_pos()),
        })
    }

    // Helper methods

    fn peek(&self) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, Range<usize>)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(&token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.check(token.clone()) {
            self.advance();
            Ok(())
        } else if self.is_at_end() {
            Err(ParseError::unexpected_eof(self.source.len(), token.to_string()))
        } else {
            Err(ParseError::unexpected_token(
                self.peek_span(),
                token.to_string(),
                Self::format_token(self.peek()),
            ))
        }
    }

    fn expect_name(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some((Token::Name(s), _)) => {
                let val = s.to_string();
                self.advance();
                Ok(val)
            }
            None => Err(ParseError::unexpected_eof(self.source.len(), "name")),
            _ => Err(ParseError::unexpected_token(
                self.peek_span(),
                "name",
                Self::format_token(self.peek()),
            )),
        }
    }

    fn expect_string(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some((Token::String(s), _)) => {
                let val = unquote(s);
                self.advance();
                Ok(val)
            }
            None => Err(ParseError::unexpected_eof(self.source.len(), "quoted value")),
            _ => Err(ParseError::unexpected_token(
                self.peek_span(),
                "quoted value",
                Self::format_token(self.peek()),
            )),
        }
    }

    /// Byte offset just past the last consumed token
    fn current_pos(&self) -> usize {
        if self.pos == 0 {
            self.tokens.first().map(|(_, span)| span.start).unwrap_or(0)
        } else {
            self.tokens
                .get(self.pos - 1)
                .map(|(_, span)| span.end)
                .unwrap_or(self.source.len())
        }
    }

    fn peek_span(&self) -> Range<usize> {
        self.peek()
            .map(|(_, span)| span.clone())
            .unwrap_or(self.source.len()..self.source.len())
    }

    fn format_token(token: Option<&(Token, Range<usize>)>) -> String {
        match token {
            None => "end of file".to_string(),
            Some((token, _)) => token.to_string(),
        }
    }
}

pub fn parse(source: &str) -> ParseResult<Document> {
    let mut parser = Parser::new(source)?;
    parser.parse_document()
}
