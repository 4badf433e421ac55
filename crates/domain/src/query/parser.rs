//! Recursive-descent parser for the wire-format query language.
//!
//! Grammar (loosest binding first):
//!
//! ```text
//! or     := and ( "OR" and )*
//! and    := not ( "AND" not )*
//! not    := "NOT" not | primary
//! primary:= "(" or ")" | clause
//! clause := field ":" ( range | quoted | token ) | token
//! range  := "[" bound "TO" bound "]"
//! bound  := "*" | token
//! ```
//!
//! A token containing `*` or `?` becomes a wildcard clause; a quoted
//! value is always an exact term. A bare token with no field is matched
//! against the designated content field.

use super::ast::{Bound, Query};
use super::{CONTENT_FIELD, QueryError};

pub(crate) struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub(crate) fn parse(mut self) -> Result<Query, QueryError> {
        let query = self.parse_or()?;
        self.skip_ws();
        if self.pos < self.input.len() {
            return Err(QueryError::syntax(self.pos, "unexpected trailing input"));
        }
        Ok(query)
    }

    fn parse_or(&mut self) -> Result<Query, QueryError> {
        let mut clauses = vec![self.parse_and()?];
        while self.eat_keyword("OR") {
            clauses.push(self.parse_and()?);
        }
        Ok(if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Query::Or(clauses)
        })
    }

    fn parse_and(&mut self) -> Result<Query, QueryError> {
        let mut clauses = vec![self.parse_not()?];
        while self.eat_keyword("AND") {
            clauses.push(self.parse_not()?);
        }
        Ok(if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Query::And(clauses)
        })
    }

    fn parse_not(&mut self) -> Result<Query, QueryError> {
        if self.eat_keyword("NOT") {
            Ok(Query::not(self.parse_not()?))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Query, QueryError> {
        self.skip_ws();
        match self.peek() {
            None => Err(QueryError::syntax(self.pos, "unexpected end of query")),
            Some('(') => {
                self.pos += 1;
                let query = self.parse_or()?;
                self.skip_ws();
                if !self.eat_char(')') {
                    return Err(QueryError::syntax(self.pos, "expected ')'"));
                }
                Ok(query)
            }
            Some(_) => self.parse_clause(),
        }
    }

    fn parse_clause(&mut self) -> Result<Query, QueryError> {
        let token = self.read_token()?;
        if self.eat_char(':') {
            self.parse_field_value(token)
        } else {
            // Bare term: free-text match against the content field.
            Ok(token_to_clause(CONTENT_FIELD.to_string(), token))
        }
    }

    fn parse_field_value(&mut self, field: String) -> Result<Query, QueryError> {
        match self.peek() {
            Some('[') => self.parse_range(field),
            Some('"') => {
                let value = self.read_quoted()?;
                Ok(Query::Term { field, value })
            }
            _ => {
                let token = self.read_token()?;
                Ok(token_to_clause(field, token))
            }
        }
    }

    fn parse_range(&mut self, field: String) -> Result<Query, QueryError> {
        self.pos += 1; // '['
        self.skip_ws();
        let min = self.read_bound()?;
        self.skip_ws();
        let keyword = self.read_token()?;
        if keyword != "TO" {
            return Err(QueryError::syntax(self.pos, "expected 'TO' in range"));
        }
        self.skip_ws();
        let max = self.read_bound()?;
        self.skip_ws();
        if !self.eat_char(']') {
            return Err(QueryError::syntax(self.pos, "expected ']'"));
        }
        Ok(Query::Range { field, min, max })
    }

    fn read_bound(&mut self) -> Result<Bound, QueryError> {
        let token = self.read_token()?;
        Ok(if token == "*" {
            Bound::Unbounded
        } else {
            Bound::Value(token)
        })
    }

    /// Read a bare token: everything up to whitespace or a structural
    /// character. Errors on an empty token.
    fn read_token(&mut self) -> Result<String, QueryError> {
        let start = self.pos;
        for (offset, c) in self.input[self.pos..].char_indices() {
            if c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | ':' | '"') {
                self.pos = start + offset;
                break;
            }
            self.pos = start + offset + c.len_utf8();
        }
        if self.pos == start {
            return Err(QueryError::syntax(start, "expected a term"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Read a double-quoted value, honoring `\"` escapes.
    fn read_quoted(&mut self) -> Result<String, QueryError> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut value = String::new();
        let mut escaped = false;
        for (offset, c) in self.input[self.pos..].char_indices() {
            if escaped {
                value.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                self.pos += offset + 1;
                return Ok(value);
            } else {
                value.push(c);
            }
        }
        Err(QueryError::syntax(start, "unterminated quoted value"))
    }

    /// Consume `keyword` if it appears next as a standalone word.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let saved = self.pos;
        self.skip_ws();
        let rest = &self.input[self.pos..];
        if rest.starts_with(keyword) {
            let after = rest[keyword.len()..].chars().next();
            if after.is_none_or(|c| c.is_whitespace() || c == '(' || c == ')') {
                self.pos += keyword.len();
                return true;
            }
        }
        self.pos = saved;
        false
    }

    fn eat_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        for (offset, c) in self.input[self.pos..].char_indices() {
            if !c.is_whitespace() {
                self.pos += offset;
                return;
            }
        }
        self.pos = self.input.len();
    }
}

fn token_to_clause(field: String, token: String) -> Query {
    if token.contains('*') || token.contains('?') {
        Query::Wildcard {
            field,
            pattern: token,
        }
    } else {
        Query::Term {
            field,
            value: token,
        }
    }
}
