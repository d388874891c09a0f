//! Selector parser.
//!
//! Single pass over the input. Quotes are only significant at the start of
//! a value, so apostrophes inside unquoted text (`title=Bob's`) need no
//! escaping.

use super::types::{Clause, Operator, Selector, SelectorError, SortKey, is_valid_field_name};

/// Characters that can start an operator. Field names never contain them.
const OPERATOR_CHARS: &[char] = &['=', '!', '<', '>', '*', '^', '$', '%'];

/// Parse a selector string.
///
/// An empty (or whitespace-only) input yields an empty selector.
pub fn parse(input: &str) -> Result<Selector, SelectorError> {
    let mut cursor = Cursor::new(input);
    let mut selector = Selector::default();

    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            None => break,
            Some(',') => {
                cursor.advance();
            }
            Some(_) => {
                let clause = cursor.clause()?;
                apply_clause(&mut selector, clause)?;
            }
        }
    }

    Ok(selector)
}

/// Route a parsed clause to a filter or one of the reserved keys.
fn apply_clause(selector: &mut Selector, clause: Clause) -> Result<(), SelectorError> {
    let key = match clause.fields.as_slice() {
        [key] => key.clone(),
        _ => {
            selector.clauses.push(clause);
            return Ok(());
        }
    };
    let key = key.as_str();

    match key {
        "sort" => {
            require_equals(key, clause.operator)?;
            for value in &clause.values {
                let (field, descending) = match value.strip_prefix('-') {
                    Some(rest) => (rest, true),
                    None => (value.as_str(), false),
                };
                if !is_valid_field_name(field) {
                    return Err(SelectorError::InvalidField {
                        field: field.to_string(),
                    });
                }
                selector.sorts.push(SortKey {
                    field: field.to_string(),
                    descending,
                });
            }
        }
        "limit" => {
            require_equals(key, clause.operator)?;
            selector.limit = Some(parse_count(key, &clause.values)?);
        }
        "start" => {
            require_equals(key, clause.operator)?;
            selector.start = parse_count(key, &clause.values)?;
        }
        _ => selector.clauses.push(clause),
    }

    Ok(())
}

fn require_equals(key: &str, operator: Operator) -> Result<(), SelectorError> {
    if operator == Operator::Equals {
        Ok(())
    } else {
        Err(SelectorError::UnsupportedOperator {
            key: key.to_string(),
            operator,
        })
    }
}

fn parse_count(key: &str, values: &[String]) -> Result<usize, SelectorError> {
    let invalid = || SelectorError::InvalidNumber {
        key: key.to_string(),
        value: values.join("|"),
    };
    match values {
        [value] => value.trim().parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Text from `start` up to the current position.
    fn slice(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    /// Text of the clause starting at `start`, up to the next comma.
    fn clause_text(&self, start: usize) -> String {
        self.chars[start..]
            .iter()
            .take_while(|c| **c != ',')
            .collect::<String>()
            .trim()
            .to_string()
    }

    fn clause(&mut self) -> Result<Clause, SelectorError> {
        let start = self.pos;

        while let Some(c) = self.peek() {
            if c == ',' || OPERATOR_CHARS.contains(&c) {
                break;
            }
            self.advance();
        }
        let field_text = self.slice(start);

        let Some(operator) = self.operator() else {
            return Err(SelectorError::MissingOperator {
                clause: self.clause_text(start),
            });
        };

        if field_text.trim().is_empty() {
            return Err(SelectorError::EmptyField {
                clause: self.clause_text(start),
            });
        }

        let mut fields = Vec::new();
        for field in field_text.split('|') {
            let field = field.trim();
            if !is_valid_field_name(field) {
                return Err(SelectorError::InvalidField {
                    field: field.to_string(),
                });
            }
            fields.push(field.to_string());
        }

        let values = self.values()?;

        Ok(Clause {
            fields,
            operator,
            values,
        })
    }

    /// Consume an operator at the current position.
    fn operator(&mut self) -> Option<Operator> {
        let first = self.peek()?;
        if let Some(second) = self.peek_at(1) {
            let pair: String = [first, second].iter().collect();
            if let Some((_, op)) = Operator::TWO_CHAR.iter().find(|(text, _)| *text == pair) {
                self.pos += 2;
                return Some(*op);
            }
        }
        let op = match first {
            '=' => Operator::Equals,
            '<' => Operator::LessThan,
            '>' => Operator::GreaterThan,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    /// Consume `value[|value...]` up to the end of the clause.
    fn values(&mut self) -> Result<Vec<String>, SelectorError> {
        let mut values = Vec::new();

        loop {
            self.skip_whitespace();
            let value = match self.peek() {
                Some(quote @ ('"' | '\'')) => self.quoted(quote)?,
                _ => self.unquoted(),
            };
            values.push(value);

            self.skip_whitespace();
            match self.peek() {
                Some('|') => self.advance(),
                None | Some(',') => break,
                Some(found) => {
                    return Err(SelectorError::UnexpectedCharacter {
                        found,
                        position: self.pos,
                    });
                }
            }
        }

        Ok(values)
    }

    fn quoted(&mut self, quote: char) -> Result<String, SelectorError> {
        let opening = self.pos;
        self.advance();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let value = self.slice(start);
                self.advance();
                return Ok(value);
            }
            self.advance();
        }
        Err(SelectorError::UnterminatedQuote { position: opening })
    }

    fn unquoted(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == ',' || c == '|' {
                break;
            }
            self.advance();
        }
        self.slice(start).trim().to_string()
    }
}
