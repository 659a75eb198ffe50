//! Type expressions used in manifests
//!
//! ```text
//! expr := NAME ( '[' expr ( ',' expr )* ']' )?
//! ```
//!
//! `Optional[T]` and `Union[A, B, ...]` are special forms; every other name
//! must be a declared class or a builtin.

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;
use wiring_core::{builtins, Class, TypeSpec};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeParseError {
    #[error("empty type expression")]
    Empty,

    #[error("unexpected {found} at offset {offset} in '{input}'")]
    Unexpected {
        input: String,
        offset: usize,
        found: String,
    },

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("{form} takes {expected} argument(s)")]
    Arity {
        form: &'static str,
        expected: &'static str,
    },
}

/// Resolves class names while parsing
pub struct TypeParser<'a> {
    classes: &'a HashMap<String, Class>,
}

impl<'a> TypeParser<'a> {
    pub fn new(classes: &'a HashMap<String, Class>) -> Self {
        Self { classes }
    }

    pub fn parse(&self, input: &str) -> Result<TypeSpec, TypeParseError> {
        if input.trim().is_empty() {
            return Err(TypeParseError::Empty);
        }
        let mut cursor = Cursor {
            input,
            chars: input.char_indices().peekable(),
        };
        let spec = self.expr(&mut cursor)?;
        cursor.skip_ws();
        match cursor.chars.peek() {
            None => Ok(spec),
            Some(&(offset, c)) => Err(cursor.unexpected(offset, format!("'{}'", c))),
        }
    }

    fn expr(&self, cursor: &mut Cursor<'_>) -> Result<TypeSpec, TypeParseError> {
        let name = cursor.name()?;
        let args = if cursor.eat('[') {
            let mut args = vec![self.expr(cursor)?];
            while cursor.eat(',') {
                args.push(self.expr(cursor)?);
            }
            cursor.expect(']')?;
            Some(args)
        } else {
            None
        };

        match (name, args) {
            ("Optional", Some(mut args)) => {
                if args.len() != 1 {
                    return Err(TypeParseError::Arity {
                        form: "Optional",
                        expected: "exactly one",
                    });
                }
                Ok(TypeSpec::optional(args.remove(0)))
            }
            ("Union", Some(args)) => {
                if args.len() < 2 {
                    return Err(TypeParseError::Arity {
                        form: "Union",
                        expected: "at least two",
                    });
                }
                Ok(TypeSpec::union(args))
            }
            ("Optional", None) | ("Union", None) => Err(TypeParseError::Arity {
                form: if name == "Optional" { "Optional" } else { "Union" },
                expected: "one or more",
            }),
            (name, args) => {
                let class = self.class(name)?;
                Ok(TypeSpec::generic(class, args.unwrap_or_default()))
            }
        }
    }

    fn class(&self, name: &str) -> Result<Class, TypeParseError> {
        self.classes
            .get(name)
            .or_else(|| builtins().by_name(name))
            .cloned()
            .ok_or_else(|| TypeParseError::UnknownType(name.to_string()))
    }
}

struct Cursor<'s> {
    input: &'s str,
    chars: Peekable<CharIndices<'s>>,
}

impl<'s> Cursor<'s> {
    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn name(&mut self) -> Result<&'s str, TypeParseError> {
        self.skip_ws();
        let start = match self.chars.peek() {
            Some(&(offset, c)) if c.is_alphabetic() || c == '_' => offset,
            Some(&(offset, c)) => return Err(self.unexpected(offset, format!("'{}'", c))),
            None => return Err(self.unexpected(self.input.len(), "end of input".to_string())),
        };
        let mut end = start;
        while let Some(&(offset, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                end = offset + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        let input = self.input;
        Ok(&input[start..end])
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if matches!(self.chars.peek(), Some(&(_, c)) if c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), TypeParseError> {
        if self.eat(expected) {
            return Ok(());
        }
        match self.chars.peek() {
            Some(&(offset, c)) => Err(self.unexpected(offset, format!("'{}'", c))),
            None => Err(self.unexpected(self.input.len(), "end of input".to_string())),
        }
    }

    fn unexpected(&self, offset: usize, found: String) -> TypeParseError {
        TypeParseError::Unexpected {
            input: self.input.to_string(),
            offset,
            found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> HashMap<String, Class> {
        let plugin = Class::new("Plugin");
        HashMap::from([
            ("Config".to_string(), Class::new("Config")),
            (
                "AudioPlugin".to_string(),
                Class::with_bases("AudioPlugin", [plugin.clone()]),
            ),
            ("Plugin".to_string(), plugin),
        ])
    }

    #[test]
    fn test_parse_plain_class() {
        let classes = classes();
        let parser = TypeParser::new(&classes);

        let spec = parser.parse("Config").unwrap();
        assert_eq!(spec, TypeSpec::from(&classes["Config"]));
    }

    #[test]
    fn test_parse_generic_over_declared_class() {
        let classes = classes();
        let parser = TypeParser::new(&classes);

        let spec = parser.parse("FrozenSet[ Plugin ]").unwrap();
        assert_eq!(
            spec,
            TypeSpec::generic(
                builtins().frozen_set.clone(),
                [TypeSpec::from(&classes["Plugin"])]
            )
        );
        assert_eq!(spec.to_string(), "FrozenSet[Plugin]");
    }

    #[test]
    fn test_parse_special_forms() {
        let classes = classes();
        let parser = TypeParser::new(&classes);

        assert_eq!(
            parser.parse("Optional[Config]").unwrap(),
            TypeSpec::optional(TypeSpec::from(&classes["Config"]))
        );
        assert_eq!(
            parser.parse("Union[Config, List[Plugin]]").unwrap().to_string(),
            "Union[Config, List[Plugin]]"
        );
    }

    #[test]
    fn test_parse_builtin_names() {
        let classes = HashMap::new();
        let parser = TypeParser::new(&classes);

        assert_eq!(
            parser.parse("str").unwrap(),
            TypeSpec::from(&builtins().str)
        );
        assert_eq!(
            parser.parse("Dict[str, int]").unwrap().to_string(),
            "Dict[str, int]"
        );
    }

    #[test]
    fn test_parse_errors() {
        let classes = classes();
        let parser = TypeParser::new(&classes);

        assert_eq!(parser.parse("  "), Err(TypeParseError::Empty));
        assert_eq!(
            parser.parse("Missing"),
            Err(TypeParseError::UnknownType("Missing".to_string()))
        );
        assert!(matches!(
            parser.parse("List[Config"),
            Err(TypeParseError::Unexpected { .. })
        ));
        assert!(matches!(
            parser.parse("Config]"),
            Err(TypeParseError::Unexpected { offset: 6, .. })
        ));
        assert!(matches!(
            parser.parse("Optional[Config, Plugin]"),
            Err(TypeParseError::Arity { form: "Optional", .. })
        ));
        assert!(matches!(
            parser.parse("Union"),
            Err(TypeParseError::Arity { form: "Union", .. })
        ));
    }
}
