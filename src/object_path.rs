//! Object paths of the form `Class.Key1='v1',Key2='v2'`.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectPathError {
    #[error("object path is empty")]
    Empty,

    #[error("object path has no class name")]
    MissingClass,

    #[error("expected '=' after key {0:?}")]
    MissingEquals(String),

    #[error("unterminated quoted value for key {0:?}")]
    UnterminatedValue(String),

    #[error("unexpected character {found:?} at offset {offset}")]
    Unexpected { found: char, offset: usize },
}

/// Identifies one managed object by class and key values.
///
/// A path with no keys renders as the singleton form `Class=@`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    class: String,
    keys: Vec<(String, String)>,
}

impl ObjectPath {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            keys: Vec::new(),
        }
    }

    /// Add a key property.
    pub fn key(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.keys.push((name.into(), value.into()));
        self
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keys.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_singleton(&self) -> bool {
        self.keys.is_empty()
    }

    /// Case-folded class and key names with keys sorted, so two spellings of
    /// the same path compare equal. Values keep their case.
    pub fn canonical(&self) -> String {
        let mut keys: Vec<(String, &str)> = self
            .keys
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.as_str()))
            .collect();
        keys.sort();

        let mut normalized = ObjectPath::new(self.class.to_ascii_lowercase());
        for (k, v) in keys {
            normalized = normalized.key(k, v);
        }
        normalized.to_string()
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.class)?;
        if self.keys.is_empty() {
            return f.write_str("=@");
        }

        for (i, (name, value)) in self.keys.iter().enumerate() {
            f.write_str(if i == 0 { "." } else { "," })?;
            write!(f, "{name}='")?;
            for c in value.chars() {
                if c == '\'' || c == '\\' {
                    f.write_str("\\")?;
                }
                write!(f, "{c}")?;
            }
            f.write_str("'")?;
        }
        Ok(())
    }
}

impl FromStr for ObjectPath {
    type Err = ObjectPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ObjectPathError::Empty);
        }

        if let Some(class) = s.strip_suffix("=@").filter(|class| !class.contains('.')) {
            if class.is_empty() {
                return Err(ObjectPathError::MissingClass);
            }
            return Ok(ObjectPath::new(class));
        }

        let (class, rest) = match s.find('.') {
            Some(dot) => (&s[..dot], &s[dot + 1..]),
            None => (s, ""),
        };
        if class.is_empty() {
            return Err(ObjectPathError::MissingClass);
        }

        let mut path = ObjectPath::new(class);
        let base = class.len() + 1;
        let mut chars = rest.char_indices().peekable();

        while chars.peek().is_some() {
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some((_, '=')) => break,
                    Some((_, c)) => name.push(c),
                    None => return Err(ObjectPathError::MissingEquals(name)),
                }
            }
            let name = name.trim().to_string();

            let mut value = String::new();
            match chars.peek().copied() {
                Some((_, quote @ ('\'' | '"'))) => {
                    chars.next();
                    loop {
                        match chars.next() {
                            Some((_, '\\')) => match chars.next() {
                                Some((_, c)) => value.push(c),
                                None => return Err(ObjectPathError::UnterminatedValue(name)),
                            },
                            Some((_, c)) if c == quote => break,
                            Some((_, c)) => value.push(c),
                            None => return Err(ObjectPathError::UnterminatedValue(name)),
                        }
                    }
                    match chars.next() {
                        None | Some((_, ',')) => {}
                        Some((offset, found)) => {
                            return Err(ObjectPathError::Unexpected {
                                found,
                                offset: base + offset,
                            });
                        }
                    }
                }
                _ => {
                    for (_, c) in chars.by_ref() {
                        if c == ',' {
                            break;
                        }
                        value.push(c);
                    }
                    value = value.trim().to_string();
                }
            }

            path.keys.push((name, value));
        }

        Ok(path)
    }
}
