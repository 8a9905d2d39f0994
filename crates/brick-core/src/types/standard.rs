//! C and C++ language standard tokens (`c11`, `c++17`, `gnu++20`, ...).

use std::fmt;

use serde::{Serialize, Serializer};

/// Source language a standard applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    Cxx,
}

/// A requested language standard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Standard {
    pub language: Language,
    /// Two-digit year as written in the token
    pub year: u8,
    /// GNU dialect (`gnu11`, `gnu++17`)
    pub gnu: bool,
}

const C_YEARS: [u8; 7] = [89, 90, 99, 11, 17, 18, 23];
const CXX_YEARS: [u8; 8] = [98, 3, 11, 14, 17, 20, 23, 26];

impl Standard {
    /// Parse a standard token; `None` when the token names no known standard
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_lowercase();
        let (language, gnu, year) = if let Some(year) = token.strip_prefix("gnu++") {
            (Language::Cxx, true, year)
        } else if let Some(year) = token.strip_prefix("c++") {
            (Language::Cxx, false, year)
        } else if let Some(year) = token.strip_prefix("gnu") {
            (Language::C, true, year)
        } else if let Some(year) = token.strip_prefix('c') {
            (Language::C, false, year)
        } else {
            return None;
        };

        if year.len() != 2 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year: u8 = year.parse().ok()?;
        let known = match language {
            Language::C => C_YEARS.contains(&year),
            Language::Cxx => CXX_YEARS.contains(&year),
        };

        known.then_some(Self {
            language,
            year,
            gnu,
        })
    }

    pub fn is_cxx(&self) -> bool {
        self.language == Language::Cxx
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match (self.language, self.gnu) {
            (Language::C, false) => "c",
            (Language::C, true) => "gnu",
            (Language::Cxx, false) => "c++",
            (Language::Cxx, true) => "gnu++",
        };
        write!(f, "{}{:02}", prefix, self.year)
    }
}

impl Serialize for Standard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
